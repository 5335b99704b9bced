// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the relay's storage and pipeline on a temp SQLite
//! database with a seeded tenant. [`TestHarness::drain_deliveries`] runs the
//! delivery worker inline so tests can assert on final ledger state without
//! a background pool.

use std::sync::Arc;
use std::time::Duration;

use hookrelay_config::model::{RelayConfig, StorageConfig};
use hookrelay_core::types::{
    Account, Destination, EventFilter, HeaderSet, LedgerEntry, NewDestination,
};
use hookrelay_core::{HttpMethod, RelayError, Role, StorageAdapter};
use hookrelay_pipeline::{
    DeliveryWorker, DestinationRegistry, IngestPipeline, IssuedUser, Provisioner,
};
use hookrelay_storage::SqliteStorage;

/// Secret of the seeded `acme` account.
pub const ACME_SECRET: &str = "11111111-1111-1111-1111-111111111111";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    destinations: Vec<NewDestination>,
    config: RelayConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = RelayConfig::default();
        config.delivery.request_timeout_secs = 5;
        config.delivery.poll_interval_ms = 10;
        Self {
            destinations: Vec::new(),
            config,
        }
    }

    /// Add a destination to the seeded account.
    pub fn with_destination(
        mut self,
        url: impl Into<String>,
        method: HttpMethod,
        headers: HeaderSet,
    ) -> Self {
        self.destinations.push(NewDestination {
            url: url.into(),
            http_method: method,
            headers,
        });
        self
    }

    /// Override the relay configuration. The storage path is always replaced
    /// by the harness's temp database.
    pub fn with_config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the test harness, creating the database and seed data.
    pub async fn build(self) -> Result<TestHarness, RelayError> {
        let temp_dir = tempfile::TempDir::new().map_err(RelayError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);

        let provisioner = Provisioner::new(storage.clone());
        let admin = provisioner.create_user("admin@acme.test").await?;
        let member = provisioner.create_user("member@acme.test").await?;
        let outsider = provisioner.create_user("outsider@example.test").await?;

        let acme = storage.create_account("acme", ACME_SECRET).await?;
        provisioner
            .add_member(acme.id, admin.user.id, Role::Admin)
            .await?;
        provisioner
            .add_member(acme.id, member.user.id, Role::Member)
            .await?;

        let registry = DestinationRegistry::new(storage.clone());
        let mut destinations = Vec::with_capacity(self.destinations.len());
        for destination in &self.destinations {
            destinations.push(registry.create(acme.id, destination).await?);
        }

        Ok(TestHarness {
            storage,
            config,
            acme,
            admin,
            member,
            outsider,
            destinations,
            _temp_dir: temp_dir,
        })
    }
}

/// A seeded relay environment on a temp database.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter + Send + Sync>,
    /// Effective configuration, pointing at the temp database.
    pub config: RelayConfig,
    /// The seeded account, with secret [`ACME_SECRET`].
    pub acme: Account,
    /// Admin member of `acme`.
    pub admin: IssuedUser,
    /// Non-admin member of `acme`.
    pub member: IssuedUser,
    /// A user with no memberships.
    pub outsider: IssuedUser,
    /// Destinations created by the builder, in creation order.
    pub destinations: Vec<Destination>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(self.storage.clone(), self.config.delivery.max_task_attempts)
    }

    pub fn worker(&self) -> Result<DeliveryWorker, RelayError> {
        DeliveryWorker::new(self.storage.clone(), &self.config.delivery)
    }

    /// Process queued deliveries until the queue is empty. Returns how many
    /// tasks were handled.
    pub async fn drain_deliveries(&self) -> Result<usize, RelayError> {
        let worker = self.worker()?;
        let lock_timeout = Duration::from_secs(self.config.delivery.lock_timeout_secs);
        let mut handled = 0;
        while worker.run_once(lock_timeout).await? {
            handled += 1;
        }
        Ok(handled)
    }

    /// All ledger entries of the seeded account, newest first.
    pub async fn events(&self) -> Result<Vec<LedgerEntry>, RelayError> {
        self.storage
            .list_events(self.acme.id, &EventFilter::default())
            .await
    }
}
