// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use hookrelay_config::model::StorageConfig;
use hookrelay_core::types::{
    Account, DeliveryOutcome, DeliveryTask, Destination, EventFilter, LedgerEntry, Membership,
    NewDestination, NewLedgerEntry, Role, User,
};
use hookrelay_core::{AdapterType, HealthStatus, PluginAdapter, RelayError, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: StorageAdapter::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, RelayError> {
        self.db.get().ok_or_else(|| RelayError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        let db = self.database()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), RelayError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RelayError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), RelayError> {
        self.database()?.close().await
    }

    // --- Identity ---

    async fn create_user(&self, email: &str, token_digest: &str) -> Result<User, RelayError> {
        queries::identity::create_user(self.database()?, email, token_digest).await
    }

    async fn find_user_by_token_digest(&self, digest: &str) -> Result<Option<User>, RelayError> {
        queries::identity::find_user_by_token_digest(self.database()?, digest).await
    }

    async fn create_account(
        &self,
        name: &str,
        secret_token: &str,
    ) -> Result<Account, RelayError> {
        queries::identity::create_account(self.database()?, name, secret_token).await
    }

    async fn get_account(&self, id: i64) -> Result<Option<Account>, RelayError> {
        queries::identity::get_account(self.database()?, id).await
    }

    async fn delete_account(&self, id: i64) -> Result<bool, RelayError> {
        queries::identity::delete_account(self.database()?, id).await
    }

    async fn add_member(
        &self,
        account_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<Membership, RelayError> {
        queries::identity::add_member(self.database()?, account_id, user_id, role).await
    }

    async fn get_membership(
        &self,
        account_id: i64,
        user_id: i64,
    ) -> Result<Option<Membership>, RelayError> {
        queries::identity::get_membership(self.database()?, account_id, user_id).await
    }

    async fn find_accounts_by_secret(
        &self,
        secret_token: &str,
        user_id: i64,
    ) -> Result<Vec<Account>, RelayError> {
        queries::identity::find_accounts_by_secret(self.database()?, secret_token, user_id).await
    }

    // --- Destinations ---

    async fn create_destination(
        &self,
        account_id: i64,
        destination: &NewDestination,
    ) -> Result<Destination, RelayError> {
        queries::destinations::create_destination(self.database()?, account_id, destination).await
    }

    async fn get_destination(&self, id: i64) -> Result<Option<Destination>, RelayError> {
        queries::destinations::get_destination(self.database()?, id).await
    }

    async fn list_destinations(
        &self,
        account_id: i64,
        url_contains: Option<&str>,
    ) -> Result<Vec<Destination>, RelayError> {
        queries::destinations::list_destinations(self.database()?, account_id, url_contains).await
    }

    async fn update_destination(
        &self,
        id: i64,
        destination: &NewDestination,
    ) -> Result<Option<Destination>, RelayError> {
        queries::destinations::update_destination(self.database()?, id, destination).await
    }

    async fn delete_destination(&self, id: i64) -> Result<bool, RelayError> {
        queries::destinations::delete_destination(self.database()?, id).await
    }

    // --- Ledger ---

    async fn record_fanout(
        &self,
        entries: &[NewLedgerEntry],
        max_attempts: i32,
    ) -> Result<Vec<i64>, RelayError> {
        queries::events::record_fanout(self.database()?, entries, max_attempts).await
    }

    async fn get_event(&self, id: i64) -> Result<Option<LedgerEntry>, RelayError> {
        queries::events::get_event(self.database()?, id).await
    }

    async fn finalize_event(
        &self,
        id: i64,
        outcome: &DeliveryOutcome,
    ) -> Result<bool, RelayError> {
        queries::events::finalize_event(self.database()?, id, outcome).await
    }

    async fn list_events(
        &self,
        account_id: i64,
        filter: &EventFilter,
    ) -> Result<Vec<LedgerEntry>, RelayError> {
        queries::events::list_events(self.database()?, account_id, filter).await
    }

    // --- Delivery queue ---

    async fn dequeue_delivery(
        &self,
        lock_timeout: Duration,
    ) -> Result<Option<DeliveryTask>, RelayError> {
        queries::queue::dequeue(self.database()?, lock_timeout).await
    }

    async fn ack_delivery(&self, task_id: i64) -> Result<(), RelayError> {
        queries::queue::ack(self.database()?, task_id).await
    }

    async fn fail_delivery(&self, task_id: i64) -> Result<(), RelayError> {
        queries::queue::fail(self.database()?, task_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hookrelay_core::types::{EventStatus, HttpMethod};
    use tempfile::tempdir;

    use super::*;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        assert!(storage.get_account(1).await.is_err());
    }

    #[tokio::test]
    async fn ingest_and_deliver_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);

        let user = storage.create_user("ops@acme.test", "digest").await.unwrap();
        let acme = storage
            .create_account("acme", "11111111-1111-1111-1111-111111111111")
            .await
            .unwrap();
        storage.add_member(acme.id, user.id, Role::Admin).await.unwrap();
        let dest = storage
            .create_destination(
                acme.id,
                &NewDestination {
                    url: "https://hooks.example.com/in".into(),
                    http_method: HttpMethod::Post,
                    headers: BTreeMap::from([("X-Env".to_string(), "prod".to_string())]),
                },
            )
            .await
            .unwrap();

        let ids = storage
            .record_fanout(
                &[NewLedgerEntry {
                    event_key: NewLedgerEntry::event_key("evt-9", dest.id),
                    account_id: acme.id,
                    destination_id: dest.id,
                    payload: serde_json::Map::from_iter([("a".to_string(), 1.into())]),
                }],
                3,
            )
            .await
            .unwrap();

        let task = storage
            .dequeue_delivery(Duration::from_secs(30))
            .await
            .unwrap()
            .expect("task queued with the ledger row");
        assert_eq!(task.event_id, ids[0]);

        storage
            .finalize_event(task.event_id, &DeliveryOutcome::success())
            .await
            .unwrap();
        storage.ack_delivery(task.id).await.unwrap();

        let entry = storage.get_event(ids[0]).await.unwrap().unwrap();
        assert_eq!(entry.status, EventStatus::Success);
        assert!(storage
            .dequeue_delivery(Duration::from_secs(30))
            .await
            .unwrap()
            .is_none());

        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn finalize_of_missing_event_reports_absence() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("missing.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        let found = storage
            .finalize_event(42, &DeliveryOutcome::rejected())
            .await
            .unwrap();
        assert!(!found);
    }

    #[tokio::test]
    async fn shutdown_runs_checkpoint() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shutdown.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        storage.create_account("acme", "s1").await.unwrap();

        storage.shutdown().await.unwrap();
        let wal = dir.path().join("shutdown.db-wal");
        if wal.exists() {
            assert_eq!(std::fs::metadata(&wal).unwrap().len(), 0);
        }
    }
}
