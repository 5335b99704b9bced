// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps an account secret presented by a caller to the account it names.

use std::sync::Arc;

use hookrelay_core::types::{Account, User};
use hookrelay_core::{RelayError, StorageAdapter};
use tracing::error;

use crate::credentials::parse_secret_token;
use crate::error::IngestError;

/// Result of resolving a secret for a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved(Account),
    /// No account with this secret has the principal as a member.
    NotFound,
    /// More than one account matched; storage integrity is broken.
    Ambiguous(usize),
    /// The credential is not a canonical UUID. Storage was not consulted.
    MalformedInput,
}

impl ResolveOutcome {
    /// Collapse the outcome into the account or the matching ingest error.
    pub fn into_account(self) -> Result<Account, IngestError> {
        match self {
            ResolveOutcome::Resolved(account) => Ok(account),
            ResolveOutcome::NotFound => Err(IngestError::Unauthorized),
            ResolveOutcome::Ambiguous(count) => Err(IngestError::AmbiguousCredential { count }),
            ResolveOutcome::MalformedInput => Err(IngestError::BadCredentialFormat),
        }
    }
}

/// Read-only secret lookup scoped to the caller's memberships.
#[derive(Clone)]
pub struct SecretResolver {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
}

impl SecretResolver {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>) -> Self {
        Self { storage }
    }

    pub async fn resolve(
        &self,
        principal: &User,
        credential: &str,
    ) -> Result<ResolveOutcome, RelayError> {
        let Some(secret) = parse_secret_token(credential) else {
            return Ok(ResolveOutcome::MalformedInput);
        };

        let mut accounts = self
            .storage
            .find_accounts_by_secret(&secret, principal.id)
            .await?;
        match accounts.len() {
            0 => Ok(ResolveOutcome::NotFound),
            1 => Ok(ResolveOutcome::Resolved(accounts.remove(0))),
            count => {
                error!(
                    user_id = principal.id,
                    count, "account secret matched more than one account"
                );
                Ok(ResolveOutcome::Ambiguous(count))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use hookrelay_core::types::{
        DeliveryOutcome, DeliveryTask, Destination, EventFilter, LedgerEntry, Membership,
        NewDestination, NewLedgerEntry,
    };
    use hookrelay_core::{AdapterType, HealthStatus, PluginAdapter, Role};

    use super::*;

    const SECRET: &str = "22222222-2222-4222-8222-222222222222";

    /// Storage whose secret lookup returns a fixed set of accounts.
    struct FixedAccounts {
        accounts: Vec<Account>,
        lookups: AtomicUsize,
    }

    impl FixedAccounts {
        fn new(accounts: Vec<Account>) -> Arc<Self> {
            Arc::new(Self {
                accounts,
                lookups: AtomicUsize::new(0),
            })
        }
    }

    fn account(id: i64, name: &str) -> Account {
        Account {
            id,
            name: name.to_string(),
            secret_token: SECRET.to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn caller() -> User {
        User {
            id: 7,
            email: "ops@acme.test".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[async_trait]
    impl PluginAdapter for FixedAccounts {
        fn name(&self) -> &str {
            "fixed-accounts"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Storage
        }
        async fn health_check(&self) -> Result<HealthStatus, RelayError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), RelayError> {
            Ok(())
        }
    }

    #[async_trait]
    impl StorageAdapter for FixedAccounts {
        async fn initialize(&self) -> Result<(), RelayError> {
            Ok(())
        }
        async fn close(&self) -> Result<(), RelayError> {
            Ok(())
        }
        async fn create_user(&self, _: &str, _: &str) -> Result<User, RelayError> {
            unimplemented!()
        }
        async fn find_user_by_token_digest(&self, _: &str) -> Result<Option<User>, RelayError> {
            unimplemented!()
        }
        async fn create_account(&self, _: &str, _: &str) -> Result<Account, RelayError> {
            unimplemented!()
        }
        async fn get_account(&self, _: i64) -> Result<Option<Account>, RelayError> {
            unimplemented!()
        }
        async fn delete_account(&self, _: i64) -> Result<bool, RelayError> {
            unimplemented!()
        }
        async fn add_member(&self, _: i64, _: i64, _: Role) -> Result<Membership, RelayError> {
            unimplemented!()
        }
        async fn get_membership(&self, _: i64, _: i64) -> Result<Option<Membership>, RelayError> {
            unimplemented!()
        }
        async fn find_accounts_by_secret(
            &self,
            secret_token: &str,
            _user_id: i64,
        ) -> Result<Vec<Account>, RelayError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .accounts
                .iter()
                .filter(|a| a.secret_token == secret_token)
                .cloned()
                .collect())
        }
        async fn create_destination(
            &self,
            _: i64,
            _: &NewDestination,
        ) -> Result<Destination, RelayError> {
            unimplemented!()
        }
        async fn get_destination(&self, _: i64) -> Result<Option<Destination>, RelayError> {
            unimplemented!()
        }
        async fn list_destinations(
            &self,
            _: i64,
            _: Option<&str>,
        ) -> Result<Vec<Destination>, RelayError> {
            unimplemented!()
        }
        async fn update_destination(
            &self,
            _: i64,
            _: &NewDestination,
        ) -> Result<Option<Destination>, RelayError> {
            unimplemented!()
        }
        async fn delete_destination(&self, _: i64) -> Result<bool, RelayError> {
            unimplemented!()
        }
        async fn record_fanout(
            &self,
            _: &[NewLedgerEntry],
            _: i32,
        ) -> Result<Vec<i64>, RelayError> {
            unimplemented!()
        }
        async fn get_event(&self, _: i64) -> Result<Option<LedgerEntry>, RelayError> {
            unimplemented!()
        }
        async fn finalize_event(&self, _: i64, _: &DeliveryOutcome) -> Result<bool, RelayError> {
            unimplemented!()
        }
        async fn list_events(
            &self,
            _: i64,
            _: &EventFilter,
        ) -> Result<Vec<LedgerEntry>, RelayError> {
            unimplemented!()
        }
        async fn dequeue_delivery(&self, _: Duration) -> Result<Option<DeliveryTask>, RelayError> {
            unimplemented!()
        }
        async fn ack_delivery(&self, _: i64) -> Result<(), RelayError> {
            unimplemented!()
        }
        async fn fail_delivery(&self, _: i64) -> Result<(), RelayError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn secret_shared_by_two_accounts_is_ambiguous() {
        let storage = FixedAccounts::new(vec![account(1, "acme"), account(2, "acme-shadow")]);
        let resolver = SecretResolver::new(storage.clone());

        let outcome = resolver.resolve(&caller(), SECRET).await.unwrap();
        assert_eq!(outcome, ResolveOutcome::Ambiguous(2));
        assert!(matches!(
            outcome.into_account(),
            Err(IngestError::AmbiguousCredential { count: 2 })
        ));
    }

    #[tokio::test]
    async fn single_match_resolves() {
        let storage = FixedAccounts::new(vec![account(1, "acme")]);
        let resolver = SecretResolver::new(storage);

        let outcome = resolver.resolve(&caller(), SECRET).await.unwrap();
        assert_eq!(outcome.into_account().unwrap().id, 1);
    }

    #[tokio::test]
    async fn malformed_secret_skips_storage() {
        let storage = FixedAccounts::new(vec![account(1, "acme")]);
        let resolver = SecretResolver::new(storage.clone());

        for bad in ["", "not-a-uuid", "{22222222-2222-4222-8222-222222222222}"] {
            let outcome = resolver.resolve(&caller(), bad).await.unwrap();
            assert_eq!(outcome, ResolveOutcome::MalformedInput);
        }
        assert_eq!(storage.lookups.load(Ordering::SeqCst), 0);
    }
}
