// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Account, DeliveryOutcome, DeliveryTask, Destination, EventFilter, LedgerEntry, Membership,
    NewDestination, NewLedgerEntry, Role, User,
};

/// Adapter for the relay's durable state: identities, destinations, the
/// event ledger, and the delivery task queue.
///
/// Implementations must enforce uniqueness of `events.event_key` and cascade
/// deletes from accounts and destinations down to ledger rows and tasks.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, pragmas).
    async fn initialize(&self) -> Result<(), RelayError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), RelayError>;

    // --- Identity ---

    /// Creates a user whose session token hashes to `token_digest`.
    async fn create_user(&self, email: &str, token_digest: &str) -> Result<User, RelayError>;

    /// Looks up the user owning a session token digest.
    async fn find_user_by_token_digest(&self, digest: &str) -> Result<Option<User>, RelayError>;

    /// Creates an account with its ingestion secret.
    async fn create_account(&self, name: &str, secret_token: &str)
        -> Result<Account, RelayError>;

    async fn get_account(&self, id: i64) -> Result<Option<Account>, RelayError>;

    /// Deletes an account. Destinations, memberships, ledger rows and queued
    /// tasks go with it. Returns false when no such account exists.
    async fn delete_account(&self, id: i64) -> Result<bool, RelayError>;

    async fn add_member(
        &self,
        account_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<Membership, RelayError>;

    async fn get_membership(
        &self,
        account_id: i64,
        user_id: i64,
    ) -> Result<Option<Membership>, RelayError>;

    /// Returns every account whose secret equals `secret_token` and of which
    /// `user_id` is a member. More than one row indicates broken integrity.
    async fn find_accounts_by_secret(
        &self,
        secret_token: &str,
        user_id: i64,
    ) -> Result<Vec<Account>, RelayError>;

    // --- Destinations ---

    async fn create_destination(
        &self,
        account_id: i64,
        destination: &NewDestination,
    ) -> Result<Destination, RelayError>;

    async fn get_destination(&self, id: i64) -> Result<Option<Destination>, RelayError>;

    /// Lists an account's destinations ordered by id.
    async fn list_destinations(
        &self,
        account_id: i64,
        url_contains: Option<&str>,
    ) -> Result<Vec<Destination>, RelayError>;

    /// Replaces url, method and headers. Returns `None` if the row is gone.
    async fn update_destination(
        &self,
        id: i64,
        destination: &NewDestination,
    ) -> Result<Option<Destination>, RelayError>;

    async fn delete_destination(&self, id: i64) -> Result<bool, RelayError>;

    // --- Ledger ---

    /// Atomically writes all ledger rows and one delivery task per row.
    ///
    /// Either every row and task is committed or none is. A duplicate
    /// `event_key` yields [`RelayError::Conflict`]. Returns the new ledger ids
    /// in input order.
    async fn record_fanout(
        &self,
        entries: &[NewLedgerEntry],
        max_attempts: i32,
    ) -> Result<Vec<i64>, RelayError>;

    async fn get_event(&self, id: i64) -> Result<Option<LedgerEntry>, RelayError>;

    /// Writes status, delivery error and `processed_at = now` in one update.
    /// Returns false when the row no longer exists.
    async fn finalize_event(&self, id: i64, outcome: &DeliveryOutcome)
        -> Result<bool, RelayError>;

    async fn list_events(
        &self,
        account_id: i64,
        filter: &EventFilter,
    ) -> Result<Vec<LedgerEntry>, RelayError>;

    // --- Delivery queue ---

    /// Claims the next runnable task, including tasks whose lock expired.
    async fn dequeue_delivery(
        &self,
        lock_timeout: Duration,
    ) -> Result<Option<DeliveryTask>, RelayError>;

    async fn ack_delivery(&self, task_id: i64) -> Result<(), RelayError>;

    /// Releases a task after an infrastructure failure so it can run again,
    /// or parks it as failed once attempts are exhausted.
    async fn fail_delivery(&self, task_id: i64) -> Result<(), RelayError>;
}
