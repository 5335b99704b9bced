// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out dispatcher: one ledger entry and one delivery task per destination.

use std::sync::Arc;

use hookrelay_core::types::{Account, NewLedgerEntry, Payload};
use hookrelay_core::StorageAdapter;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::registry::DestinationRegistry;
use crate::validation::validate_event_id;

/// What a successful dispatch committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub event_id: String,
    /// Ledger entry ids, in destination id order.
    pub ledger_ids: Vec<i64>,
}

#[derive(Clone)]
pub struct Dispatcher {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    registry: DestinationRegistry,
    max_task_attempts: i32,
}

impl Dispatcher {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>, max_task_attempts: i32) -> Self {
        Self {
            registry: DestinationRegistry::new(storage.clone()),
            storage,
            max_task_attempts,
        }
    }

    /// Fan `payload` out to every destination of `account`.
    ///
    /// Returns once the ledger rows and their delivery tasks are committed;
    /// delivery itself happens later on the worker pool. On any error nothing
    /// has been written.
    pub async fn dispatch(
        &self,
        account: &Account,
        payload: &Payload,
        client_event_id: &str,
    ) -> Result<DispatchResult, IngestError> {
        let destinations = self.registry.list_by_account(account.id).await?;
        let Some(max_destination_id) = destinations.iter().map(|d| d.id).max() else {
            debug!(account_id = account.id, "account has no destinations");
            return Err(IngestError::NoDestinations);
        };
        validate_event_id(client_event_id, max_destination_id)?;

        let entries: Vec<NewLedgerEntry> = destinations
            .iter()
            .map(|destination| NewLedgerEntry {
                event_key: NewLedgerEntry::event_key(client_event_id, destination.id),
                account_id: account.id,
                destination_id: destination.id,
                payload: payload.clone(),
            })
            .collect();

        let ledger_ids = self
            .storage
            .record_fanout(&entries, self.max_task_attempts)
            .await
            .map_err(|e| {
                warn!(
                    account_id = account.id,
                    event_id = client_event_id,
                    error = %e,
                    "fan-out write failed"
                );
                IngestError::from(e)
            })?;

        debug!(
            account_id = account.id,
            event_id = client_event_id,
            destinations = ledger_ids.len(),
            "event fanned out"
        );
        Ok(DispatchResult {
            event_id: client_event_id.to_string(),
            ledger_ids,
        })
    }
}
