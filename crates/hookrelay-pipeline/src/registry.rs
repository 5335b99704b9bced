// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination registry: validated CRUD over an account's destinations.

use std::sync::Arc;

use hookrelay_core::types::{Destination, DestinationUpdate, NewDestination};
use hookrelay_core::{RelayError, StorageAdapter};
use tracing::info;

use crate::validation::validate_destination;

#[derive(Clone)]
pub struct DestinationRegistry {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
}

impl DestinationRegistry {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>) -> Self {
        Self { storage }
    }

    /// Destinations of an account ordered by id. An empty list is valid.
    pub async fn list_by_account(&self, account_id: i64) -> Result<Vec<Destination>, RelayError> {
        self.storage.list_destinations(account_id, None).await
    }

    /// Like [`list_by_account`](Self::list_by_account), narrowed to URLs
    /// containing `url_contains`.
    pub async fn search(
        &self,
        account_id: i64,
        url_contains: Option<&str>,
    ) -> Result<Vec<Destination>, RelayError> {
        self.storage
            .list_destinations(account_id, url_contains.filter(|s| !s.is_empty()))
            .await
    }

    pub async fn create(
        &self,
        account_id: i64,
        destination: &NewDestination,
    ) -> Result<Destination, RelayError> {
        validate_destination(destination)?;
        if self.storage.get_account(account_id).await?.is_none() {
            return Err(RelayError::NotFound {
                entity: "account",
                id: account_id,
            });
        }
        let created = self
            .storage
            .create_destination(account_id, destination)
            .await?;
        info!(
            account_id,
            destination_id = created.id,
            method = %created.http_method,
            "destination created"
        );
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Destination, RelayError> {
        self.storage
            .get_destination(id)
            .await?
            .ok_or(RelayError::NotFound {
                entity: "destination",
                id,
            })
    }

    /// Apply a partial update; the merged destination is validated as a whole.
    pub async fn update(
        &self,
        id: i64,
        update: &DestinationUpdate,
    ) -> Result<Destination, RelayError> {
        let current = self.get(id).await?;
        let merged = update.apply_to(&current);
        validate_destination(&merged)?;
        self.storage
            .update_destination(id, &merged)
            .await?
            .ok_or(RelayError::NotFound {
                entity: "destination",
                id,
            })
    }

    /// Delete a destination and, through the cascade, its ledger entries.
    pub async fn delete(&self, id: i64) -> Result<(), RelayError> {
        if self.storage.delete_destination(id).await? {
            info!(destination_id = id, "destination deleted");
            Ok(())
        } else {
            Err(RelayError::NotFound {
                entity: "destination",
                id,
            })
        }
    }
}
