// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion flow behind `POST /incoming_data`, independent of HTTP.

use std::sync::Arc;

use hookrelay_core::types::User;
use hookrelay_core::StorageAdapter;
use tracing::info;

use crate::dispatcher::{DispatchResult, Dispatcher};
use crate::error::IngestError;
use crate::resolver::SecretResolver;
use crate::validation::parse_payload;

/// An inbound event as received, before any validation.
#[derive(Debug, Clone, Copy)]
pub struct IngestRequest<'a> {
    /// Account secret presented by the caller.
    pub token: Option<&'a str>,
    /// Client event id; generated when absent.
    pub event_id: Option<&'a str>,
    pub body: &'a [u8],
}

/// Validates, resolves, and dispatches inbound events.
#[derive(Clone)]
pub struct IngestPipeline {
    resolver: SecretResolver,
    dispatcher: Dispatcher,
}

impl IngestPipeline {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>, max_task_attempts: i32) -> Self {
        Self {
            resolver: SecretResolver::new(storage.clone()),
            dispatcher: Dispatcher::new(storage, max_task_attempts),
        }
    }

    /// Accept an event from an authenticated caller.
    ///
    /// Checks run in order: token presence, body shape, secret resolution,
    /// then fan-out. Every rejection happens before any ledger row exists.
    pub async fn ingest(
        &self,
        caller: &User,
        request: IngestRequest<'_>,
    ) -> Result<DispatchResult, IngestError> {
        let token = request
            .token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(IngestError::MissingToken)?;
        let payload = parse_payload(request.body)?;

        let account = self
            .resolver
            .resolve(caller, token)
            .await
            .map_err(IngestError::Storage)?
            .into_account()?;

        let event_id = match request.event_id {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        let result = self.dispatcher.dispatch(&account, &payload, &event_id).await?;
        info!(
            account_id = account.id,
            event_id = %result.event_id,
            destinations = result.ledger_ids.len(),
            "event received"
        );
        hookrelay_prometheus::record_ingested(result.ledger_ids.len());
        Ok(result)
    }
}
