// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the relay: tenants, destinations, ledger
//! entries, and delivery tasks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The inbound event body. Always a JSON object.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Header mapping attached to a destination. Ordered for stable storage.
pub type HeaderSet = BTreeMap<String, String>;

/// Health status reported by adapter health checks.
///
/// An adapter that cannot serve reports an error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Observability,
}

/// HTTP methods a destination may be configured with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum HttpMethod {
    #[strum(serialize = "GET")]
    #[serde(rename = "GET")]
    Get,
    #[strum(serialize = "POST")]
    #[serde(rename = "POST")]
    Post,
    #[strum(serialize = "PUT")]
    #[serde(rename = "PUT")]
    Put,
    #[strum(serialize = "DELETE")]
    #[serde(rename = "DELETE")]
    Delete,
}

/// Lifecycle status of a ledger entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Success,
    Failed,
}

/// Role of a user within an account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

/// An authenticated caller of the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: String,
}

/// A tenant. The secret token is the bearer credential for ingestion.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing)]
    pub secret_token: String,
    pub created_at: String,
    pub updated_at: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("secret_token", &"[redacted]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Link between a user and an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub account_id: i64,
    pub user_id: i64,
    pub role: Role,
}

/// A delivery target owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: i64,
    pub account_id: i64,
    pub url: String,
    pub http_method: HttpMethod,
    pub headers: HeaderSet,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to register a destination. Validated before storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDestination {
    pub url: String,
    pub http_method: HttpMethod,
    pub headers: HeaderSet,
}

/// Partial update to a destination. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationUpdate {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub http_method: Option<HttpMethod>,
    #[serde(default)]
    pub headers: Option<HeaderSet>,
}

impl DestinationUpdate {
    /// Applies the update on top of an existing destination.
    pub fn apply_to(&self, current: &Destination) -> NewDestination {
        NewDestination {
            url: self.url.clone().unwrap_or_else(|| current.url.clone()),
            http_method: self.http_method.unwrap_or(current.http_method),
            headers: self
                .headers
                .clone()
                .unwrap_or_else(|| current.headers.clone()),
        }
    }
}

/// One (inbound event, destination) pairing in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub event_key: String,
    pub account_id: i64,
    pub destination_id: i64,
    pub received_at: String,
    pub processed_at: Option<String>,
    pub payload: Payload,
    pub delivery_error: Option<String>,
    pub status: EventStatus,
}

/// A ledger row to be created at fan-out time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub event_key: String,
    pub account_id: i64,
    pub destination_id: i64,
    pub payload: Payload,
}

impl NewLedgerEntry {
    /// Builds the composite ledger key `{client_event_id}-{destination_id}`.
    pub fn event_key(client_event_id: &str, destination_id: i64) -> String {
        format!("{client_event_id}-{destination_id}")
    }
}

/// Result of one delivery attempt, written back to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub status: EventStatus,
    pub delivery_error: Option<String>,
}

impl DeliveryOutcome {
    pub fn success() -> Self {
        Self {
            status: EventStatus::Success,
            delivery_error: None,
        }
    }

    pub fn rejected() -> Self {
        Self {
            status: EventStatus::Failed,
            delivery_error: None,
        }
    }

    pub fn transport_failure(error: impl Into<String>) -> Self {
        Self {
            status: EventStatus::Failed,
            delivery_error: Some(error.into()),
        }
    }
}

/// Filters for the delivery-status query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub destination_id: Option<i64>,
    pub event_key_contains: Option<String>,
    /// Inclusive lower bound, canonical timestamp form.
    pub received_after: Option<String>,
    /// Inclusive upper bound, canonical timestamp form.
    pub received_before: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A queued delivery task referencing one ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTask {
    pub id: i64,
    pub event_id: i64,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}
