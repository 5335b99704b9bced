// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Handles `POST /incoming_data`, the operator API under `/v1`, and the
//! public health and metrics endpoints.

use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use hookrelay_core::types::{
    Destination, DestinationUpdate, EventFilter, LedgerEntry, NewDestination, User,
};
use hookrelay_core::{EventStatus, HealthStatus, PluginAdapter, Role};
use hookrelay_pipeline::{IngestError, IngestRequest};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;

pub const TOKEN_HEADER: &str = "cl-x-token";
pub const EVENT_ID_HEADER: &str = "cl-x-event-id";

/// Response body for a successfully received event.
#[derive(Debug, Serialize)]
pub struct ReceivedResponse {
    pub message: &'static str,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Query parameters for the delivery-status listing.
#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    pub status: Option<String>,
    pub destination_id: Option<i64>,
    /// Substring of the client event id.
    pub event_id: Option<String>,
    pub received_after: Option<String>,
    pub received_before: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EventList {
    pub events: Vec<LedgerEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DestinationQuery {
    /// Substring of the destination URL.
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DestinationList {
    pub destinations: Vec<Destination>,
}

/// POST /incoming_data
///
/// Accepts an event for the account named by `CL-X-TOKEN` and fans it out to
/// every destination of that account.
pub async fn incoming_data(
    State(state): State<GatewayState>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ReceivedResponse>, ApiError> {
    let result = receive(&state, &user, &headers, &body).await;
    match result {
        Ok(()) => Ok(Json(ReceivedResponse {
            message: "Data Received",
        })),
        Err(err) => {
            hookrelay_prometheus::record_rejection(err.reason());
            tracing::debug!(
                user_id = user.id,
                reason = err.reason(),
                error = %err,
                "event rejected"
            );
            Err(err.into())
        }
    }
}

async fn receive(
    state: &GatewayState,
    user: &User,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), IngestError> {
    let token = match headers.get(TOKEN_HEADER) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| IngestError::BadCredentialFormat)?),
    };
    let event_id = match headers.get(EVENT_ID_HEADER) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| {
            IngestError::InvalidEventId("header is not visible ASCII".to_string())
        })?),
    };

    state
        .pipeline
        .ingest(
            user,
            IngestRequest {
                token,
                event_id,
                body,
            },
        )
        .await?;
    Ok(())
}

/// GET /v1/accounts/{account_id}/events
pub async fn list_events(
    State(state): State<GatewayState>,
    Extension(user): Extension<User>,
    Path(account_id): Path<i64>,
    Query(query): Query<EventQuery>,
) -> Result<Json<EventList>, ApiError> {
    authorize(&state, account_id, &user, Role::Member).await?;
    let filter = event_filter(query)?;
    let events = state.storage.list_events(account_id, &filter).await?;
    Ok(Json(EventList { events }))
}

/// GET /v1/accounts/{account_id}/destinations
pub async fn list_destinations(
    State(state): State<GatewayState>,
    Extension(user): Extension<User>,
    Path(account_id): Path<i64>,
    Query(query): Query<DestinationQuery>,
) -> Result<Json<DestinationList>, ApiError> {
    authorize(&state, account_id, &user, Role::Member).await?;
    let destinations = state
        .registry
        .search(account_id, query.url.as_deref())
        .await?;
    Ok(Json(DestinationList { destinations }))
}

/// POST /v1/accounts/{account_id}/destinations
pub async fn create_destination(
    State(state): State<GatewayState>,
    Extension(user): Extension<User>,
    Path(account_id): Path<i64>,
    Json(body): Json<NewDestination>,
) -> Result<(StatusCode, Json<Destination>), ApiError> {
    authorize(&state, account_id, &user, Role::Admin).await?;
    let created = state.registry.create(account_id, &body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /v1/destinations/{id}
pub async fn get_destination(
    State(state): State<GatewayState>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<Destination>, ApiError> {
    let destination = state.registry.get(id).await?;
    authorize(&state, destination.account_id, &user, Role::Member).await?;
    Ok(Json(destination))
}

/// PUT /v1/destinations/{id}
pub async fn update_destination(
    State(state): State<GatewayState>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
    Json(body): Json<DestinationUpdate>,
) -> Result<Json<Destination>, ApiError> {
    let current = state.registry.get(id).await?;
    authorize(&state, current.account_id, &user, Role::Admin).await?;
    let updated = state.registry.update(id, &body).await?;
    Ok(Json(updated))
}

/// DELETE /v1/destinations/{id}
pub async fn delete_destination(
    State(state): State<GatewayState>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let current = state.registry.get(id).await?;
    authorize(&state, current.account_id, &user, Role::Admin).await?;
    state.registry.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health
///
/// Unauthenticated; reports 503 when the database is unreachable.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let uptime_secs = state.health.start_time.elapsed().as_secs();
    let (status, label) = match state.storage.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy".to_string())
        }
    };
    let body = HealthResponse {
        status: label,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs,
    };
    (status, Json(body)).into_response()
}

/// GET /metrics
///
/// Prometheus text exposition, or 404 when the exporter is disabled.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Require `user` to be a member of `account_id` with at least `required`.
async fn authorize(
    state: &GatewayState,
    account_id: i64,
    user: &User,
    required: Role,
) -> Result<(), ApiError> {
    let membership = state
        .provisioner
        .membership(account_id, user.id)
        .await?
        .ok_or(ApiError::Forbidden)?;
    if required == Role::Admin && membership.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

fn event_filter(query: EventQuery) -> Result<EventFilter, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            EventStatus::from_str(s)
                .map_err(|_| ApiError::BadRequest(format!("unknown status `{s}`")))
        })
        .transpose()?;
    Ok(EventFilter {
        status,
        destination_id: query.destination_id,
        event_key_contains: query.event_id.filter(|s| !s.is_empty()),
        received_after: query
            .received_after
            .as_deref()
            .map(|t| storage_timestamp("received_after", t))
            .transpose()?,
        received_before: query
            .received_before
            .as_deref()
            .map(|t| storage_timestamp("received_before", t))
            .transpose()?,
        limit: query.limit,
        offset: query.offset,
    })
}

/// Convert an RFC 3339 timestamp to the UTC millisecond form the ledger
/// stores, so comparisons are lexical.
fn storage_timestamp(field: &str, raw: &str) -> Result<String, ApiError> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| ApiError::BadRequest(format!("{field}: {e}")))?;
    Ok(parsed
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true))
}
