// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery worker: sends one ledger entry to its destination and records
//! the outcome.
//!
//! Exactly one outbound request per attempt, no retries. A 2xx answer is a
//! success, any other status is a failure, and a transport error is a failure
//! with its description stored in `delivery_error`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hookrelay_config::model::DeliveryConfig;
use hookrelay_core::types::{DeliveryOutcome, Destination, HeaderSet, Payload};
use hookrelay_core::{HttpMethod, RelayError, StorageAdapter};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct DeliveryWorker {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    client: reqwest::Client,
}

impl DeliveryWorker {
    /// Build a worker whose HTTP client honours the delivery timeout and
    /// user agent from `config`.
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        config: &DeliveryConfig,
    ) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| RelayError::Delivery {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self::with_client(storage, client))
    }

    pub fn with_client(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        client: reqwest::Client,
    ) -> Self {
        Self { storage, client }
    }

    /// Deliver ledger entry `event_id` and persist the outcome.
    ///
    /// Returns `None` when the entry or its destination no longer exists, which
    /// happens when an account or destination is deleted with work queued or
    /// while the request is in flight.
    /// Errors are infrastructure failures only; a failed delivery is an `Ok`.
    pub async fn deliver(&self, event_id: i64) -> Result<Option<DeliveryOutcome>, RelayError> {
        let Some(event) = self.storage.get_event(event_id).await? else {
            warn!(event_id, "ledger entry no longer exists, skipping delivery");
            return Ok(None);
        };
        let Some(destination) = self.storage.get_destination(event.destination_id).await? else {
            warn!(
                event_id,
                destination_id = event.destination_id,
                "destination no longer exists, skipping delivery"
            );
            return Ok(None);
        };

        let outcome = self.send(&destination, &event.payload).await;
        if !self.storage.finalize_event(event.id, &outcome).await? {
            warn!(
                event_id,
                destination_id = destination.id,
                "ledger entry deleted during delivery, outcome discarded"
            );
            return Ok(None);
        }

        hookrelay_prometheus::record_delivery(&outcome.status.to_string());
        debug!(
            event_id,
            destination_id = destination.id,
            status = %outcome.status,
            "delivery finished"
        );
        Ok(Some(outcome))
    }

    /// Claim one task from the queue and process it.
    ///
    /// Returns false when nothing was claimable.
    pub async fn run_once(&self, lock_timeout: Duration) -> Result<bool, RelayError> {
        let Some(task) = self.storage.dequeue_delivery(lock_timeout).await? else {
            return Ok(false);
        };

        match self.deliver(task.event_id).await {
            Ok(_) => self.storage.ack_delivery(task.id).await?,
            Err(e) => {
                error!(
                    task_id = task.id,
                    event_id = task.event_id,
                    attempts = task.attempts,
                    error = %e,
                    "delivery task failed, releasing"
                );
                self.storage.fail_delivery(task.id).await?;
            }
        }
        Ok(true)
    }

    async fn send(&self, destination: &Destination, payload: &Payload) -> DeliveryOutcome {
        let headers = match build_headers(&destination.headers) {
            Ok(headers) => headers,
            Err(message) => return DeliveryOutcome::transport_failure(message),
        };

        let started = Instant::now();
        let result = self
            .client
            .request(to_reqwest_method(destination.http_method), &destination.url)
            .headers(headers)
            .json(payload)
            .send()
            .await;
        hookrelay_prometheus::record_delivery_latency(started.elapsed().as_secs_f64());

        match result {
            Ok(response) if response.status().is_success() => DeliveryOutcome::success(),
            Ok(response) => {
                debug!(
                    destination_id = destination.id,
                    status = response.status().as_u16(),
                    "destination rejected delivery"
                );
                DeliveryOutcome::rejected()
            }
            Err(e) => {
                let message = error_chain(&e);
                warn!(destination_id = destination.id, error = %message, "delivery transport error");
                DeliveryOutcome::transport_failure(message)
            }
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

/// Convert stored headers, reporting the first one the HTTP stack refuses.
fn build_headers(headers: &HeaderSet) -> Result<HeaderMap, String> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid header name `{name}`: {e}"))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| format!("invalid value for header `{name}`: {e}"))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Render an error with its sources, outermost first.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn headers_convert_to_header_map() {
        let headers = BTreeMap::from([
            ("X-Api-Key".to_string(), "abc".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]);
        let map = build_headers(&headers).unwrap();
        assert_eq!(map.get("x-api-key").unwrap(), "abc");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn bad_header_is_described() {
        let headers = BTreeMap::from([("bad name".to_string(), "v".to_string())]);
        let err = build_headers(&headers).unwrap_err();
        assert!(err.contains("bad name"));
    }

    #[test]
    fn methods_map_one_to_one() {
        assert_eq!(to_reqwest_method(HttpMethod::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest_method(HttpMethod::Post), reqwest::Method::POST);
        assert_eq!(to_reqwest_method(HttpMethod::Put), reqwest::Method::PUT);
        assert_eq!(to_reqwest_method(HttpMethod::Delete), reqwest::Method::DELETE);
    }

    #[test]
    fn error_chain_includes_sources() {
        let inner = std::io::Error::other("connection refused");
        let outer = RelayError::Delivery {
            message: "send failed".into(),
            source: Some(Box::new(inner)),
        };
        assert_eq!(
            error_chain(&outer),
            "delivery error: send failed: connection refused"
        );
    }
}
