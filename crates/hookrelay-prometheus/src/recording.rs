// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a
//! no-op.

use metrics::{describe_counter, describe_histogram};

/// Register all hookrelay metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "hookrelay_events_ingested_total",
        "Inbound events accepted by the ingestion endpoint"
    );
    describe_counter!(
        "hookrelay_ledger_entries_total",
        "Ledger entries created by fan-out"
    );
    describe_counter!(
        "hookrelay_deliveries_total",
        "Delivery attempts by outcome"
    );
    describe_counter!(
        "hookrelay_ingest_rejections_total",
        "Inbound requests rejected, by reason"
    );
    describe_histogram!(
        "hookrelay_delivery_latency_seconds",
        "Outbound delivery request latency in seconds"
    );
}

/// Record an accepted inbound event and the ledger rows it fanned out to.
pub fn record_ingested(ledger_entries: usize) {
    metrics::counter!("hookrelay_events_ingested_total").increment(1);
    metrics::counter!("hookrelay_ledger_entries_total").increment(ledger_entries as u64);
}

/// Record a rejected inbound request.
pub fn record_rejection(reason: &'static str) {
    metrics::counter!("hookrelay_ingest_rejections_total", "reason" => reason).increment(1);
}

/// Record a finished delivery attempt (`success` or `failed`).
pub fn record_delivery(outcome: &str) {
    metrics::counter!("hookrelay_deliveries_total", "outcome" => outcome.to_string())
        .increment(1);
}

/// Record outbound request latency.
pub fn record_delivery_latency(seconds: f64) {
    metrics::histogram!("hookrelay_delivery_latency_seconds").record(seconds);
}

#[cfg(test)]
mod tests {
    use metrics_exporter_prometheus::PrometheusBuilder;

    use super::*;

    #[test]
    fn helpers_emit_relay_series() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            record_ingested(3);
            record_rejection("no_destinations");
            record_delivery("success");
            record_delivery_latency(0.25);
        });

        let rendered = handle.render();
        assert!(rendered.contains("hookrelay_events_ingested_total 1"));
        assert!(rendered.contains("hookrelay_ledger_entries_total 3"));
        assert!(rendered.contains("reason=\"no_destinations\""));
        assert!(rendered.contains("outcome=\"success\""));
        assert!(rendered.contains("hookrelay_delivery_latency_seconds"));
    }

    #[test]
    fn recording_without_recorder_is_a_noop() {
        record_delivery("failed");
        record_delivery_latency(1.0);
    }
}
