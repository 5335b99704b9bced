// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-size pool of delivery workers polling the task queue.

use std::time::Duration;

use hookrelay_config::model::DeliveryConfig;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::worker::DeliveryWorker;

/// Runs `workers` independent dequeue → deliver → ack loops.
///
/// A slow destination occupies only the slot delivering to it. On
/// cancellation no new tasks are claimed; attempts already in flight finish.
pub struct WorkerPool {
    worker: DeliveryWorker,
    workers: usize,
    poll_interval: Duration,
    lock_timeout: Duration,
}

impl WorkerPool {
    pub fn new(worker: DeliveryWorker, config: &DeliveryConfig) -> Self {
        Self {
            worker,
            workers: config.workers.max(1),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            lock_timeout: Duration::from_secs(config.lock_timeout_secs),
        }
    }

    /// Run until `cancel` fires and every slot has drained.
    pub async fn run(self, cancel: CancellationToken) {
        info!(workers = self.workers, "delivery worker pool started");
        let mut slots = JoinSet::new();
        for slot in 0..self.workers {
            let worker = self.worker.clone();
            let cancel = cancel.clone();
            let poll_interval = self.poll_interval;
            let lock_timeout = self.lock_timeout;
            slots.spawn(async move {
                run_slot(slot, worker, cancel, poll_interval, lock_timeout).await;
            });
        }

        while let Some(joined) = slots.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "delivery worker slot panicked");
            }
        }
        info!("delivery worker pool stopped");
    }
}

async fn run_slot(
    slot: usize,
    worker: DeliveryWorker,
    cancel: CancellationToken,
    poll_interval: Duration,
    lock_timeout: Duration,
) {
    debug!(slot, "delivery worker slot started");
    while !cancel.is_cancelled() {
        match worker.run_once(lock_timeout).await {
            // Keep draining while there is work.
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => error!(slot, error = %e, "delivery queue unavailable"),
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
    debug!(slot, "delivery worker slot stopped");
}
