// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crash-safe delivery task queue.
//!
//! Tasks are written by [`crate::queries::events::record_fanout`]. A claim
//! moves a task to `processing` with a lease; a lease that expires without an
//! ack makes the task claimable again, so a worker crash redelivers instead of
//! losing the event. `attempts` counts claims. Acked tasks are deleted;
//! only tasks parked as `failed` outlive their attempt.

use std::time::Duration;

use hookrelay_core::types::DeliveryTask;
use hookrelay_core::RelayError;
use rusqlite::{params, OptionalExtension};
use tracing::warn;

use crate::database::{map_tr_err, Database};

/// Claim the oldest claimable task, leasing it for `lock_timeout`.
///
/// Expired leases that already used up their attempts are parked as
/// `failed` first. Returns `None` if nothing is claimable.
pub async fn dequeue(
    db: &Database,
    lock_timeout: Duration,
) -> Result<Option<DeliveryTask>, RelayError> {
    let lease = format!("+{} seconds", lock_timeout.as_secs().max(1));
    let (task, parked) = db
        .connection()
        .call(move |conn| -> Result<(Option<DeliveryTask>, usize), rusqlite::Error> {
            let tx = conn.transaction()?;

            let parked = tx.execute(
                "UPDATE delivery_queue SET status = 'failed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'processing'
                   AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                   AND attempts >= max_attempts",
                [],
            )?;

            let candidate = tx
                .query_row(
                    "SELECT id FROM delivery_queue
                     WHERE status = 'pending'
                        OR (status = 'processing'
                            AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ORDER BY id ASC
                     LIMIT 1",
                    [],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;

            let task = match candidate {
                Some(id) => Some(tx.query_row(
                    "UPDATE delivery_queue SET status = 'processing',
                     attempts = attempts + 1,
                     locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1
                     RETURNING id, event_id, status, attempts, max_attempts,
                               created_at, updated_at, locked_until",
                    params![id, lease],
                    |row| {
                        Ok(DeliveryTask {
                            id: row.get(0)?,
                            event_id: row.get(1)?,
                            status: row.get(2)?,
                            attempts: row.get(3)?,
                            max_attempts: row.get(4)?,
                            created_at: row.get(5)?,
                            updated_at: row.get(6)?,
                            locked_until: row.get(7)?,
                        })
                    },
                )?),
                None => None,
            };

            tx.commit()?;
            Ok((task, parked))
        })
        .await
        .map_err(map_tr_err)?;

    if parked > 0 {
        warn!(parked, "parked delivery tasks whose leases expired too often");
    }
    Ok(task)
}

/// Acknowledge a delivered task by removing it.
///
/// The ledger row carries the outcome, so a finished task has nothing left
/// to record.
pub async fn ack(db: &Database, id: i64) -> Result<(), RelayError> {
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM delivery_queue WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Release a task after an infrastructure failure.
///
/// The task returns to `pending` unless it has used up its attempts, in
/// which case it is parked as `failed`.
pub async fn fail(db: &Database, id: i64) -> Result<(), RelayError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE delivery_queue
                 SET status = CASE WHEN attempts >= max_attempts THEN 'failed' ELSE 'pending' END,
                     locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hookrelay_core::types::{HttpMethod, NewDestination, NewLedgerEntry};

    use super::*;
    use crate::queries::{destinations, events, identity};

    async fn seeded(max_attempts: i32) -> (tempfile::TempDir, Database, Vec<i64>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let account = identity::create_account(&db, "acme", "s1").await.unwrap();
        let dest = destinations::create_destination(
            &db,
            account.id,
            &NewDestination {
                url: "https://hooks.example.com".into(),
                http_method: HttpMethod::Post,
                headers: BTreeMap::from([("X-A".to_string(), "1".to_string())]),
            },
        )
        .await
        .unwrap();
        let mut ids = Vec::new();
        for key in ["a", "b"] {
            let entry = NewLedgerEntry {
                event_key: NewLedgerEntry::event_key(key, dest.id),
                account_id: account.id,
                destination_id: dest.id,
                payload: serde_json::Map::from_iter([("k".to_string(), key.into())]),
            };
            ids.extend(events::record_fanout(&db, &[entry], max_attempts).await.unwrap());
        }
        (dir, db, ids)
    }

    async fn task_count(db: &Database) -> i64 {
        db.connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM delivery_queue", [], |row| row.get(0))
            })
            .await
            .unwrap()
    }

    async fn status_of(db: &Database, task_id: i64) -> String {
        db.connection()
            .call(move |conn| -> Result<String, rusqlite::Error> {
                conn.query_row(
                    "SELECT status FROM delivery_queue WHERE id = ?1",
                    params![task_id],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap()
    }

    /// Force a task's lease into the past.
    async fn expire_lease(db: &Database, task_id: i64) {
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE delivery_queue SET locked_until = '2000-01-01T00:00:00.000Z'
                     WHERE id = ?1",
                    params![task_id],
                )?;
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dequeue_claims_in_fifo_order() {
        let (_dir, db, event_ids) = seeded(3).await;
        let lease = Duration::from_secs(60);

        let first = dequeue(&db, lease).await.unwrap().unwrap();
        assert_eq!(first.event_id, event_ids[0]);
        assert_eq!(first.status, "processing");
        assert_eq!(first.attempts, 1);
        assert!(first.locked_until.is_some());

        let second = dequeue(&db, lease).await.unwrap().unwrap();
        assert_eq!(second.event_id, event_ids[1]);
        assert!(dequeue(&db, lease).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ack_removes_task() {
        let (_dir, db, event_ids) = seeded(3).await;
        let lease = Duration::from_secs(60);
        assert_eq!(task_count(&db).await, 2);

        let task = dequeue(&db, lease).await.unwrap().unwrap();
        ack(&db, task.id).await.unwrap();
        assert_eq!(task_count(&db).await, 1);

        let next = dequeue(&db, lease).await.unwrap().unwrap();
        assert_eq!(next.event_id, event_ids[1]);
        ack(&db, next.id).await.unwrap();
        assert_eq!(task_count(&db).await, 0);
        assert!(dequeue(&db, lease).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fail_requeues_until_attempts_exhausted() {
        let (_dir, db, _) = seeded(2).await;
        let lease = Duration::from_secs(60);

        let task = dequeue(&db, lease).await.unwrap().unwrap();
        fail(&db, task.id).await.unwrap();
        assert_eq!(status_of(&db, task.id).await, "pending");

        let again = dequeue(&db, lease).await.unwrap().unwrap();
        assert_eq!(again.id, task.id);
        assert_eq!(again.attempts, 2);
        fail(&db, again.id).await.unwrap();
        assert_eq!(status_of(&db, task.id).await, "failed");
    }

    #[tokio::test]
    async fn expired_lease_is_reclaimed() {
        let (_dir, db, _) = seeded(3).await;
        let lease = Duration::from_secs(60);
        let task = dequeue(&db, lease).await.unwrap().unwrap();
        expire_lease(&db, task.id).await;

        let reclaimed = dequeue(&db, lease).await.unwrap().unwrap();
        assert_eq!(reclaimed.id, task.id);
        assert_eq!(reclaimed.attempts, 2);
    }

    #[tokio::test]
    async fn exhausted_expired_lease_is_parked() {
        let (_dir, db, _) = seeded(1).await;
        let lease = Duration::from_secs(60);
        let task = dequeue(&db, lease).await.unwrap().unwrap();
        expire_lease(&db, task.id).await;

        let next = dequeue(&db, lease).await.unwrap().unwrap();
        assert_ne!(next.id, task.id);
        assert_eq!(status_of(&db, task.id).await, "failed");
    }
}
