// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event ledger queries.
//!
//! A fan-out writes one ledger row and one delivery task per destination in a
//! single transaction, so either every destination gets a row or none does.

use hookrelay_core::types::{DeliveryOutcome, EventFilter, LedgerEntry, NewLedgerEntry};
use hookrelay_core::RelayError;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};

use crate::database::{
    json_column, map_tr_err, parse_column, split_conflict, with_conflict, Database,
};
use crate::queries::destinations::like_pattern;

/// Default page size for [`list_events`].
pub const DEFAULT_EVENT_LIMIT: i64 = 100;
/// Upper bound on a single [`list_events`] page.
pub const MAX_EVENT_LIMIT: i64 = 1000;

const EVENT_COLUMNS: &str = "id, event_key, account_id, destination_id, received_at,
     processed_at, payload, delivery_error, status";

fn entry_from_row(row: &rusqlite::Row<'_>) -> Result<LedgerEntry, rusqlite::Error> {
    let payload: String = row.get(6)?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        event_key: row.get(1)?,
        account_id: row.get(2)?,
        destination_id: row.get(3)?,
        received_at: row.get(4)?,
        processed_at: row.get(5)?,
        payload: json_column(6, &payload)?,
        delivery_error: row.get(7)?,
        status: parse_column(8, row.get(8)?)?,
    })
}

/// Write every entry of a fan-out plus its delivery task atomically.
///
/// Returns the new ledger ids in input order. A duplicate `event_key` rolls
/// the whole batch back and surfaces as [`RelayError::Conflict`].
pub async fn record_fanout(
    db: &Database,
    entries: &[NewLedgerEntry],
    max_attempts: i32,
) -> Result<Vec<i64>, RelayError> {
    let rows = entries
        .iter()
        .map(|entry| {
            let payload = serde_json::to_string(&entry.payload).map_err(RelayError::storage)?;
            Ok((
                entry.event_key.clone(),
                entry.account_id,
                entry.destination_id,
                payload,
            ))
        })
        .collect::<Result<Vec<_>, RelayError>>()?;

    let result = db
        .connection()
        .call(move |conn| -> Result<Result<Vec<i64>, String>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut ids = Vec::with_capacity(rows.len());
            {
                let mut insert_event = tx.prepare(
                    "INSERT INTO events (event_key, account_id, destination_id, payload)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                let mut insert_task = tx.prepare(
                    "INSERT INTO delivery_queue (event_id, max_attempts) VALUES (?1, ?2)",
                )?;
                for (event_key, account_id, destination_id, payload) in &rows {
                    let inserted = split_conflict(insert_event.execute(params![
                        event_key,
                        account_id,
                        destination_id,
                        payload
                    ]))?;
                    if let Err(message) = inserted {
                        // Dropping `tx` without commit rolls back earlier rows.
                        return Ok(Err(format!("{event_key}: {message}")));
                    }
                    let event_id = tx.last_insert_rowid();
                    insert_task.execute(params![event_id, max_attempts])?;
                    ids.push(event_id);
                }
            }
            tx.commit()?;
            Ok(Ok(ids))
        })
        .await;
    with_conflict(result)
}

pub async fn get_event(db: &Database, id: i64) -> Result<Option<LedgerEntry>, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Record the terminal outcome of a delivery and stamp `processed_at`.
///
/// Returns false when the entry no longer exists.
pub async fn finalize_event(
    db: &Database,
    id: i64,
    outcome: &DeliveryOutcome,
) -> Result<bool, RelayError> {
    let status = outcome.status.to_string();
    let delivery_error = outcome.delivery_error.clone();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE events
                 SET status = ?1, delivery_error = ?2,
                     processed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![status, delivery_error, id],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Ledger entries of an account, newest first.
pub async fn list_events(
    db: &Database,
    account_id: i64,
    filter: &EventFilter,
) -> Result<Vec<LedgerEntry>, RelayError> {
    let (sql, values) = build_list_query(account_id, filter);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), entry_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

fn build_list_query(account_id: i64, filter: &EventFilter) -> (String, Vec<Value>) {
    let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE account_id = ?");
    let mut values = vec![Value::Integer(account_id)];

    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        values.push(Value::Text(status.to_string()));
    }
    if let Some(destination_id) = filter.destination_id {
        sql.push_str(" AND destination_id = ?");
        values.push(Value::Integer(destination_id));
    }
    if let Some(fragment) = &filter.event_key_contains {
        sql.push_str(" AND event_key LIKE ? ESCAPE '\\'");
        values.push(Value::Text(like_pattern(fragment)));
    }
    if let Some(after) = &filter.received_after {
        sql.push_str(" AND received_at >= ?");
        values.push(Value::Text(after.clone()));
    }
    if let Some(before) = &filter.received_before {
        sql.push_str(" AND received_at < ?");
        values.push(Value::Text(before.clone()));
    }

    let limit = filter
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);
    let offset = filter.offset.unwrap_or(0).max(0);
    sql.push_str(" ORDER BY received_at DESC, id DESC LIMIT ? OFFSET ?");
    values.push(Value::Integer(limit));
    values.push(Value::Integer(offset));

    (sql, values)
}
