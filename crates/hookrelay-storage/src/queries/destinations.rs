// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination registry queries.

use hookrelay_core::types::{Destination, NewDestination};
use hookrelay_core::RelayError;
use rusqlite::{params, OptionalExtension};

use crate::database::{
    json_column, map_tr_err, parse_column, split_conflict, with_conflict, Database,
};

const DESTINATION_COLUMNS: &str =
    "id, account_id, url, http_method, headers, created_at, updated_at";

fn destination_from_row(row: &rusqlite::Row<'_>) -> Result<Destination, rusqlite::Error> {
    let headers: String = row.get(4)?;
    Ok(Destination {
        id: row.get(0)?,
        account_id: row.get(1)?,
        url: row.get(2)?,
        http_method: parse_column(3, row.get(3)?)?,
        headers: json_column(4, &headers)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn encode_headers(destination: &NewDestination) -> Result<String, RelayError> {
    serde_json::to_string(&destination.headers).map_err(RelayError::storage)
}

/// Insert a destination owned by `account_id`.
pub async fn create_destination(
    db: &Database,
    account_id: i64,
    destination: &NewDestination,
) -> Result<Destination, RelayError> {
    let url = destination.url.clone();
    let method = destination.http_method.to_string();
    let headers = encode_headers(destination)?;
    let result = db
        .connection()
        .call(move |conn| {
            split_conflict(conn.query_row(
                &format!(
                    "INSERT INTO destinations (account_id, url, http_method, headers)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {DESTINATION_COLUMNS}"
                ),
                params![account_id, url, method, headers],
                destination_from_row,
            ))
        })
        .await;
    with_conflict(result)
}

pub async fn get_destination(db: &Database, id: i64) -> Result<Option<Destination>, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {DESTINATION_COLUMNS} FROM destinations WHERE id = ?1"),
                params![id],
                destination_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All destinations of an account in id order, optionally narrowed to URLs
/// containing `url_contains` (case-insensitive).
pub async fn list_destinations(
    db: &Database,
    account_id: i64,
    url_contains: Option<&str>,
) -> Result<Vec<Destination>, RelayError> {
    let pattern = url_contains.map(like_pattern);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DESTINATION_COLUMNS} FROM destinations
                 WHERE account_id = ?1
                   AND (?2 IS NULL OR url LIKE ?2 ESCAPE '\\')
                 ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map(params![account_id, pattern], destination_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace every mutable field of a destination. `None` if it does not exist.
pub async fn update_destination(
    db: &Database,
    id: i64,
    destination: &NewDestination,
) -> Result<Option<Destination>, RelayError> {
    let url = destination.url.clone();
    let method = destination.http_method.to_string();
    let headers = encode_headers(destination)?;
    let result = db
        .connection()
        .call(move |conn| {
            split_conflict(
                conn.query_row(
                    &format!(
                        "UPDATE destinations
                         SET url = ?1, http_method = ?2, headers = ?3,
                             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?4
                         RETURNING {DESTINATION_COLUMNS}"
                    ),
                    params![url, method, headers, id],
                    destination_from_row,
                )
                .optional(),
            )
        })
        .await;
    with_conflict(result)
}

/// Delete a destination along with its ledger entries.
pub async fn delete_destination(db: &Database, id: i64) -> Result<bool, RelayError> {
    db.connection()
        .call(move |conn| {
            let affected = conn.execute("DELETE FROM destinations WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Build a `LIKE` pattern matching `needle` anywhere, with wildcards escaped.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
