// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use hookrelay_core::RelayError;
use tracing::debug;

/// Per-connection settings. `foreign_keys` is not persisted by SQLite, so it
/// must be applied to every connection that writes.
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;
     PRAGMA busy_timeout = 5000;
     PRAGMA synchronous = NORMAL;";

/// Handle to the relay database.
///
/// Cloning is cheap: clones share the same background writer thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, RelayError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, RelayError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(RelayError::storage)?;
            }
        }

        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), RelayError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(RelayError::storage)?;
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode = WAL;")
                    .map_err(RelayError::storage)?;
            }
            conn.execute_batch(CONNECTION_PRAGMAS)
                .map_err(RelayError::storage)?;
            crate::migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| RelayError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(RelayError::storage)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(CONNECTION_PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The async connection used by the query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn close(&self) -> Result<(), RelayError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into a storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> RelayError {
    RelayError::storage(e)
}

/// Lift constraint violations out of a rusqlite result.
///
/// The outer `Result` carries every other database error; the inner one
/// carries the constraint message so callers can surface it as
/// [`RelayError::Conflict`] once the closure returns.
pub(crate) fn split_conflict<T>(
    result: Result<T, rusqlite::Error>,
) -> Result<Result<T, String>, rusqlite::Error> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(rusqlite::Error::SqliteFailure(err, message))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(Err(message.unwrap_or_else(|| err.to_string())))
        }
        Err(e) => Err(e),
    }
}

/// Flatten the result of a conflict-aware `call` into a single error type.
pub(crate) fn with_conflict<T>(
    result: Result<Result<T, String>, tokio_rusqlite::Error<rusqlite::Error>>,
) -> Result<T, RelayError> {
    result
        .map_err(map_tr_err)?
        .map_err(|message| RelayError::Conflict { message })
}

/// Map a TEXT column through `FromStr`, reporting failures as conversion errors.
pub(crate) fn parse_column<T>(idx: usize, raw: String) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unexpected value {raw:?}: {e}").into(),
        )
    })
}

/// Decode a JSON TEXT column.
pub(crate) fn json_column<T>(idx: usize, raw: &str) -> Result<T, rusqlite::Error>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
