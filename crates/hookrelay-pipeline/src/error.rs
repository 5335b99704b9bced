// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion error taxonomy.

use hookrelay_core::RelayError;
use thiserror::Error;

/// Why an inbound event was not accepted.
///
/// Every variant is produced before or instead of a committed fan-out, so an
/// `IngestError` always means zero ledger rows were written.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The account token header was absent or blank.
    #[error("CL-X-TOKEN header is required")]
    MissingToken,

    /// The account token is not a canonical UUID.
    #[error("CL-X-TOKEN is not a valid account token")]
    BadCredentialFormat,

    /// No account with this token has the caller as a member.
    #[error("no account found for this token")]
    Unauthorized,

    /// More than one account matched the token.
    #[error("token matches more than one account")]
    AmbiguousCredential { count: usize },

    #[error("Invalid Data: {0}")]
    InvalidPayload(String),

    #[error("invalid CL-X-EVENT-ID: {0}")]
    InvalidEventId(String),

    /// The account has no destinations to fan out to.
    #[error("No destinations for this account")]
    NoDestinations,

    /// A ledger key already exists, typically a replayed event id.
    #[error("Failed to create log: {message}")]
    LedgerWriteConflict { message: String },

    #[error("Failed to create log: {0}")]
    Storage(#[source] RelayError),
}

impl IngestError {
    /// Stable label used for rejection metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            IngestError::MissingToken => "missing_token",
            IngestError::BadCredentialFormat => "bad_credential_format",
            IngestError::Unauthorized => "unauthorized",
            IngestError::AmbiguousCredential { .. } => "ambiguous_credential",
            IngestError::InvalidPayload(_) => "invalid_payload",
            IngestError::InvalidEventId(_) => "invalid_event_id",
            IngestError::NoDestinations => "no_destinations",
            IngestError::LedgerWriteConflict { .. } => "ledger_write_conflict",
            IngestError::Storage(_) => "storage",
        }
    }
}

impl From<RelayError> for IngestError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Conflict { message } => IngestError::LedgerWriteConflict { message },
            other => IngestError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_becomes_ledger_write_conflict() {
        let err: IngestError = RelayError::Conflict {
            message: "UNIQUE constraint failed: events.event_key".into(),
        }
        .into();
        assert!(matches!(err, IngestError::LedgerWriteConflict { .. }));
        assert_eq!(err.reason(), "ledger_write_conflict");
    }

    #[test]
    fn other_relay_errors_are_storage() {
        let err: IngestError = RelayError::Internal("boom".into()).into();
        assert!(matches!(err, IngestError::Storage(_)));
    }
}
