// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the hookrelay webhook relay.
//!
//! This crate provides the adapter traits, error type, and domain types used
//! throughout the workspace. Storage backends implement the traits defined
//! here; the pipeline and gateway depend only on them.

pub mod error;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use types::{AdapterType, EventStatus, HealthStatus, HttpMethod, Payload, Role};

pub use traits::{PluginAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_error_has_all_variants() {
        let _config = RelayError::Config("test".into());
        let _storage = RelayError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _conflict = RelayError::Conflict {
            message: "test".into(),
        };
        let _not_found = RelayError::NotFound {
            entity: "destination",
            id: 7,
        };
        let _validation = RelayError::Validation(vec!["test".into()]);
        let _delivery = RelayError::Delivery {
            message: "test".into(),
            source: None,
        };
        let _timeout = RelayError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = RelayError::Internal("test".into());
    }

    #[test]
    fn adapter_type_display_round_trip() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Storage,
            AdapterType::Observability,
        ];
        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn storage_trait_is_object_safe() {
        fn _assert_object(_: &dyn StorageAdapter) {}
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
    }
}
