// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind addresses, non-empty paths, and positive pool sizes.

use crate::diagnostic::ConfigError;
use crate::model::RelayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "server.log_level must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.server.log_level
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.gateway.rate_limit_per_second == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.rate_limit_per_second must be at least 1".to_string(),
        });
    }

    if config.gateway.max_body_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.max_body_bytes must be at least 1".to_string(),
        });
    }

    if config.gateway.max_concurrent_requests == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.max_concurrent_requests must be at least 1".to_string(),
        });
    }

    if config.delivery.workers == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.workers must be at least 1".to_string(),
        });
    }

    if config.delivery.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.request_timeout_secs must be at least 1".to_string(),
        });
    }

    // A lock shorter than the request timeout would let a second worker
    // claim a task that is still in flight.
    if config.delivery.lock_timeout_secs <= config.delivery.request_timeout_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "delivery.lock_timeout_secs ({}) must exceed delivery.request_timeout_secs ({})",
                config.delivery.lock_timeout_secs, config.delivery.request_timeout_secs
            ),
        });
    }

    if config.delivery.max_task_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "delivery.max_task_attempts must be at least 1, got {}",
                config.delivery.max_task_attempts
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
