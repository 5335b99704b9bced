// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./hookrelay.toml` > `~/.config/hookrelay/hookrelay.toml`
//! > `/etc/hookrelay/hookrelay.toml` with environment variable overrides via
//! the `HOOKRELAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RelayConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/hookrelay/hookrelay.toml` (system-wide)
/// 3. `~/.config/hookrelay/hookrelay.toml` (user XDG config)
/// 4. `./hookrelay.toml` (local directory)
/// 5. `HOOKRELAY_*` environment variables
pub fn load_config() -> Result<RelayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file("/etc/hookrelay/hookrelay.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("hookrelay/hookrelay.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("hookrelay.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that
/// `HOOKRELAY_DELIVERY_REQUEST_TIMEOUT_SECS` maps to
/// `delivery.request_timeout_secs`, not `delivery.request.timeout.secs`.
fn env_provider() -> Env {
    Env::prefixed("HOOKRELAY_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("delivery_", "delivery.", 1)
            .replacen("prometheus_", "prometheus.", 1);
        mapped.into()
    })
}
