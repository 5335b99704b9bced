// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of the relay.
//!
//! Serves the ingestion endpoint (`POST /incoming_data`), the session
//! authenticated operator API for destinations and delivery status, and the
//! public `/health` and `/metrics` endpoints. All business logic lives in
//! `hookrelay-pipeline`; this crate maps requests in and errors out.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod server;

pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use server::{build_router, start_server, GatewayState, HealthState};
