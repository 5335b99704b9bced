// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for hookrelay integration tests.
//!
//! [`TestHarness`] opens a temp SQLite database and seeds the `acme` tenant:
//! an admin and a plain member with session tokens, the well-known account
//! secret [`ACME_SECRET`], and any destinations the test asks for.

pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder, ACME_SECRET};
