// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types live in `hookrelay-core::types` so they can cross the
//! adapter trait boundary. This module re-exports them for use within the
//! storage crate.

pub use hookrelay_core::types::{
    Account, DeliveryOutcome, DeliveryTask, Destination, EventFilter, LedgerEntry, Membership,
    NewDestination, NewLedgerEntry, User,
};
