// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion and delivery pipeline for the hookrelay webhook relay.
//!
//! An inbound event is checked ([`validation`]), its account secret resolved
//! against the caller's memberships ([`resolver`]), and fanned out into one
//! ledger entry plus one queued delivery task per destination
//! ([`dispatcher`]). The [`pool`] of [`worker`]s later sends each entry to its
//! destination and records the outcome.

pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod ingest;
pub mod pool;
pub mod provisioning;
pub mod registry;
pub mod resolver;
pub mod validation;
pub mod worker;

pub use dispatcher::{DispatchResult, Dispatcher};
pub use error::IngestError;
pub use ingest::{IngestPipeline, IngestRequest};
pub use pool::WorkerPool;
pub use provisioning::{IssuedUser, Provisioner};
pub use registry::DestinationRegistry;
pub use resolver::{ResolveOutcome, SecretResolver};
pub use worker::DeliveryWorker;
