//! Retail order and shipment reconciliation engine.
//!
//! Takes loosely-typed remote order payloads (Amazon Marketplace and Shopify)
//! and carrier tracking replies (UPS and FedEx) and produces canonical
//! records from `retail-sync-core`:
//!
//! - [`extract`] - total accessors over remote payload trees
//! - [`mapping`] - per-source order, line-item and cancellation mapping
//! - [`totals`] - order totals and discount reconciliation
//! - [`merge`] - the upsert merge policy (monotonic ship date)
//! - [`walker`] - paged listing walk with throttle retry and a deadline
//! - [`shipment`] - carrier reply normalization over a bounded worker pool
//!
//! Transport and persistence are collaborators behind the traits in
//! [`ports`]. [`memory`] provides an in-process store for replays and tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod mapping;
pub mod memory;
pub mod merge;
pub mod ports;
pub mod shipment;
pub mod totals;
pub mod walker;

pub use config::{ConfigError, OrphanPolicy, SyncConfig, WalkPolicy};
pub use context::{StatusVocabulary, SyncContext};
pub use error::{RemoteError, StoreError, SyncError, SyncStage};
pub use walker::{OrderWalker, SyncReport};
