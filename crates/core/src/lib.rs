//! Retail Sync Core - Canonical types for retail order synchronization.
//!
//! This crate provides the local schema that every external order and
//! shipment representation is normalized into:
//! - `retail-sync` - Mapping, reconciliation and sync walking
//! - `retail-sync-cli` - Command-line replay of captured payloads
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Mappers produce these records; persistence and transport
//! collaborators consume them.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, statuses, and the canonical record set

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
