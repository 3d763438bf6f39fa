//! Core types for retail order sync.
//!
//! This module provides type-safe wrappers and the canonical records that
//! remote orders and shipments normalize into.

pub mod datetime;
pub mod id;
pub mod line_item;
pub mod order;
pub mod shipment;
pub mod status;
pub mod totals;

pub use id::*;
pub use line_item::{LineItemRecord, OtherCharges};
pub use order::{Address, NaturalKey, OrderRecord, StoredOrder};
pub use shipment::{TrackingResult, TrackingStatus};
pub use status::*;
pub use totals::{DiscountEntry, DiscountKind, DiscountSet, TotalClass, TotalsRecord};
