//! Per-source order mapping.
//!
//! Each remote source implements [`OrderSource`]: it classifies a raw order
//! (full order, cancellation-only update, or skip), maps it to a canonical
//! [`OrderRecord`], maps its lines to [`LineItemRecord`]s, and reconciles its
//! totals. Mappers are total functions: partial payloads produce `None`
//! fields, never errors.

mod amazon;
mod shopify;

pub use amazon::AmazonOrders;
pub use shopify::ShopifyOrders;

use chrono::NaiveDateTime;
use retail_sync_core::{LineItemRecord, OrderRecord, RetailOrderId, Retailer};
use serde_json::Value;

use crate::context::SyncContext;
use crate::totals::Reconciled;

/// Literal that replaces all but the last four card digits.
pub const CARD_MASK: &str = "XXXX";

/// Payment method recorded for every marketplace order.
pub const PAYMENT_METHOD: &str = "Credit Card";

/// How the walker should treat one raw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    /// Map, upsert, and rewrite line items and totals.
    Full,
    /// Patch status and cancellation dates onto an existing order only.
    CancellationOnly(CancellationPatch),
    /// Not order-affecting.
    Skip(&'static str),
}

/// Fields a cancellation-only event carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationPatch {
    pub order_id: String,
    pub date_last_updated: Option<NaiveDateTime>,
    pub date_canceled: Option<NaiveDateTime>,
    /// The payload also carries a shipping address and maps as a full order
    /// when nothing is stored for it yet.
    pub mappable: bool,
}

/// One remote order source.
pub trait OrderSource: Send + Sync {
    fn retailer(&self) -> Retailer;

    /// Remote order ID.
    fn order_id(&self, raw: &Value) -> Option<String>;

    /// Remote last-modified time, used for watermark reporting.
    fn last_updated(&self, raw: &Value) -> Option<NaiveDateTime>;

    fn classify(&self, raw: &Value) -> OrderEvent;

    /// `None` when the order cannot be stored (no shipping address).
    fn map_order(&self, raw: &Value, ctx: &SyncContext) -> Option<OrderRecord>;

    /// `None` for zero-quantity lines and when the owning order is unknown.
    fn map_line_item(
        &self,
        raw_item: &Value,
        retail_order_id: Option<RetailOrderId>,
    ) -> Option<LineItemRecord>;

    /// Lines carried inside the order payload. `None` means they must be
    /// fetched separately.
    fn embedded_line_items<'v>(&self, raw: &'v Value) -> Option<Vec<&'v Value>>;

    /// Totals and discounts for a full order and its mapped lines.
    fn reconcile_totals(&self, raw: &Value, lines: &[LineItemRecord]) -> Reconciled;

    /// Map every line, dropping the ones that are not order-affecting.
    fn map_line_items(
        &self,
        raw_items: &[&Value],
        retail_order_id: RetailOrderId,
    ) -> Vec<LineItemRecord> {
        raw_items
            .iter()
            .filter_map(|item| self.map_line_item(item, Some(retail_order_id)))
            .collect()
    }
}

/// Source implementation for a retailer.
#[must_use]
pub fn source_for(retailer: Retailer) -> Box<dyn OrderSource> {
    match retailer {
        Retailer::Amazon => Box::new(AmazonOrders),
        Retailer::Shopify => Box::new(ShopifyOrders),
    }
}

impl<S: OrderSource + ?Sized> OrderSource for Box<S> {
    fn retailer(&self) -> Retailer {
        (**self).retailer()
    }

    fn order_id(&self, raw: &Value) -> Option<String> {
        (**self).order_id(raw)
    }

    fn last_updated(&self, raw: &Value) -> Option<NaiveDateTime> {
        (**self).last_updated(raw)
    }

    fn classify(&self, raw: &Value) -> OrderEvent {
        (**self).classify(raw)
    }

    fn map_order(&self, raw: &Value, ctx: &SyncContext) -> Option<OrderRecord> {
        (**self).map_order(raw, ctx)
    }

    fn map_line_item(
        &self,
        raw_item: &Value,
        retail_order_id: Option<RetailOrderId>,
    ) -> Option<LineItemRecord> {
        (**self).map_line_item(raw_item, retail_order_id)
    }

    fn embedded_line_items<'v>(&self, raw: &'v Value) -> Option<Vec<&'v Value>> {
        (**self).embedded_line_items(raw)
    }

    fn reconcile_totals(&self, raw: &Value, lines: &[LineItemRecord]) -> Reconciled {
        (**self).reconcile_totals(raw, lines)
    }
}

/// Join first and last name, upper-cased.
///
/// The separating space appears only when both parts are non-empty.
#[must_use]
pub fn full_name(first: Option<String>, last: Option<String>) -> Option<String> {
    let parts: Vec<String> = [first, last]
        .into_iter()
        .flatten()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" ").to_uppercase())
    }
}

/// Mask a card number down to its last four characters.
#[must_use]
pub fn mask_card_number(number: &str) -> Option<String> {
    let number = number.trim();
    if number.is_empty() {
        return None;
    }
    let tail: String = {
        let chars: Vec<char> = number.chars().collect();
        let start = chars.len().saturating_sub(4);
        chars.get(start..).unwrap_or_default().iter().collect()
    };
    Some(format!("{CARD_MASK}{tail}"))
}
