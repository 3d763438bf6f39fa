//! Canonical order line item.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::RetailOrderId;
use super::totals::DiscountSet;

/// Per-line charges a marketplace reports alongside the item price.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherCharges {
    /// Item tax plus shipping tax plus gift-wrap tax.
    pub tax: Decimal,
    pub shipping: Decimal,
    pub gift_wrap: Decimal,
    /// Promotion discount, negated.
    pub discount_coupon: Decimal,
    pub promotions: DiscountSet,
}

/// One line of a canonical order.
///
/// Line items are replaced as a whole set per order on every sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRecord {
    pub retail_order_id: RetailOrderId,
    pub external_line_id: Option<String>,
    pub product_external_id: Option<String>,
    pub sku: Option<String>,
    pub name: Option<String>,
    /// Shipped quantity when known and nonzero, else ordered quantity.
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Starts equal to `unit_price`; promotions may adjust it later.
    pub final_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub other_charges: Option<OtherCharges>,
}

impl LineItemRecord {
    /// Unit price times quantity.
    #[must_use]
    pub fn extended_price(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}
