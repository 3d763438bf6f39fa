//! Order totals and discount records.
//!
//! Both are derived data: they are recomputed wholesale from the full remote
//! order on every sync and replace whatever was stored before.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Storage class of a single totals row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalClass {
    #[serde(rename = "ot_subtotal")]
    Subtotal,
    #[serde(rename = "ot_shipping")]
    Shipping,
    #[serde(rename = "ot_tax")]
    Tax,
    #[serde(rename = "ot_giftwrap")]
    GiftWrap,
    #[serde(rename = "ot_discount_coupon")]
    DiscountCoupon,
    #[serde(rename = "ot_total")]
    Total,
}

impl TotalClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subtotal => "ot_subtotal",
            Self::Shipping => "ot_shipping",
            Self::Tax => "ot_tax",
            Self::GiftWrap => "ot_giftwrap",
            Self::DiscountCoupon => "ot_discount_coupon",
            Self::Total => "ot_total",
        }
    }
}

/// Per-order money totals.
///
/// Optional classes are omitted, not zeroed, when they do not apply. Storage
/// distinguishes "no discount" (no row) from "zero discount".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsRecord {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tax: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gift_wrap: Option<Decimal>,
    /// Present only when the net of discounts and refunds is negative.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub discount_coupon: Option<Decimal>,
    pub total: Decimal,
}

impl TotalsRecord {
    /// Flatten into `(class, value)` rows, skipping omitted classes.
    #[must_use]
    pub fn rows(&self) -> Vec<(TotalClass, Decimal)> {
        let mut rows = vec![
            (TotalClass::Subtotal, self.subtotal),
            (TotalClass::Shipping, self.shipping),
        ];
        rows.extend(self.tax.map(|v| (TotalClass::Tax, v)));
        rows.extend(self.gift_wrap.map(|v| (TotalClass::GiftWrap, v)));
        rows.extend(self.discount_coupon.map(|v| (TotalClass::DiscountCoupon, v)));
        rows.push((TotalClass::Total, self.total));
        rows
    }
}

/// Where a discount entry came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DiscountKind {
    /// Marketplace promotion ID without a per-code amount.
    SourcePromo,
    /// Synthetic entry carrying net refunds.
    Refund,
    /// Discount code with the source's own type tag (`percentage`, ...).
    Code(String),
}

impl DiscountKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SourcePromo => "source-promo",
            Self::Refund => "refund",
            Self::Code(tag) => tag,
        }
    }
}

impl From<DiscountKind> for String {
    fn from(kind: DiscountKind) -> Self {
        kind.as_str().to_string()
    }
}

impl From<String> for DiscountKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "source-promo" => Self::SourcePromo,
            "refund" => Self::Refund,
            _ => Self::Code(tag),
        }
    }
}

/// One discount applied to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountEntry {
    /// Lower-cased code.
    pub code: String,
    /// Negative by convention; `None` when the source gives no amount.
    pub value: Option<Decimal>,
    pub kind: Option<DiscountKind>,
}

/// Discount entries keyed by lower-cased code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountSet {
    entries: BTreeMap<String, DiscountEntry>,
}

impl DiscountSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to the entry for `code`, creating it on first sight.
    ///
    /// The kind recorded on first sight is kept for later occurrences.
    pub fn accumulate(&mut self, code: &str, value: Decimal, kind: Option<DiscountKind>) {
        let key = code.to_lowercase();
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| DiscountEntry {
                code: key,
                value: None,
                kind,
            });
        entry.value = Some(entry.value.unwrap_or_default() + value);
    }

    /// Record a code that carries no amount. Existing entries win.
    pub fn note(&mut self, code: &str, kind: DiscountKind) {
        let key = code.to_lowercase();
        self.entries
            .entry(key.clone())
            .or_insert_with(|| DiscountEntry {
                code: key,
                value: None,
                kind: Some(kind),
            });
    }

    /// Fold every entry of `other` into this set.
    pub fn merge(&mut self, other: &Self) {
        for entry in other.entries.values() {
            match (entry.value, &entry.kind) {
                (Some(value), kind) => self.accumulate(&entry.code, value, kind.clone()),
                (None, Some(kind)) => self.note(&entry.code, kind.clone()),
                (None, None) => self.note(&entry.code, DiscountKind::SourcePromo),
            }
        }
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&DiscountEntry> {
        self.entries.get(&code.to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiscountEntry> {
        self.entries.values()
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<DiscountEntry> {
        self.entries.into_values().collect()
    }
}
