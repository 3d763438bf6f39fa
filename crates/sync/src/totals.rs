//! Totals and discounts reconciliation.
//!
//! Totals are recomputed from the full current remote order on every sync
//! and replace whatever was stored. Two paths produce the same
//! [`TotalsRecord`] shape:
//!
//! - [`shopify_totals`] reads order-level money fields, fulfillments,
//!   refunds and discount codes.
//! - [`aggregate_line_totals`] sums the per-line charges Amazon reports,
//!   since Amazon orders carry no order-level totals.

use retail_sync_core::{DiscountKind, DiscountSet, LineItemRecord, TotalsRecord};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::extract;

/// Code of the synthetic discount entry that carries net refunds.
pub const REFUND_CODE: &str = "refund";

/// Totals plus the discount entries they were derived with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub totals: TotalsRecord,
    pub discounts: DiscountSet,
}

/// Reconcile a full Shopify order.
#[must_use]
pub fn shopify_totals(order: &Value) -> Reconciled {
    let mut discounts = DiscountSet::new();

    let subtotal_ordered: Decimal = extract::items(order, "/line_items")
        .into_iter()
        .map(priced_quantity)
        .sum();
    let subtotal_shipped: Decimal = extract::items(order, "/fulfillments")
        .into_iter()
        .flat_map(|f| extract::items(f, "/line_items"))
        .map(priced_quantity)
        .sum();
    let subtotal = if subtotal_shipped.is_zero() {
        subtotal_ordered
    } else {
        subtotal_shipped
    };

    let refund = net_refund(order);
    if refund < Decimal::ZERO {
        discounts.accumulate(REFUND_CODE, refund, Some(DiscountKind::Refund));
    }

    let mut discount = Decimal::ZERO;
    for code in extract::items(order, "/discount_codes") {
        let amount = extract::amount(code, "/amount");
        discount -= amount;
        if let Some(name) = extract::text(code, "/code") {
            let kind = extract::text(code, "/type").map(DiscountKind::Code);
            discounts.accumulate(&name, -amount, kind);
        }
    }

    let shipping: Decimal = extract::items(order, "/shipping_lines")
        .into_iter()
        .map(|line| extract::amount(line, "/price"))
        .sum();
    let tax = extract::decimal(order, "/total_tax").filter(|t| *t > Decimal::ZERO);

    let net_discount = discount + refund;
    Reconciled {
        totals: TotalsRecord {
            subtotal,
            shipping,
            tax,
            gift_wrap: None,
            discount_coupon: (net_discount < Decimal::ZERO).then_some(net_discount),
            total: subtotal + discount + refund + tax.unwrap_or_default() + shipping,
        },
        discounts,
    }
}

/// Net refund: negated transaction amounts minus negated refunded-line
/// amounts. Negative when refunds reduced the order value beyond the
/// refunded lines themselves.
fn net_refund(order: &Value) -> Decimal {
    let refunds = extract::items(order, "/refunds");
    if refunds.is_empty() {
        return Decimal::ZERO;
    }

    let mut total_refund = Decimal::ZERO;
    let mut subtotal_refunded = Decimal::ZERO;
    for refund in refunds {
        let transactions = extract::items(refund, "/transactions");
        if transactions.is_empty() {
            continue;
        }
        for transaction in transactions {
            total_refund -= extract::amount(transaction, "/amount");
        }
        for refunded in extract::items(refund, "/refund_line_items") {
            let ordered = extract::integer(refunded, "/line_item/quantity").unwrap_or(0);
            let remaining = extract::integer(refunded, "/line_item/fulfillable_quantity").unwrap_or(0);
            subtotal_refunded -=
                extract::amount(refunded, "/line_item/price") * Decimal::from(ordered - remaining);
        }
    }
    total_refund - subtotal_refunded
}

fn priced_quantity(line: &Value) -> Decimal {
    extract::amount(line, "/price") * Decimal::from(extract::integer(line, "/quantity").unwrap_or(0))
}

/// Reconcile an order from its mapped lines' other charges.
#[must_use]
pub fn aggregate_line_totals(lines: &[LineItemRecord]) -> Reconciled {
    let mut discounts = DiscountSet::new();
    let mut subtotal = Decimal::ZERO;
    let mut shipping = Decimal::ZERO;
    let mut tax = Decimal::ZERO;
    let mut gift_wrap = Decimal::ZERO;
    let mut discount = Decimal::ZERO;

    for line in lines {
        subtotal += line.extended_price();
        if let Some(charges) = &line.other_charges {
            shipping += charges.shipping;
            tax += charges.tax;
            gift_wrap += charges.gift_wrap;
            discount += charges.discount_coupon;
            discounts.merge(&charges.promotions);
        }
    }

    let non_zero = |v: Decimal| (!v.is_zero()).then_some(v);
    Reconciled {
        totals: TotalsRecord {
            subtotal,
            shipping,
            tax: non_zero(tax),
            gift_wrap: non_zero(gift_wrap),
            discount_coupon: (discount < Decimal::ZERO).then_some(discount),
            total: subtotal + shipping + tax + gift_wrap + discount,
        },
        discounts,
    }
}
