//! Shopify Admin API order mapping.

use chrono::NaiveDateTime;
use retail_sync_core::{
    Address, CanonicalStatus, LineItemRecord, OrderRecord, RetailOrderId, Retailer,
};
use rust_decimal::Decimal;
use serde_json::Value;

use super::{CancellationPatch, OrderEvent, OrderSource, PAYMENT_METHOD, full_name, mask_card_number};
use crate::context::SyncContext;
use crate::extract;
use crate::totals::{self, Reconciled};

/// Note attribute holding marketing attribution answers.
const HEARD_ABOUT_ATTRIBUTE: &str = "how-did-you-hear-about-us";
const HEARD_ABOUT_SEPARATOR: &str = "::";
const FULFILLMENT_SUCCESS: &str = "success";

/// Shopify REST order payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShopifyOrders;

impl ShopifyOrders {
    fn address(raw: &Value, block: &str) -> Address {
        let field = |name: &str| extract::upper_text(raw, &format!("/{block}/{name}"));
        Address {
            name: full_name(
                extract::text(raw, &format!("/{block}/first_name")),
                extract::text(raw, &format!("/{block}/last_name")),
            ),
            company: field("company"),
            street1: field("address1"),
            street2: field("address2"),
            city: field("city"),
            postcode: field("zip"),
            state: field("province"),
            country: field("country"),
        }
    }

    /// Shipped when any fulfillment status is set, then cancelled, then
    /// processing. A fulfilled order that was later cancelled stays shipped.
    fn status(raw: &Value) -> CanonicalStatus {
        if extract::text(raw, "/fulfillment_status").is_some() {
            CanonicalStatus::Shipped
        } else if extract::text(raw, "/cancelled_at").is_some() {
            CanonicalStatus::Cancelled
        } else {
            CanonicalStatus::Processing
        }
    }

    fn card_type(raw: &Value) -> Option<String> {
        extract::upper_text(raw, "/payment_details/credit_card_company")
            .or_else(|| extract::upper_text(raw, "/payment_gateway_names/0"))
    }

    fn date_shipped(raw: &Value) -> Option<NaiveDateTime> {
        (extract::text(raw, "/fulfillments/0/status").as_deref() == Some(FULFILLMENT_SUCCESS))
            .then(|| extract::timestamp(raw, "/fulfillments/0/created_at"))
            .flatten()
    }

    fn heard_about(raw: &Value) -> Option<String> {
        let answers: Vec<String> = extract::items(raw, "/note_attributes")
            .into_iter()
            .filter(|attr| extract::text(attr, "/name").as_deref() == Some(HEARD_ABOUT_ATTRIBUTE))
            .filter_map(|attr| extract::text(attr, "/value"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        (!answers.is_empty()).then(|| answers.join(HEARD_ABOUT_SEPARATOR))
    }
}

impl OrderSource for ShopifyOrders {
    fn retailer(&self) -> Retailer {
        Retailer::Shopify
    }

    fn order_id(&self, raw: &Value) -> Option<String> {
        extract::text(raw, "/id")
    }

    fn last_updated(&self, raw: &Value) -> Option<NaiveDateTime> {
        extract::timestamp(raw, "/updated_at")
    }

    fn classify(&self, raw: &Value) -> OrderEvent {
        let has_address = extract::get(raw, "/shipping_address")
            .and_then(extract::non_empty)
            .is_some();
        if extract::has(raw, "/cancelled_at") {
            return match self.order_id(raw) {
                Some(order_id) => OrderEvent::CancellationOnly(CancellationPatch {
                    order_id,
                    date_last_updated: self.last_updated(raw),
                    date_canceled: extract::timestamp(raw, "/cancelled_at"),
                    mappable: has_address,
                }),
                None => OrderEvent::Skip("cancellation without order id"),
            };
        }
        if !has_address {
            return OrderEvent::Skip("no shipping address");
        }
        OrderEvent::Full
    }

    fn map_order(&self, raw: &Value, ctx: &SyncContext) -> Option<OrderRecord> {
        let order_id = self.order_id(raw)?;

        let mut record = OrderRecord::new(ctx.key(order_id));
        record.alt_order_id = extract::text(raw, "/name");
        record.status = ctx.statuses.resolve_or_processing(Self::status(raw).as_str());
        record.date_purchased = extract::timestamp(raw, "/created_at");
        record.date_last_updated = self.last_updated(raw);
        record.date_shipped = Self::date_shipped(raw);
        record.date_canceled = extract::timestamp(raw, "/cancelled_at");
        record.delivery = Self::address(raw, "shipping_address");
        record.billing = Self::address(raw, "billing_address");
        record.customer_id = extract::text(raw, "/customer/id");
        record.telephone = extract::text(raw, "/billing_address/phone");
        record.email = extract::lower(extract::text(raw, "/customer/email"));
        record.payment_method = Some(PAYMENT_METHOD.to_string());
        record.cc_type = Self::card_type(raw);
        record.cc_number = extract::text(raw, "/payment_details/credit_card_number")
            .and_then(|n| mask_card_number(&n));
        record.heard_about = Self::heard_about(raw);
        Some(record)
    }

    fn map_line_item(
        &self,
        raw_item: &Value,
        retail_order_id: Option<RetailOrderId>,
    ) -> Option<LineItemRecord> {
        let retail_order_id = retail_order_id?;
        let quantity = extract::quantity(raw_item, "/quantity");
        if quantity == 0 {
            return None;
        }

        let name = extract::text(raw_item, "/title").map(|title| {
            match extract::text(raw_item, "/variant_title") {
                Some(variant) => format!("{title} - {variant}"),
                None => title,
            }
        });
        let unit_price = extract::amount(raw_item, "/price").max(Decimal::ZERO);

        Some(LineItemRecord {
            retail_order_id,
            external_line_id: extract::text(raw_item, "/id"),
            product_external_id: extract::text(raw_item, "/product_id"),
            sku: extract::text(raw_item, "/sku"),
            name,
            quantity,
            unit_price,
            final_price: unit_price,
            other_charges: None,
        })
    }

    fn embedded_line_items<'v>(&self, raw: &'v Value) -> Option<Vec<&'v Value>> {
        Some(extract::items(raw, "/line_items"))
    }

    fn reconcile_totals(&self, raw: &Value, _lines: &[LineItemRecord]) -> Reconciled {
        totals::shopify_totals(raw)
    }
}
