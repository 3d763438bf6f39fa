//! Amazon Marketplace order mapping.

use chrono::NaiveDateTime;
use retail_sync_core::{
    Address, DiscountKind, DiscountSet, LineItemRecord, OrderRecord, OtherCharges, RetailOrderId,
    Retailer,
};
use rust_decimal::Decimal;
use serde_json::Value;

use super::{CancellationPatch, OrderEvent, OrderSource, PAYMENT_METHOD};
use crate::context::SyncContext;
use crate::extract;
use crate::totals::{self, Reconciled};

/// Fractional digits kept on derived unit prices.
const PRICE_SCALE: u32 = 4;

/// Amazon order status names with special handling.
const STATUS_SHIPPED: &str = "Shipped";
const STATUS_CANCELED: &str = "Canceled";

/// Amazon listing payloads (`ListOrders` / `ListOrderItems` shapes).
#[derive(Debug, Clone, Copy, Default)]
pub struct AmazonOrders;

impl AmazonOrders {
    fn has_shipping_address(raw: &Value) -> bool {
        extract::get(raw, "/ShippingAddress")
            .and_then(extract::non_empty)
            .is_some()
    }

    fn delivery_address(raw: &Value) -> Address {
        Address {
            name: extract::upper_text(raw, "/ShippingAddress/Name"),
            company: None,
            street1: extract::upper_text(raw, "/ShippingAddress/AddressLine1"),
            street2: extract::upper_text(raw, "/ShippingAddress/AddressLine2"),
            city: extract::upper_text(raw, "/ShippingAddress/City"),
            postcode: extract::upper_text(raw, "/ShippingAddress/PostalCode"),
            state: extract::upper_text(raw, "/ShippingAddress/StateOrRegion"),
            country: extract::upper_text(raw, "/ShippingAddress/CountryCode"),
        }
    }

    fn promotions(raw_item: &Value) -> DiscountSet {
        let mut promotions = DiscountSet::new();
        for id in extract::strings(raw_item, "/PromotionIds") {
            promotions.note(&id, DiscountKind::SourcePromo);
        }
        promotions
    }

    fn other_charges(raw_item: &Value) -> OtherCharges {
        OtherCharges {
            tax: extract::amount(raw_item, "/ItemTax/Amount")
                + extract::amount(raw_item, "/ShippingTax/Amount")
                + extract::amount(raw_item, "/GiftWrapTax/Amount"),
            shipping: extract::amount(raw_item, "/ShippingPrice/Amount"),
            gift_wrap: extract::amount(raw_item, "/GiftWrapPrice/Amount"),
            discount_coupon: -extract::amount(raw_item, "/PromotionDiscount/Amount"),
            promotions: Self::promotions(raw_item),
        }
    }
}

impl OrderSource for AmazonOrders {
    fn retailer(&self) -> Retailer {
        Retailer::Amazon
    }

    fn order_id(&self, raw: &Value) -> Option<String> {
        extract::text(raw, "/AmazonOrderId")
    }

    fn last_updated(&self, raw: &Value) -> Option<NaiveDateTime> {
        extract::timestamp(raw, "/LastUpdateDate")
    }

    fn classify(&self, raw: &Value) -> OrderEvent {
        if Self::has_shipping_address(raw) {
            return OrderEvent::Full;
        }
        match (
            extract::text(raw, "/OrderStatus").as_deref(),
            self.order_id(raw),
        ) {
            (Some(STATUS_CANCELED), Some(order_id)) => {
                let updated = self.last_updated(raw);
                OrderEvent::CancellationOnly(CancellationPatch {
                    order_id,
                    date_last_updated: updated,
                    date_canceled: updated,
                    mappable: false,
                })
            }
            _ => OrderEvent::Skip("no shipping address"),
        }
    }

    fn map_order(&self, raw: &Value, ctx: &SyncContext) -> Option<OrderRecord> {
        if !Self::has_shipping_address(raw) {
            return None;
        }
        let order_id = self.order_id(raw)?;
        let status_name = extract::text(raw, "/OrderStatus");
        let last_updated = self.last_updated(raw);

        let mut record = OrderRecord::new(ctx.key(order_id));
        record.status = ctx
            .statuses
            .resolve_or_processing(status_name.as_deref().unwrap_or_default());
        record.date_purchased = extract::timestamp(raw, "/PurchaseDate");
        record.date_last_updated = last_updated;
        record.delivery = Self::delivery_address(raw);
        record.billing.name = extract::upper_text(raw, "/BuyerName");
        record.telephone = extract::text(raw, "/ShippingAddress/Phone");
        record.email = extract::lower(extract::text(raw, "/BuyerEmail"));
        record.payment_method = Some(PAYMENT_METHOD.to_string());
        if status_name.as_deref() == Some(STATUS_SHIPPED) {
            record.date_shipped = last_updated;
        }
        Some(record)
    }

    fn map_line_item(
        &self,
        raw_item: &Value,
        retail_order_id: Option<RetailOrderId>,
    ) -> Option<LineItemRecord> {
        let retail_order_id = retail_order_id?;
        let ordered = extract::quantity(raw_item, "/QuantityOrdered");
        if ordered == 0 {
            return None;
        }
        let shipped = extract::quantity(raw_item, "/QuantityShipped");
        let quantity = if shipped > 0 { shipped } else { ordered };

        let unit_price = (extract::amount(raw_item, "/ItemPrice/Amount") / Decimal::from(quantity))
            .round_dp(PRICE_SCALE);

        Some(LineItemRecord {
            retail_order_id,
            external_line_id: extract::text(raw_item, "/OrderItemId"),
            product_external_id: extract::text(raw_item, "/ASIN"),
            sku: extract::text(raw_item, "/SellerSKU"),
            name: extract::text(raw_item, "/Title"),
            quantity,
            unit_price,
            final_price: unit_price,
            other_charges: Some(Self::other_charges(raw_item)),
        })
    }

    fn embedded_line_items<'v>(&self, _raw: &'v Value) -> Option<Vec<&'v Value>> {
        None
    }

    fn reconcile_totals(&self, _raw: &Value, lines: &[LineItemRecord]) -> Reconciled {
        totals::aggregate_line_totals(lines)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use retail_sync_core::{RetailSiteId, StatusId, WhslSiteId};
    use serde_json::json;

    use super::*;
    use crate::context::StatusVocabulary;

    fn ctx() -> SyncContext {
        SyncContext::new(
            Retailer::Amazon,
            WhslSiteId::new(1),
            RetailSiteId::new(2),
            StatusVocabulary::new()
                .with("Processing", StatusId::new(1))
                .with("Shipped", StatusId::new(3))
                .with("Cancelled", StatusId::new(4))
                .with("Unshipped", StatusId::new(7)),
        )
    }

    fn order() -> Value {
        json!({
            "AmazonOrderId": "112-7654321-0000001",
            "OrderStatus": "Shipped",
            "PurchaseDate": "2016-01-04T22:11:03Z",
            "LastUpdateDate": "2016-01-05T14:20:36Z",
            "BuyerEmail": "Buyer@Marketplace.Amazon.com",
            "BuyerName": "Jo Buyer",
            "ShippingAddress": {
                "Name": "Jo Buyer",
                "AddressLine1": "1 Main St",
                "City": "Springfield",
                "PostalCode": "12345",
                "StateOrRegion": "il",
                "CountryCode": "us",
                "Phone": "555-0100"
            }
        })
    }

    #[test]
    fn test_map_order_fields() {
        let record = AmazonOrders.map_order(&order(), &ctx()).unwrap();
        assert_eq!(record.key.order_id, "112-7654321-0000001");
        assert_eq!(record.status, Some(StatusId::new(3)));
        assert_eq!(record.delivery.name.as_deref(), Some("JO BUYER"));
        assert_eq!(record.delivery.street1.as_deref(), Some("1 MAIN ST"));
        assert_eq!(record.delivery.street2, None);
        assert_eq!(record.delivery.country.as_deref(), Some("US"));
        assert_eq!(record.billing.name.as_deref(), Some("JO BUYER"));
        assert_eq!(record.email.as_deref(), Some("buyer@marketplace.amazon.com"));
        assert_eq!(record.telephone.as_deref(), Some("555-0100"));
        assert_eq!(record.payment_method.as_deref(), Some("Credit Card"));
        assert_eq!(
            record.date_shipped.map(|d| d.to_string()).as_deref(),
            Some("2016-01-05 14:20:36")
        );
    }

    #[test]
    fn test_unshipped_order_has_no_ship_date() {
        let mut raw = order();
        raw["OrderStatus"] = json!("Unshipped");
        let record = AmazonOrders.map_order(&raw, &ctx()).unwrap();
        assert_eq!(record.status, Some(StatusId::new(7)));
        assert!(record.date_shipped.is_none());
    }

    #[test]
    fn test_unknown_status_defaults_to_processing() {
        let mut raw = order();
        raw["OrderStatus"] = json!("PendingAvailability");
        let record = AmazonOrders.map_order(&raw, &ctx()).unwrap();
        assert_eq!(record.status, Some(StatusId::new(1)));
    }

    #[test]
    fn test_classify() {
        assert_eq!(AmazonOrders.classify(&order()), OrderEvent::Full);

        let canceled = json!({
            "AmazonOrderId": "112-1",
            "OrderStatus": "Canceled",
            "LastUpdateDate": "2016-01-06T00:00:00Z"
        });
        match AmazonOrders.classify(&canceled) {
            OrderEvent::CancellationOnly(patch) => {
                assert_eq!(patch.order_id, "112-1");
                assert_eq!(patch.date_canceled, patch.date_last_updated);
                assert!(patch.date_canceled.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }

        let pending = json!({"AmazonOrderId": "112-2", "OrderStatus": "Pending"});
        assert!(matches!(AmazonOrders.classify(&pending), OrderEvent::Skip(_)));
        assert!(AmazonOrders.map_order(&pending, &ctx()).is_none());
    }

    #[test]
    fn test_line_item_quantity_precedence() {
        let item = json!({
            "OrderItemId": "OI-1",
            "ASIN": "B00TEST",
            "SellerSKU": "SKU-1",
            "Title": "Widget",
            "QuantityOrdered": "3",
            "QuantityShipped": "2",
            "ItemPrice": {"CurrencyCode": "USD", "Amount": "30.00"}
        });
        let line = AmazonOrders
            .map_line_item(&item, Some(RetailOrderId::new(9)))
            .unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.unit_price, Decimal::new(15, 0));
        assert_eq!(line.final_price, line.unit_price);

        let mut unshipped = item;
        unshipped["QuantityShipped"] = json!("0");
        let line = AmazonOrders
            .map_line_item(&unshipped, Some(RetailOrderId::new(9)))
            .unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_price, Decimal::new(10, 0));
    }

    #[test]
    fn test_line_item_skips() {
        let zero = json!({"QuantityOrdered": "0", "ItemPrice": {"Amount": "1"}});
        assert!(AmazonOrders.map_line_item(&zero, Some(RetailOrderId::new(1))).is_none());

        let fine = json!({"QuantityOrdered": "1", "ItemPrice": {"Amount": "1"}});
        assert!(AmazonOrders.map_line_item(&fine, None).is_none());
    }

    #[test]
    fn test_line_item_charges_and_promotions() {
        let item = json!({
            "QuantityOrdered": 1,
            "ItemPrice": {"Amount": "20.00"},
            "ItemTax": {"Amount": "1.00"},
            "ShippingTax": {"Amount": "0.25"},
            "ShippingPrice": {"Amount": "3.99"},
            "PromotionDiscount": {"Amount": "2.00"},
            "PromotionIds": {"PromotionId": ["SPRING-Sale", "FreeShip"]}
        });
        let line = AmazonOrders
            .map_line_item(&item, Some(RetailOrderId::new(1)))
            .unwrap();
        let charges = line.other_charges.unwrap();
        assert_eq!(charges.tax, Decimal::new(125, 2));
        assert_eq!(charges.shipping, Decimal::new(399, 2));
        assert_eq!(charges.gift_wrap, Decimal::ZERO);
        assert_eq!(charges.discount_coupon, Decimal::new(-2, 0));
        let promo = charges.promotions.get("spring-sale").unwrap();
        assert_eq!(promo.value, None);
        assert_eq!(promo.kind, Some(DiscountKind::SourcePromo));
        assert_eq!(charges.promotions.len(), 2);
    }
}
