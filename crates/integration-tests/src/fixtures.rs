//! Raw remote payloads and contexts shared by the integration tests.

use std::time::Duration;

use chrono::NaiveDateTime;
use retail_sync::{OrphanPolicy, StatusVocabulary, SyncContext, WalkPolicy};
use retail_sync_core::types::datetime::from_canonical;
use retail_sync_core::{Retailer, RetailSiteId, StatusId, WhslSiteId};
use serde_json::{Value, json};

pub const PROCESSING: StatusId = StatusId::new(1);
pub const UNSHIPPED: StatusId = StatusId::new(2);
pub const SHIPPED: StatusId = StatusId::new(3);
pub const CANCELLED: StatusId = StatusId::new(4);

pub const WHSL_SITE: WhslSiteId = WhslSiteId::new(7);
pub const RETAIL_SITE: RetailSiteId = RetailSiteId::new(11);

/// Parse a canonical `YYYY-MM-DD HH:MM:SS` timestamp.
///
/// # Panics
///
/// Panics on a malformed literal.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn at(canonical: &str) -> NaiveDateTime {
    from_canonical(canonical).unwrap()
}

#[must_use]
pub fn statuses() -> StatusVocabulary {
    StatusVocabulary::new()
        .with("Processing", PROCESSING)
        .with("Unshipped", UNSHIPPED)
        .with("Shipped", SHIPPED)
        .with("Cancelled", CANCELLED)
}

#[must_use]
pub fn context(retailer: Retailer) -> SyncContext {
    SyncContext::new(retailer, WHSL_SITE, RETAIL_SITE, statuses())
}

/// No pauses, a generous deadline, orphan cancellations abort.
#[must_use]
pub const fn policy() -> WalkPolicy {
    WalkPolicy::immediate(Duration::from_secs(60))
}

#[must_use]
pub const fn recording_policy() -> WalkPolicy {
    policy().with_orphan_policy(OrphanPolicy::Record)
}

// =============================================================================
// Amazon
// =============================================================================

/// Amazon order with a shipping address.
#[must_use]
pub fn amazon_order(order_id: &str, status: &str, last_updated: &str) -> Value {
    json!({
        "AmazonOrderId": order_id,
        "OrderStatus": status,
        "PurchaseDate": "2016-01-04T18:02:11Z",
        "LastUpdateDate": last_updated,
        "BuyerName": "Jane Buyer",
        "BuyerEmail": "Jane.Buyer@Marketplace.Example",
        "ShippingAddress": {
            "Name": "Jane Buyer",
            "AddressLine1": "1 Main St",
            "City": "Springfield",
            "StateOrRegion": "IL",
            "PostalCode": "62701",
            "CountryCode": "US",
            "Phone": "555-0100"
        }
    })
}

/// Amazon order without a shipping address (pending or cancelled).
#[must_use]
pub fn amazon_bare_order(order_id: &str, status: &str, last_updated: &str) -> Value {
    json!({
        "AmazonOrderId": order_id,
        "OrderStatus": status,
        "PurchaseDate": "2016-01-04T18:02:11Z",
        "LastUpdateDate": last_updated
    })
}

/// Amazon order item. `item_price` is the extended price of the line.
#[must_use]
pub fn amazon_item(item_id: &str, ordered: u32, shipped: u32, item_price: &str) -> Value {
    json!({
        "OrderItemId": item_id,
        "ASIN": "B00TEST",
        "SellerSKU": format!("SKU-{item_id}"),
        "Title": "Widget",
        "QuantityOrdered": ordered,
        "QuantityShipped": shipped,
        "ItemPrice": {"CurrencyCode": "USD", "Amount": item_price},
        "ShippingPrice": {"CurrencyCode": "USD", "Amount": "4.99"},
        "ItemTax": {"CurrencyCode": "USD", "Amount": "1.50"},
        "PromotionDiscount": {"CurrencyCode": "USD", "Amount": "2.00"},
        "PromotionIds": {"PromotionId": "PLM-FREESHIP"}
    })
}

// =============================================================================
// Shopify
// =============================================================================

/// Open Shopify order with embedded line items.
#[must_use]
pub fn shopify_order(id: u64, updated_at: &str, line_items: &[Value]) -> Value {
    json!({
        "id": id,
        "name": format!("#{id}"),
        "email": "buyer@example.com",
        "created_at": "2016-01-04T10:00:00-05:00",
        "updated_at": updated_at,
        "cancelled_at": null,
        "fulfillment_status": null,
        "total_tax": "0.00",
        "customer": {"id": 207_119_551, "email": "Bob.Norman@Hostmail.com"},
        "shipping_address": {
            "first_name": "Bob",
            "last_name": "Norman",
            "address1": "Chestnut Street 92",
            "city": "Louisville",
            "zip": "40202",
            "province": "Kentucky",
            "country": "United States"
        },
        "billing_address": {
            "first_name": "Bob",
            "last_name": "Norman",
            "phone": "555-555-5555"
        },
        "payment_details": {
            "credit_card_company": "Visa",
            "credit_card_number": "•••• •••• •••• 4242"
        },
        "line_items": line_items,
        "fulfillments": [],
        "refunds": [],
        "discount_codes": [],
        "shipping_lines": [{"price": "10.00"}]
    })
}

#[must_use]
pub fn shopify_line(id: u64, title: &str, price: &str, quantity: u32) -> Value {
    json!({
        "id": id,
        "product_id": 632_910_392,
        "sku": format!("SKU-{id}"),
        "title": title,
        "variant_title": "",
        "price": price,
        "quantity": quantity
    })
}

/// Shopify order cancelled at `cancelled_at`.
#[must_use]
pub fn shopify_cancelled(id: u64, updated_at: &str, cancelled_at: &str) -> Value {
    json!({
        "id": id,
        "updated_at": updated_at,
        "cancelled_at": cancelled_at
    })
}
