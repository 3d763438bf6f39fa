//! Integration tests for cancellation-only events.
//!
//! A cancellation patches status and dates onto the stored order and leaves
//! everything else alone. A bare cancellation for an order that was never
//! stored aborts the run unless the policy records it.

#![allow(clippy::unwrap_used)]

use retail_sync::mapping::{AmazonOrders, ShopifyOrders};
use retail_sync::memory::InMemoryOrderStore;
use retail_sync::ports::{ListFilter, OrderStore};
use retail_sync::{OrderWalker, SyncError, SyncStage};
use retail_sync_core::{NaturalKey, Retailer};
use retail_sync_integration_tests::fixtures::{
    CANCELLED, RETAIL_SITE, WHSL_SITE, amazon_bare_order, amazon_item, amazon_order, at, context,
    policy, recording_policy, shopify_cancelled, shopify_line, shopify_order,
};
use retail_sync_integration_tests::{RecordingTranslator, ScriptedFeed};
use serde_json::json;

fn since() -> ListFilter {
    ListFilter::UpdatedAfter(at("2016-01-01 00:00:00"))
}

#[tokio::test]
async fn test_amazon_cancellation_patches_stored_order() {
    let ctx = context(Retailer::Amazon);
    let store = InMemoryOrderStore::new();
    let translator = RecordingTranslator::new();

    let first = ScriptedFeed::new()
        .page(
            vec![amazon_order("333-1", "Unshipped", "2016-01-05T10:00:00Z")],
            None,
        )
        .items("333-1", vec![amazon_item("A", 1, 0, "20.00")]);
    OrderWalker::new(&ctx, AmazonOrders, &first, &store, &translator, policy())
        .run(since())
        .await
        .unwrap();

    let second = ScriptedFeed::new().page(
        vec![amazon_bare_order("333-1", "Canceled", "2016-01-06T09:00:00Z")],
        None,
    );
    let report = OrderWalker::new(&ctx, AmazonOrders, &second, &store, &translator, policy())
        .run(since())
        .await
        .unwrap();

    assert_eq!(report.cancelled, 1);
    assert_eq!(report.orders_upserted, 0);
    assert_eq!(second.item_calls(), 0);

    let stored = store
        .find_order(&NaturalKey::new("333-1", WHSL_SITE, RETAIL_SITE))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.record.status, Some(CANCELLED));
    assert_eq!(stored.record.date_canceled, Some(at("2016-01-06 09:00:00")));
    assert_eq!(stored.record.date_last_updated, Some(at("2016-01-06 09:00:00")));
    // Fields the cancellation does not carry are untouched.
    assert_eq!(stored.record.delivery.city.as_deref(), Some("SPRINGFIELD"));
    assert_eq!(store.line_items(stored.id).await.len(), 1);
}

#[tokio::test]
async fn test_shopify_cancellation_uses_cancelled_at() {
    let ctx = context(Retailer::Shopify);
    let store = InMemoryOrderStore::new();
    let translator = RecordingTranslator::new();

    let first = ScriptedFeed::new().page(
        vec![shopify_order(
            4001,
            "2016-01-05T10:00:00-05:00",
            &[shopify_line(1, "Tee", "25.00", 1)],
        )],
        None,
    );
    OrderWalker::new(&ctx, ShopifyOrders, &first, &store, &translator, policy())
        .run(since())
        .await
        .unwrap();

    let second = ScriptedFeed::new().page(
        vec![shopify_cancelled(
            4001,
            "2016-01-07T08:00:00-05:00",
            "2016-01-06T16:45:00-05:00",
        )],
        None,
    );
    OrderWalker::new(&ctx, ShopifyOrders, &second, &store, &translator, policy())
        .run(since())
        .await
        .unwrap();

    let stored = store.orders().await.into_iter().next().unwrap();
    assert_eq!(stored.record.status, Some(CANCELLED));
    assert_eq!(stored.record.date_canceled, Some(at("2016-01-06 21:45:00")));
    assert_eq!(stored.record.date_last_updated, Some(at("2016-01-07 13:00:00")));
    assert_eq!(stored.record.alt_order_id.as_deref(), Some("#4001"));
}

#[tokio::test]
async fn test_orphan_cancellation_aborts_by_default() {
    let ctx = context(Retailer::Amazon);
    let feed = ScriptedFeed::new().page(
        vec![amazon_bare_order("333-9", "Canceled", "2016-01-06T09:00:00Z")],
        None,
    );
    let store = InMemoryOrderStore::new();
    let translator = RecordingTranslator::new();
    let walker = OrderWalker::new(&ctx, AmazonOrders, &feed, &store, &translator, policy());

    let aborted = walker.run(since()).await.unwrap_err();

    assert!(matches!(
        &aborted.error,
        SyncError::OrphanCancellation { order_id } if order_id == "333-9"
    ));
    assert_eq!(aborted.error.stage(), SyncStage::Reconciliation);
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn test_orphan_cancellation_can_be_recorded() {
    let ctx = context(Retailer::Amazon);
    let feed = ScriptedFeed::new().page(
        vec![
            amazon_bare_order("333-8", "Canceled", "2016-01-06T09:00:00Z"),
            amazon_order("333-7", "Unshipped", "2016-01-06T10:00:00Z"),
        ],
        None,
    );
    let store = InMemoryOrderStore::new();
    let translator = RecordingTranslator::new();
    let walker = OrderWalker::new(
        &ctx,
        AmazonOrders,
        &feed,
        &store,
        &translator,
        recording_policy(),
    );

    let report = walker.run(since()).await.unwrap();

    assert_eq!(report.unresolved_cancellations, vec!["333-8".to_string()]);
    assert_eq!(report.cancelled, 0);
    assert_eq!(report.orders_upserted, 1);
    // The orphan is never created as a new order.
    assert!(
        store
            .find_order(&NaturalKey::new("333-8", WHSL_SITE, RETAIL_SITE))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_new_cancelled_shopify_order_with_address_is_stored() {
    let ctx = context(Retailer::Shopify);
    let mut cancelled = shopify_order(
        5001,
        "2016-01-07T08:00:00-05:00",
        &[shopify_line(1, "Tee", "25.00", 1)],
    );
    cancelled["cancelled_at"] = json!("2016-01-06T16:45:00-05:00");
    let feed = ScriptedFeed::new().page(
        vec![
            cancelled,
            shopify_order(
                5002,
                "2016-01-07T09:00:00-05:00",
                &[shopify_line(2, "Cap", "12.00", 1)],
            ),
        ],
        None,
    );
    let store = InMemoryOrderStore::new();
    let translator = RecordingTranslator::new();
    let walker = OrderWalker::new(&ctx, ShopifyOrders, &feed, &store, &translator, policy());

    let report = walker.run(since()).await.unwrap();

    assert_eq!(report.orders_upserted, 2);
    assert_eq!(report.cancelled, 0);
    assert!(report.unresolved_cancellations.is_empty());
    assert_eq!(store.order_count().await, 2);

    let stored = store
        .find_order(&NaturalKey::new("5001", WHSL_SITE, RETAIL_SITE))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.record.status, Some(CANCELLED));
    assert_eq!(stored.record.date_canceled, Some(at("2016-01-06 21:45:00")));
    assert_eq!(stored.record.delivery.city.as_deref(), Some("LOUISVILLE"));
    assert_eq!(store.line_items(stored.id).await.len(), 1);
    assert!(store.totals(stored.id).await.is_some());
}
