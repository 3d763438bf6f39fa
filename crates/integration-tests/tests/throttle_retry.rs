//! Integration tests for throttle handling.
//!
//! A throttled call gets exactly one retry after the back-off. A second
//! throttle aborts the run at the stage that was throttled.

#![allow(clippy::unwrap_used)]

use retail_sync::mapping::AmazonOrders;
use retail_sync::memory::InMemoryOrderStore;
use retail_sync::ports::ListFilter;
use retail_sync::{OrderWalker, RemoteError, SyncError, SyncStage};
use retail_sync_core::Retailer;
use retail_sync_integration_tests::fixtures::{amazon_item, amazon_order, at, context, policy};
use retail_sync_integration_tests::{RecordingTranslator, ScriptedFeed};

fn since() -> ListFilter {
    ListFilter::CreatedAfter(at("2016-01-01 00:00:00"))
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_throttled_page_is_retried_once() {
    let ctx = context(Retailer::Amazon);
    let feed = ScriptedFeed::new()
        .throttled_page()
        .page(
            vec![amazon_order("222-1", "Unshipped", "2016-01-05T10:00:00Z")],
            None,
        );
    let store = InMemoryOrderStore::new();
    let translator = RecordingTranslator::new();
    let walker = OrderWalker::new(&ctx, AmazonOrders, &feed, &store, &translator, policy());

    let report = walker.run(since()).await.unwrap();

    assert_eq!(feed.list_calls(), 2);
    assert_eq!(report.orders_upserted, 1);
    // Both calls asked for the same (first) page.
    assert_eq!(feed.cursors(), vec![None, None]);
}

#[tokio::test]
async fn test_second_listing_throttle_aborts() {
    let ctx = context(Retailer::Amazon);
    let feed = ScriptedFeed::new()
        .throttled_page()
        .throttled_page()
        .page(
            vec![amazon_order("222-2", "Unshipped", "2016-01-05T10:00:00Z")],
            None,
        );
    let store = InMemoryOrderStore::new();
    let translator = RecordingTranslator::new();
    let walker = OrderWalker::new(&ctx, AmazonOrders, &feed, &store, &translator, policy());

    let aborted = walker.run(since()).await.unwrap_err();

    assert!(matches!(
        aborted.error,
        SyncError::ThrottledExhausted {
            stage: SyncStage::Listing
        }
    ));
    assert_eq!(feed.list_calls(), 2);
    assert_eq!(aborted.report.pages, 0);
    assert_eq!(store.order_count().await, 0);
    assert!(translator.calls().is_empty());
}

#[tokio::test]
async fn test_remote_failure_is_not_retried() {
    let ctx = context(Retailer::Amazon);
    let feed = ScriptedFeed::new().failing_page(RemoteError::Rejected {
        code: "InvalidParameterValue".into(),
        message: "CreatedAfter is in the future".into(),
    });
    let store = InMemoryOrderStore::new();
    let translator = RecordingTranslator::new();
    let walker = OrderWalker::new(&ctx, AmazonOrders, &feed, &store, &translator, policy());

    let aborted = walker.run(since()).await.unwrap_err();

    assert!(matches!(
        aborted.error,
        SyncError::Remote {
            stage: SyncStage::Listing,
            source: RemoteError::Rejected { .. }
        }
    ));
    assert_eq!(feed.list_calls(), 1);
}

// =============================================================================
// Line Items
// =============================================================================

#[tokio::test]
async fn test_throttled_item_fetch_is_retried_once() {
    let ctx = context(Retailer::Amazon);
    let feed = ScriptedFeed::new()
        .page(
            vec![amazon_order("222-3", "Unshipped", "2016-01-05T10:00:00Z")],
            None,
        )
        .items("222-3", vec![amazon_item("A", 1, 0, "9.99")])
        .throttled_items("222-3", 1);
    let store = InMemoryOrderStore::new();
    let translator = RecordingTranslator::new();
    let walker = OrderWalker::new(&ctx, AmazonOrders, &feed, &store, &translator, policy());

    let report = walker.run(since()).await.unwrap();

    assert_eq!(feed.item_calls(), 2);
    assert_eq!(report.line_items_written, 1);
}

#[tokio::test]
async fn test_second_item_throttle_aborts_after_order_upsert() {
    let ctx = context(Retailer::Amazon);
    let feed = ScriptedFeed::new()
        .page(
            vec![
                amazon_order("222-4", "Unshipped", "2016-01-05T10:00:00Z"),
                amazon_order("222-5", "Unshipped", "2016-01-05T11:00:00Z"),
            ],
            None,
        )
        .items("222-4", vec![amazon_item("A", 1, 0, "9.99")])
        .throttled_items("222-4", 2);
    let store = InMemoryOrderStore::new();
    let translator = RecordingTranslator::new();
    let walker = OrderWalker::new(&ctx, AmazonOrders, &feed, &store, &translator, policy());

    let aborted = walker.run(since()).await.unwrap_err();

    assert!(matches!(
        aborted.error,
        SyncError::ThrottledExhausted {
            stage: SyncStage::ItemFetch
        }
    ));
    assert_eq!(feed.item_calls(), 2);
    // The order row was written before its items were requested; the
    // second order was never reached.
    assert_eq!(store.order_count().await, 1);
    let stored = store.orders().await.into_iter().next().unwrap();
    assert!(store.line_items(stored.id).await.is_empty());
    assert_eq!(stored.record.key.order_id, "222-4");
}
