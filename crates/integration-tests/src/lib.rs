//! Integration tests for the retail sync engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p retail-sync-integration-tests
//! ```
//!
//! The engine runs against scripted collaborators defined here and the
//! in-memory store from `retail_sync::memory`. No network or database is
//! needed.
//!
//! # Fakes
//!
//! - [`ScriptedFeed`] - listing pages and line items served from a script,
//!   with call counters
//! - [`RecordingTranslator`] - records SKU translation requests
//! - [`ScriptedCarrier`] - carrier replies keyed by tracking number
//!
//! # Fixtures
//!
//! - [`fixtures`] - raw Amazon and Shopify payloads and a sync context

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use retail_sync::RemoteError;
use retail_sync::StoreError;
use retail_sync::ports::{
    CarrierClient, CarrierReply, ListFilter, OrderFeed, OrderPage, PageCursor, Remote,
    SkuTranslator,
};
use retail_sync_core::{Carrier, RetailSiteId, WhslSiteId};
use serde_json::Value;

pub mod fixtures;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type PageReply = Result<Remote<OrderPage>, RemoteError>;
type ItemsReply = Result<Remote<Vec<Value>>, RemoteError>;

// =============================================================================
// Order Feed
// =============================================================================

/// Order feed answering from a script.
///
/// Listing calls consume scripted replies in order; once the script runs
/// out every call returns an empty last page. Line-item calls consume the
/// per-order script first and then serve the order's fixed items.
#[derive(Debug, Default)]
pub struct ScriptedFeed {
    pages: Mutex<VecDeque<PageReply>>,
    item_script: Mutex<HashMap<String, VecDeque<ItemsReply>>>,
    items: HashMap<String, Vec<Value>>,
    orders: HashMap<String, Value>,
    cursors: Mutex<Vec<Option<PageCursor>>>,
    page_latency: Duration,
    list_calls: AtomicUsize,
    item_calls: AtomicUsize,
}

impl ScriptedFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page of orders.
    #[must_use]
    pub fn page(self, orders: Vec<Value>, next: Option<PageCursor>) -> Self {
        self.reply(Ok(Remote::Ready(OrderPage { orders, next })))
    }

    /// Queue a throttled listing reply.
    #[must_use]
    pub fn throttled_page(self) -> Self {
        self.reply(Ok(Remote::Throttled))
    }

    /// Queue a failed listing call.
    #[must_use]
    pub fn failing_page(self, error: RemoteError) -> Self {
        self.reply(Err(error))
    }

    #[must_use]
    pub fn reply(self, reply: PageReply) -> Self {
        lock(&self.pages).push_back(reply);
        self
    }

    /// Hold every listing call for `latency`.
    #[must_use]
    pub fn with_page_latency(mut self, latency: Duration) -> Self {
        self.page_latency = latency;
        self
    }

    /// Line items served for `order_id`.
    #[must_use]
    pub fn items(mut self, order_id: &str, items: Vec<Value>) -> Self {
        self.items.insert(order_id.to_string(), items);
        self
    }

    /// Throttle the next `times` line-item calls for `order_id`.
    #[must_use]
    pub fn throttled_items(self, order_id: &str, times: usize) -> Self {
        {
            let mut script = lock(&self.item_script);
            let queue = script.entry(order_id.to_string()).or_default();
            for _ in 0..times {
                queue.push_back(Ok(Remote::Throttled));
            }
        }
        self
    }

    /// Order served by `get_order`.
    #[must_use]
    pub fn order(mut self, order_id: &str, raw: Value) -> Self {
        self.orders.insert(order_id.to_string(), raw);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn item_calls(&self) -> usize {
        self.item_calls.load(Ordering::SeqCst)
    }

    /// Cursor of every listing call, in call order.
    pub fn cursors(&self) -> Vec<Option<PageCursor>> {
        lock(&self.cursors).clone()
    }
}

impl OrderFeed for ScriptedFeed {
    async fn list_orders(
        &self,
        _filter: &ListFilter,
        cursor: Option<&PageCursor>,
    ) -> Result<Remote<OrderPage>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.cursors).push(cursor.cloned());
        if !self.page_latency.is_zero() {
            tokio::time::sleep(self.page_latency).await;
        }
        lock(&self.pages)
            .pop_front()
            .unwrap_or_else(|| Ok(Remote::Ready(OrderPage::default())))
    }

    async fn get_order(&self, order_id: &str) -> Result<Remote<Option<Value>>, RemoteError> {
        Ok(Remote::Ready(self.orders.get(order_id).cloned()))
    }

    async fn get_order_line_items(
        &self,
        order_id: &str,
    ) -> Result<Remote<Vec<Value>>, RemoteError> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = lock(&self.item_script)
            .get_mut(order_id)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| {
            Ok(Remote::Ready(
                self.items.get(order_id).cloned().unwrap_or_default(),
            ))
        })
    }
}

// =============================================================================
// SKU Translator
// =============================================================================

/// SKU translator that records each request.
#[derive(Debug, Default)]
pub struct RecordingTranslator {
    calls: Mutex<Vec<(WhslSiteId, RetailSiteId)>>,
    fail: bool,
}

impl RecordingTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Translator whose every call fails after being recorded.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(WhslSiteId, RetailSiteId)> {
        lock(&self.calls).clone()
    }
}

impl SkuTranslator for RecordingTranslator {
    async fn translate_skus(
        &self,
        whsl_site_id: WhslSiteId,
        retail_site_id: RetailSiteId,
    ) -> Result<(), StoreError> {
        lock(&self.calls).push((whsl_site_id, retail_site_id));
        if self.fail {
            return Err(StoreError::Backend("translation table locked".into()));
        }
        Ok(())
    }
}

// =============================================================================
// Carrier
// =============================================================================

/// Carrier client answering from a fixed reply table.
///
/// Each call holds for `latency` so concurrent polls overlap; the highest
/// number of calls in flight at once is recorded.
#[derive(Debug)]
pub struct ScriptedCarrier {
    carrier: Carrier,
    replies: HashMap<String, Result<CarrierReply, String>>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedCarrier {
    #[must_use]
    pub fn new(carrier: Carrier) -> Self {
        Self {
            carrier,
            replies: HashMap::new(),
            latency: Duration::from_millis(5),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn response(mut self, tracking_number: &str, tree: Value) -> Self {
        self.replies
            .insert(tracking_number.to_string(), Ok(CarrierReply::Response(tree)));
        self
    }

    #[must_use]
    pub fn fault(mut self, tracking_number: &str, tree: Value) -> Self {
        self.replies
            .insert(tracking_number.to_string(), Ok(CarrierReply::Fault(tree)));
        self
    }

    /// Transport failure for `tracking_number`.
    #[must_use]
    pub fn unreachable(mut self, tracking_number: &str) -> Self {
        self.replies
            .insert(tracking_number.to_string(), Err("connection reset".to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl CarrierClient for ScriptedCarrier {
    fn carrier(&self) -> Carrier {
        self.carrier
    }

    async fn track(&self, tracking_number: &str) -> Result<CarrierReply, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.replies.get(tracking_number) {
            Some(Ok(reply)) => Ok(reply.clone()),
            Some(Err(message)) => Err(RemoteError::Unavailable(message.clone())),
            None => Err(RemoteError::Rejected {
                code: "404".into(),
                message: format!("unknown tracking number {tracking_number}"),
            }),
        }
    }
}
