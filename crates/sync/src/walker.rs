//! Paged order sync walk.
//!
//! A walk pulls listing pages strictly in order (each cursor comes from the
//! previous page), classifies every order on a page, and upserts full orders
//! with their line items, totals and discounts. Throttled calls get one
//! retry after a fixed back-off. The run checks its deadline before every
//! page and every order and stops cleanly when it is exceeded; orders
//! already written stay written.

use std::future::Future;
use std::time::Duration;

use async_stream::try_stream;
use chrono::NaiveDateTime;
use futures::{Stream, StreamExt, pin_mut};
use retail_sync_core::{CanonicalStatus, Retailer, StoredOrder};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{Span, debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{OrphanPolicy, WalkPolicy};
use crate::context::SyncContext;
use crate::error::{RemoteError, SyncError, SyncStage};
use crate::mapping::{CancellationPatch, OrderEvent, OrderSource};
use crate::merge::upsert_order;
use crate::ports::{ListFilter, OrderFeed, OrderPage, OrderStore, PageCursor, Remote, SkuTranslator};

/// Outcome counters and watermarks of one walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub retailer: Retailer,
    /// Date the walk started from; a failed run resumes here.
    #[serde(with = "retail_sync_core::types::datetime::option")]
    pub watermark: Option<NaiveDateTime>,
    /// Latest remote update seen; a successful run may advance to it.
    #[serde(with = "retail_sync_core::types::datetime::option")]
    pub high_water: Option<NaiveDateTime>,
    pub pages: u32,
    pub orders_upserted: usize,
    pub cancelled: usize,
    pub skipped: usize,
    pub line_items_written: usize,
    /// Cancellations for orders that were never stored.
    pub unresolved_cancellations: Vec<String>,
}

impl SyncReport {
    fn new(retailer: Retailer, watermark: Option<NaiveDateTime>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            retailer,
            watermark,
            high_water: None,
            pages: 0,
            orders_upserted: 0,
            cancelled: 0,
            skipped: 0,
            line_items_written: 0,
            unresolved_cancellations: Vec::new(),
        }
    }

    fn observe(&mut self, updated: Option<NaiveDateTime>) {
        if updated > self.high_water {
            self.high_water = updated;
        }
    }
}

/// A walk that stopped early, with what it did before stopping.
#[derive(Debug, Error)]
#[error("sync run {} aborted at {}: {}", .report.run_id, .error.stage(), .error)]
pub struct SyncAborted {
    #[source]
    pub error: SyncError,
    pub report: SyncReport,
}

/// Counters of an orphan line-item repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub orders_checked: usize,
    pub orders_repaired: usize,
    pub line_items_written: usize,
}

/// One fetched listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// One-based position in this walk.
    pub number: u32,
    pub orders: Vec<Value>,
}

/// Wall-clock budget of a run.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    #[must_use]
    pub fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// # Errors
    ///
    /// Returns `DeadlineExceeded` once the budget is spent.
    pub fn check(&self, stage: SyncStage) -> Result<(), SyncError> {
        if self.started.elapsed() > self.limit {
            return Err(SyncError::DeadlineExceeded {
                stage,
                limit: self.limit,
            });
        }
        Ok(())
    }
}

/// Call `call`; when throttled, wait `backoff` and call it exactly once more.
///
/// # Errors
///
/// `ThrottledExhausted` when the retry is throttled too, `Remote` when either
/// call fails.
pub async fn with_throttle_retry<T, F, Fut>(
    stage: SyncStage,
    backoff: Duration,
    mut call: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Remote<T>, RemoteError>>,
{
    let remote = |e| SyncError::remote(stage, e);

    if let Remote::Ready(value) = call().await.map_err(remote)? {
        return Ok(value);
    }
    warn!(%stage, ?backoff, "remote throttled, retrying once after back-off");
    sleep(backoff).await;

    match call().await.map_err(remote)? {
        Remote::Ready(value) => Ok(value),
        Remote::Throttled => Err(SyncError::ThrottledExhausted { stage }),
    }
}

/// Walks one source's listing into a store.
pub struct OrderWalker<'a, O, F, S, T> {
    ctx: &'a SyncContext,
    source: O,
    feed: &'a F,
    store: &'a S,
    translator: &'a T,
    policy: WalkPolicy,
}

impl<'a, O, F, S, T> OrderWalker<'a, O, F, S, T>
where
    O: OrderSource,
    F: OrderFeed,
    S: OrderStore,
    T: SkuTranslator,
{
    pub const fn new(
        ctx: &'a SyncContext,
        source: O,
        feed: &'a F,
        store: &'a S,
        translator: &'a T,
        policy: WalkPolicy,
    ) -> Self {
        Self {
            ctx,
            source,
            feed,
            store,
            translator,
            policy,
        }
    }

    /// Listing pages, fetched lazily.
    ///
    /// An empty first page or an empty numbered page ends the stream. An
    /// empty page reached through a continuation token is an error: the
    /// remote promised more orders and returned none.
    pub fn pages<'s>(
        &'s self,
        filter: &'s ListFilter,
        deadline: &'s Deadline,
    ) -> impl Stream<Item = Result<FetchedPage, SyncError>> + 's {
        try_stream! {
            let mut cursor: Option<PageCursor> = None;
            let mut number: u32 = 0;

            loop {
                deadline.check(SyncStage::Listing)?;
                if matches!(cursor, Some(PageCursor::Token(_))) && !self.policy.page_delay.is_zero() {
                    debug!(delay = ?self.policy.page_delay, "pacing before next token page");
                    sleep(self.policy.page_delay).await;
                }
                number += 1;

                let OrderPage { orders, next } = self.fetch_page(filter, cursor.as_ref(), number).await?;
                if orders.is_empty() {
                    if matches!(cursor, Some(PageCursor::Token(_))) {
                        Err::<(), _>(SyncError::EmptyPage { page: number })?;
                    }
                    debug!(page = number, "empty page ends the walk");
                    break;
                }

                yield FetchedPage { number, orders };

                match next {
                    Some(next) if *filter != ListFilter::Open => cursor = Some(next),
                    _ => break,
                }
            }
        }
    }

    #[instrument(skip(self, filter, cursor), fields(cursor = ?cursor))]
    async fn fetch_page(
        &self,
        filter: &ListFilter,
        cursor: Option<&PageCursor>,
        page: u32,
    ) -> Result<OrderPage, SyncError> {
        with_throttle_retry(SyncStage::Listing, self.policy.throttle_backoff, || {
            self.feed.list_orders(filter, cursor)
        })
        .await
    }

    /// Walk every page of `filter`, then trigger SKU translation.
    ///
    /// # Errors
    ///
    /// Returns `SyncAborted` with the stage that failed and the counters up
    /// to that point.
    #[instrument(
        skip_all,
        fields(
            retailer = %self.ctx.retailer,
            whsl_site_id = %self.ctx.whsl_site_id,
            run_id = tracing::field::Empty,
        )
    )]
    pub async fn run(&self, filter: ListFilter) -> Result<SyncReport, SyncAborted> {
        let mut report = SyncReport::new(self.source.retailer(), filter.watermark());
        Span::current().record("run_id", tracing::field::display(report.run_id));

        match self.walk(&filter, &mut report).await {
            Ok(()) => {
                self.translate_skus().await;
                info!(
                    pages = report.pages,
                    upserted = report.orders_upserted,
                    cancelled = report.cancelled,
                    skipped = report.skipped,
                    "sync run finished"
                );
                Ok(report)
            }
            Err(error) => {
                tracing::error!(stage = %error.stage(), error = %error, "sync run aborted");
                Err(SyncAborted { error, report })
            }
        }
    }

    async fn walk(&self, filter: &ListFilter, report: &mut SyncReport) -> Result<(), SyncError> {
        let deadline = Deadline::start(self.policy.max_runtime);
        let pages = self.pages(filter, &deadline);
        pin_mut!(pages);

        while let Some(page) = pages.next().await {
            let page = page?;
            report.pages += 1;
            debug!(page = page.number, orders = page.orders.len(), "processing page");
            for raw in &page.orders {
                deadline.check(SyncStage::Reconciliation)?;
                self.process_order(raw, report).await?;
            }
        }
        Ok(())
    }

    /// Fetch one order by remote ID and run it through the same path as a
    /// listed order, then trigger SKU translation.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` when the fetch or a write fails.
    #[instrument(skip(self), fields(retailer = %self.ctx.retailer))]
    pub async fn sync_single_order(&self, order_id: &str) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new(self.source.retailer(), None);

        let raw = with_throttle_retry(SyncStage::ItemFetch, self.policy.throttle_backoff, || {
            self.feed.get_order(order_id)
        })
        .await?;

        match raw {
            Some(raw) => self.process_order(&raw, &mut report).await?,
            None => warn!("remote does not know the order"),
        }
        self.translate_skus().await;
        Ok(report)
    }

    /// Fetch and write line items for stored orders that have none.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` when a fetch or a write fails, or the deadline
    /// passes.
    #[instrument(skip(self), fields(retailer = %self.ctx.retailer, whsl_site_id = %self.ctx.whsl_site_id))]
    pub async fn repair_orphan_line_items(&self) -> Result<RepairReport, SyncError> {
        let deadline = Deadline::start(self.policy.max_runtime);
        let orphans = self
            .store
            .orders_missing_line_items(self.ctx.whsl_site_id, self.ctx.retail_site_id)
            .await?;

        let mut report = RepairReport::default();
        for StoredOrder { id, record } in orphans {
            deadline.check(SyncStage::ItemFetch)?;
            report.orders_checked += 1;

            let raw_items = self.fetch_line_items(&record.key.order_id).await?;
            let refs: Vec<&Value> = raw_items.iter().collect();
            let lines = self.source.map_line_items(&refs, id);
            if lines.is_empty() {
                debug!(order_id = %record.key.order_id, "no order-affecting lines to attach");
                continue;
            }
            report.orders_repaired += 1;
            report.line_items_written += lines.len();
            self.store.replace_line_items(id, lines).await?;
        }

        info!(
            checked = report.orders_checked,
            repaired = report.orders_repaired,
            "orphan line-item repair finished"
        );
        Ok(report)
    }

    async fn process_order(&self, raw: &Value, report: &mut SyncReport) -> Result<(), SyncError> {
        report.observe(self.source.last_updated(raw));

        match self.source.classify(raw) {
            OrderEvent::Full => self.sync_full_order(raw, report).await,
            OrderEvent::CancellationOnly(patch) => {
                self.apply_cancellation(raw, patch, report).await
            }
            OrderEvent::Skip(reason) => {
                debug!(order_id = ?self.source.order_id(raw), reason, "skipping order");
                report.skipped += 1;
                Ok(())
            }
        }
    }

    async fn sync_full_order(&self, raw: &Value, report: &mut SyncReport) -> Result<(), SyncError> {
        let Some(record) = self.source.map_order(raw, self.ctx) else {
            debug!(order_id = ?self.source.order_id(raw), "order did not map");
            report.skipped += 1;
            return Ok(());
        };

        let stored = upsert_order(self.store, record).await?;
        report.orders_upserted += 1;

        let fetched;
        let raw_items: Vec<&Value> = match self.source.embedded_line_items(raw) {
            Some(items) => items,
            None => {
                fetched = self.fetch_line_items(&stored.record.key.order_id).await?;
                fetched.iter().collect()
            }
        };

        let lines = self.source.map_line_items(&raw_items, stored.id);
        let reconciled = self.source.reconcile_totals(raw, &lines);
        report.line_items_written += lines.len();

        self.store.replace_line_items(stored.id, lines).await?;
        self.store.replace_totals(stored.id, reconciled.totals).await?;
        self.store
            .replace_discounts(stored.id, reconciled.discounts)
            .await?;
        Ok(())
    }

    async fn apply_cancellation(
        &self,
        raw: &Value,
        patch: CancellationPatch,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let key = self.ctx.key(patch.order_id.clone());

        let Some(StoredOrder { mut record, .. }) = self.store.find_order(&key).await? else {
            if patch.mappable {
                debug!(order = %key, "cancelled order not stored yet, mapping it in full");
                return self.sync_full_order(raw, report).await;
            }
            return match self.policy.orphan_policy {
                OrphanPolicy::Abort => Err(SyncError::OrphanCancellation {
                    order_id: patch.order_id,
                }),
                OrphanPolicy::Record => {
                    warn!(order = %key, "cancellation for an order that was never stored");
                    report.unresolved_cancellations.push(patch.order_id);
                    Ok(())
                }
            };
        };

        record.status = self
            .ctx
            .statuses
            .canonical(CanonicalStatus::Cancelled)
            .or(record.status);
        record.date_last_updated = patch.date_last_updated;
        record.date_canceled = patch.date_canceled;
        self.store.save_order(record).await?;
        report.cancelled += 1;
        Ok(())
    }

    async fn fetch_line_items(&self, order_id: &str) -> Result<Vec<Value>, SyncError> {
        with_throttle_retry(SyncStage::ItemFetch, self.policy.throttle_backoff, || {
            self.feed.get_order_line_items(order_id)
        })
        .await
    }

    async fn translate_skus(&self) {
        if let Err(e) = self
            .translator
            .translate_skus(self.ctx.whsl_site_id, self.ctx.retail_site_id)
            .await
        {
            warn!(error = %e, "SKU translation failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_retry_succeeds_after_one_throttle() {
        let calls = AtomicUsize::new(0);
        let result = with_throttle_retry(SyncStage::Listing, Duration::ZERO, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, RemoteError>(if n == 0 {
                    Remote::Throttled
                } else {
                    Remote::Ready(n)
                })
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_throttle_is_exhausted() {
        let calls = AtomicUsize::new(0);
        let err = with_throttle_retry(SyncStage::ItemFetch, Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<Remote<()>, RemoteError>(Remote::Throttled) }
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            SyncError::ThrottledExhausted {
                stage: SyncStage::ItemFetch
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remote_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let err = with_throttle_retry(SyncStage::Listing, Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<Remote<()>, _>(RemoteError::Unavailable("503".into())) }
        })
        .await
        .unwrap_err();
        assert_eq!(err.stage(), SyncStage::Listing);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deadline() {
        let deadline = Deadline::start(Duration::from_secs(60));
        assert!(deadline.check(SyncStage::Listing).is_ok());

        let spent = Deadline {
            started: Instant::now() - Duration::from_secs(2),
            limit: Duration::from_secs(1),
        };
        assert!(matches!(
            spent.check(SyncStage::Reconciliation),
            Err(SyncError::DeadlineExceeded {
                stage: SyncStage::Reconciliation,
                ..
            })
        ));
    }

    #[test]
    fn test_report_high_water_only_advances() {
        let mut report = SyncReport::new(Retailer::Amazon, None);
        let early = retail_sync_core::types::datetime::from_canonical("2016-01-05 10:00:00").unwrap();
        let late = retail_sync_core::types::datetime::from_canonical("2016-01-06 10:00:00").unwrap();
        report.observe(Some(late));
        report.observe(Some(early));
        report.observe(None);
        assert_eq!(report.high_water, Some(late));
    }
}
