//! Collaborator capabilities the engine depends on.
//!
//! Transport (marketplace and carrier APIs) and persistence live outside
//! this crate. Implementations return payload trees and canonical records;
//! the engine never sees HTTP, SOAP or SQL.

use std::future::Future;

use chrono::NaiveDateTime;
use retail_sync_core::{
    Carrier, DiscountSet, LineItemRecord, NaturalKey, OrderRecord, RetailOrderId, RetailSiteId,
    StoredOrder, TotalsRecord, WhslSiteId,
};
use serde_json::Value;

use crate::error::{RemoteError, StoreError};

/// Response of a remote call that may be rate limited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remote<T> {
    Ready(T),
    /// The service signalled throttling (`RequestThrottled`, HTTP 429).
    Throttled,
}

/// Position in a paged listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageCursor {
    /// Continuation token (Amazon `NextToken`).
    Token(String),
    /// One-based page number (Shopify `page=`).
    Page(u32),
}

/// One page of raw orders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPage {
    pub orders: Vec<Value>,
    /// `None` on the last page.
    pub next: Option<PageCursor>,
}

/// Which orders a listing walk covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    CreatedAfter(NaiveDateTime),
    UpdatedAfter(NaiveDateTime),
    /// Currently open orders, one page.
    Open,
}

impl ListFilter {
    /// Date the walk resumes from.
    #[must_use]
    pub const fn watermark(&self) -> Option<NaiveDateTime> {
        match self {
            Self::CreatedAfter(at) | Self::UpdatedAfter(at) => Some(*at),
            Self::Open => None,
        }
    }
}

/// Remote order listing.
pub trait OrderFeed: Send + Sync {
    /// Fetch one page. `cursor` is `None` for the first page.
    fn list_orders(
        &self,
        filter: &ListFilter,
        cursor: Option<&PageCursor>,
    ) -> impl Future<Output = Result<Remote<OrderPage>, RemoteError>> + Send;

    /// Fetch one order. `None` when the remote does not know it.
    fn get_order(
        &self,
        order_id: &str,
    ) -> impl Future<Output = Result<Remote<Option<Value>>, RemoteError>> + Send;

    fn get_order_line_items(
        &self,
        order_id: &str,
    ) -> impl Future<Output = Result<Remote<Vec<Value>>, RemoteError>> + Send;
}

/// Persistence of canonical records.
///
/// Implementations must serialize writes per natural key.
pub trait OrderStore: Send + Sync {
    fn find_order(
        &self,
        key: &NaturalKey,
    ) -> impl Future<Output = Result<Option<StoredOrder>, StoreError>> + Send;

    /// Insert or replace the row for the record's natural key.
    fn save_order(
        &self,
        record: OrderRecord,
    ) -> impl Future<Output = Result<RetailOrderId, StoreError>> + Send;

    /// Replace the whole line-item set of an order.
    fn replace_line_items(
        &self,
        order: RetailOrderId,
        items: Vec<LineItemRecord>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn replace_totals(
        &self,
        order: RetailOrderId,
        totals: TotalsRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn replace_discounts(
        &self,
        order: RetailOrderId,
        discounts: DiscountSet,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stored orders of a site pair that have no line items.
    fn orders_missing_line_items(
        &self,
        whsl_site_id: WhslSiteId,
        retail_site_id: RetailSiteId,
    ) -> impl Future<Output = Result<Vec<StoredOrder>, StoreError>> + Send;
}

/// Post-sync pass mapping vendor SKUs to canonical products.
pub trait SkuTranslator: Send + Sync {
    fn translate_skus(
        &self,
        whsl_site_id: WhslSiteId,
        retail_site_id: RetailSiteId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Reply of a carrier tracking call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarrierReply {
    /// Tracking response body.
    Response(Value),
    /// Fault raised by the carrier (invalid or unknown inquiry number).
    Fault(Value),
}

/// Carrier tracking API.
pub trait CarrierClient: Send + Sync {
    fn carrier(&self) -> Carrier;

    fn track(
        &self,
        tracking_number: &str,
    ) -> impl Future<Output = Result<CarrierReply, RemoteError>> + Send;
}
