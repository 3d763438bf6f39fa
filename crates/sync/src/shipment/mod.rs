//! Shipment status reconciliation.
//!
//! Each tracking number is polled through a [`CarrierClient`] and the reply is
//! normalized into a [`TrackingResult`] by the carrier's adapter:
//!
//! - [`ups`] - activity-list replies and SOAP faults
//! - [`fedex`] - severity-tagged track details
//!
//! Polls are independent, so they run over a bounded worker pool with no
//! ordering between tracking numbers. `Error` results are retried by the
//! caller on its next scheduled poll.
//!
//! Reply trees are expected with XML namespace prefixes already stripped.

pub mod fedex;
pub mod ups;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use futures::{StreamExt, stream};
use retail_sync_core::{Carrier, TrackingResult, TrackingStatus};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::RemoteError;
use crate::ports::{CarrierClient, CarrierReply};

/// Local hour carrier scan dates are pinned to.
const SCAN_HOUR: u32 = 8;

/// Normalize one carrier reply.
///
/// `None` when the reply carries nothing usable for this tracking number.
#[must_use]
pub fn normalize_reply(
    carrier: Carrier,
    tracking_number: &str,
    reply: &CarrierReply,
    offset: FixedOffset,
    now: NaiveDateTime,
) -> Option<TrackingResult> {
    match carrier {
        Carrier::Ups => Some(ups::normalize(tracking_number, reply, offset, now)),
        Carrier::Fedex => fedex::normalize(tracking_number, reply, offset, now),
    }
}

/// A carrier-local calendar date at the scan hour, expressed in UTC.
pub(crate) fn scan_time_utc(date: NaiveDate, offset: FixedOffset) -> Option<NaiveDateTime> {
    let local = date.and_hms_opt(SCAN_HOUR, 0, 0)?;
    offset
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.naive_utc())
}

fn now_utc() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Results of one reconciliation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShipmentReport {
    /// Tracking data consumed.
    pub succeeded: Vec<TrackingResult>,
    /// Carrier rejected the inquiry; retry on the next poll.
    pub failed: Vec<TrackingResult>,
    /// Tracking numbers with no usable reply (transport failure or empty).
    pub unavailable: Vec<String>,
}

/// Polls a carrier for a batch of tracking numbers.
pub struct ShipmentReconciler<'a, C> {
    client: &'a C,
    offset: FixedOffset,
    concurrency: usize,
}

impl<'a, C: CarrierClient> ShipmentReconciler<'a, C> {
    #[must_use]
    pub fn new(client: &'a C, offset: FixedOffset, concurrency: usize) -> Self {
        Self {
            client,
            offset,
            concurrency: concurrency.max(1),
        }
    }

    /// Poll every tracking number, at most `concurrency` at a time.
    #[instrument(skip_all, fields(carrier = %self.client.carrier(), count = tracking_numbers.len()))]
    pub async fn reconcile(&self, tracking_numbers: Vec<String>) -> ShipmentReport {
        let polled: Vec<(String, Result<Option<TrackingResult>, RemoteError>)> =
            stream::iter(tracking_numbers)
                .map(|number| async move {
                    let result = self.track_one(&number).await;
                    (number, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut report = ShipmentReport::default();
        for (number, result) in polled {
            match result {
                Ok(Some(tracking)) if tracking.status == TrackingStatus::Error => {
                    debug!(tracking_number = %number, code = ?tracking.error_code, "carrier rejected inquiry");
                    report.failed.push(tracking);
                }
                Ok(Some(tracking)) => report.succeeded.push(tracking),
                Ok(None) => {
                    debug!(tracking_number = %number, "no usable tracking reply");
                    report.unavailable.push(number);
                }
                Err(e) => {
                    warn!(tracking_number = %number, error = %e, "tracking call failed");
                    report.unavailable.push(number);
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            unavailable = report.unavailable.len(),
            "shipment reconciliation finished"
        );
        report
    }

    async fn track_one(&self, tracking_number: &str) -> Result<Option<TrackingResult>, RemoteError> {
        let reply = self.client.track(tracking_number).await?;
        Ok(normalize_reply(
            self.client.carrier(),
            tracking_number,
            &reply,
            self.offset,
            now_utc(),
        ))
    }
}
