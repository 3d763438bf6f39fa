//! FedEx Track replies.

use chrono::{FixedOffset, NaiveDateTime};
use retail_sync_core::{Carrier, TrackingResult, TrackingStatus};
use serde_json::Value;
use tracing::debug;

use super::scan_time_utc;
use crate::extract;
use crate::ports::CarrierReply;

const SUCCESS: &str = "SUCCESS";
const ERROR: &str = "ERROR";

/// Normalize a FedEx reply.
///
/// `None` unless the reply as a whole succeeded and its notification is
/// either a success or a per-package error. Faults carry nothing usable.
/// An error without its own tracking number reports `tracking_number`.
#[must_use]
pub fn normalize(
    tracking_number: &str,
    reply: &CarrierReply,
    offset: FixedOffset,
    now: NaiveDateTime,
) -> Option<TrackingResult> {
    let CarrierReply::Response(tree) = reply else {
        debug!("fedex fault reply");
        return None;
    };

    let severity = extract::text(tree, "/HighestSeverity");
    if severity.as_deref() != Some(SUCCESS) {
        debug!(severity = ?severity, "fedex reply did not succeed");
        return None;
    }

    let completed = extract::get(tree, "/CompletedTrackDetails")?;
    let detail = if extract::text(completed, "/HighestSeverity").as_deref() == Some(SUCCESS) {
        extract::items(completed, "/TrackDetails").first().copied()?
    } else {
        completed
    };

    from_detail(tracking_number, detail, offset, now)
}

fn from_detail(
    tracking_number: &str,
    detail: &Value,
    offset: FixedOffset,
    now: NaiveDateTime,
) -> Option<TrackingResult> {
    match extract::text(detail, "/Notification/Severity").as_deref() {
        Some(SUCCESS) => Some(TrackingResult {
            service: Carrier::Fedex,
            id: extract::text(detail, "/TrackingNumber")?,
            status: TrackingStatus::Success,
            date: extract::timestamp(detail, "/ActualDeliveryTimestamp")
                .or_else(|| extract::timestamp(detail, "/StatusDetail/CreationTime"))
                .unwrap_or(now),
            message: extract::text(detail, "/StatusDetail/Description"),
            error_code: None,
            ship_date: extract::timestamp(detail, "/ShipTimestamp")
                .and_then(|shipped| scan_time_utc(shipped.date(), offset)),
        }),
        Some(ERROR) => Some(TrackingResult {
            service: Carrier::Fedex,
            id: extract::text(detail, "/TrackingNumber")
                .unwrap_or_else(|| tracking_number.to_string()),
            status: TrackingStatus::Error,
            date: now,
            message: extract::text(detail, "/Notification/Message"),
            error_code: extract::text(detail, "/Notification/Code"),
            ship_date: None,
        }),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use retail_sync_core::types::datetime::from_canonical;
    use serde_json::json;

    use super::*;

    fn now() -> NaiveDateTime {
        from_canonical("2016-02-01 12:00:00").unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_delivered_package() {
        let reply = CarrierReply::Response(json!({
            "HighestSeverity": "SUCCESS",
            "CompletedTrackDetails": {
                "HighestSeverity": "SUCCESS",
                "TrackDetails": {
                    "Notification": {"Severity": "SUCCESS", "Code": "0"},
                    "TrackingNumber": "123456789012",
                    "StatusDetail": {
                        "CreationTime": "2016-01-06T00:00:00",
                        "Code": "DL",
                        "Description": "Delivered"
                    },
                    "ShipTimestamp": "2016-01-04T00:00:00-05:00",
                    "ActualDeliveryTimestamp": "2016-01-07T10:31:00-05:00"
                }
            }
        }));
        let result = normalize("123456789012", &reply, utc(), now()).unwrap();
        assert_eq!(result.status, TrackingStatus::Success);
        assert_eq!(result.id, "123456789012");
        assert_eq!(result.date.to_string(), "2016-01-07 15:31:00");
        assert_eq!(result.message.as_deref(), Some("Delivered"));
        assert_eq!(
            result.ship_date.map(|d| d.to_string()).as_deref(),
            Some("2016-01-04 08:00:00")
        );
    }

    #[test]
    fn test_in_transit_falls_back_to_status_creation_time() {
        let reply = CarrierReply::Response(json!({
            "HighestSeverity": "SUCCESS",
            "CompletedTrackDetails": {
                "HighestSeverity": "SUCCESS",
                "TrackDetails": [{
                    "Notification": {"Severity": "SUCCESS"},
                    "TrackingNumber": "123456789012",
                    "StatusDetail": {"CreationTime": "2016-01-06T09:15:00", "Description": "In transit"}
                }]
            }
        }));
        let result = normalize("123456789012", &reply, utc(), now()).unwrap();
        assert_eq!(result.date.to_string(), "2016-01-06 09:15:00");
        assert_eq!(result.ship_date, None);
    }

    #[test]
    fn test_package_error_is_reported() {
        let reply = CarrierReply::Response(json!({
            "HighestSeverity": "SUCCESS",
            "CompletedTrackDetails": {
                "HighestSeverity": "ERROR",
                "Notification": {
                    "Severity": "ERROR",
                    "Code": "9040",
                    "Message": "This tracking number cannot be found."
                },
                "TrackingNumber": "000000000000"
            }
        }));
        let result = normalize("123456789012", &reply, utc(), now()).unwrap();
        assert_eq!(result.status, TrackingStatus::Error);
        assert_eq!(result.date, now());
        assert_eq!(result.error_code.as_deref(), Some("9040"));
        assert_eq!(
            result.message.as_deref(),
            Some("This tracking number cannot be found.")
        );
    }

    #[test]
    fn test_failed_reply_and_fault_yield_nothing() {
        let failed = CarrierReply::Response(json!({"HighestSeverity": "FAILURE"}));
        assert!(normalize("123456789012", &failed, utc(), now()).is_none());

        let fault = CarrierReply::Fault(json!({"faultstring": "Authentication Failed"}));
        assert!(normalize("123456789012", &fault, utc(), now()).is_none());
    }

    #[test]
    fn test_warning_notification_yields_nothing() {
        let reply = CarrierReply::Response(json!({
            "HighestSeverity": "SUCCESS",
            "CompletedTrackDetails": {
                "HighestSeverity": "SUCCESS",
                "TrackDetails": {"Notification": {"Severity": "WARNING"}, "TrackingNumber": "1"}
            }
        }));
        assert!(normalize("123456789012", &reply, utc(), now()).is_none());
    }

    #[test]
    fn test_package_error_without_number_uses_requested_one() {
        let reply = CarrierReply::Response(json!({
            "HighestSeverity": "SUCCESS",
            "CompletedTrackDetails": {
                "HighestSeverity": "ERROR",
                "Notification": {"Severity": "ERROR", "Code": "6035", "Message": "Invalid tracking numbers."}
            }
        }));
        let result = normalize("999999999999", &reply, utc(), now()).unwrap();
        assert_eq!(result.status, TrackingStatus::Error);
        assert_eq!(result.id, "999999999999");
        assert_eq!(result.error_code.as_deref(), Some("6035"));
    }
}
