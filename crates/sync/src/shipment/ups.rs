//! UPS Track replies.
//!
//! A response lists package activities latest first; one activity may arrive
//! as a single element rather than a list. Activity dates are calendar dates
//! in the shipper's local time.

use chrono::{FixedOffset, NaiveDateTime};
use retail_sync_core::{Carrier, TrackingResult, TrackingStatus};
use serde_json::Value;

use super::scan_time_utc;
use crate::extract;
use crate::ports::CarrierReply;

/// Activity status type of an origin scan.
const ORIGIN_SCAN: &str = "I";

/// Normalize a UPS reply. Faults become `Error` results.
#[must_use]
pub fn normalize(
    tracking_number: &str,
    reply: &CarrierReply,
    offset: FixedOffset,
    now: NaiveDateTime,
) -> TrackingResult {
    match reply {
        CarrierReply::Response(tree) => from_response(tracking_number, tree, offset, now),
        CarrierReply::Fault(tree) => from_fault(tracking_number, tree, now),
    }
}

fn from_response(
    tracking_number: &str,
    tree: &Value,
    offset: FixedOffset,
    now: NaiveDateTime,
) -> TrackingResult {
    let activities = extract::items(tree, "/TrackResponse/Shipment/Package")
        .first()
        .copied()
        .map(|package| extract::items(package, "/Activity"))
        .unwrap_or_default();
    let latest = activities.first().copied();

    let status = extract::text(tree, "/TrackResponse/Response/ResponseStatus/Description")
        .map_or(TrackingStatus::Error, TrackingStatus::from);

    TrackingResult {
        service: Carrier::Ups,
        id: extract::text(tree, "/TrackResponse/Shipment/InquiryNumber/Value")
            .unwrap_or_else(|| tracking_number.to_string()),
        status,
        date: latest
            .and_then(|activity| activity_time(activity, offset))
            .unwrap_or(now),
        message: latest.and_then(|activity| extract::text(activity, "/Status/Description")),
        error_code: None,
        ship_date: activities
            .iter()
            .rev()
            .find(|activity| {
                extract::text(activity, "/Status/Type").as_deref() == Some(ORIGIN_SCAN)
            })
            .and_then(|activity| activity_time(activity, offset)),
    }
}

fn activity_time(activity: &Value, offset: FixedOffset) -> Option<NaiveDateTime> {
    let date = extract::timestamp(activity, "/Date")?.date();
    scan_time_utc(date, offset)
}

fn from_fault(tracking_number: &str, tree: &Value, now: NaiveDateTime) -> TrackingResult {
    let primary = "/Errors/ErrorDetail/PrimaryErrorCode";
    TrackingResult {
        service: Carrier::Ups,
        id: tracking_number.to_string(),
        status: TrackingStatus::Error,
        date: now,
        message: extract::text(tree, &format!("{primary}/Description")),
        error_code: extract::text(tree, &format!("{primary}/Code")),
        ship_date: None,
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
            "TrackResponse": {
                "Response": {"ResponseStatus": {"Code": "1", "Description": "Success"}},
                "Shipment": {
                    "InquiryNumber": {"Value": "1Z12345E0205271688"},
                    "Package": {
                        "Activity": [
                            {"Status": {"Type": "D", "Description": "DELIVERED"}, "Date": "20160107"},
                            {"Status": {"Type": "I", "Description": "DEPARTURE SCAN"}, "Date": "20160106"},
                            {"Status": {"Type": "I", "Description": "ORIGIN SCAN"}, "Date": "20160105"},
                            {"Status": {"Type": "M", "Description": "BILLING INFORMATION RECEIVED"}, "Date": "20160104"}
                        ]
                    }
                }
            }
        }));
        let result = normalize("1Z12345E0205271688", &reply, utc(), now());
        assert_eq!(result.status, TrackingStatus::Success);
        assert_eq!(result.id, "1Z12345E0205271688");
        assert_eq!(result.date.to_string(), "2016-01-07 08:00:00");
        assert_eq!(result.message.as_deref(), Some("DELIVERED"));
        assert_eq!(result.error_code, None);
        assert_eq!(
            result.ship_date.map(|d| d.to_string()).as_deref(),
            Some("2016-01-05 08:00:00")
        );
    }

    #[test]
    fn test_single_activity_without_origin_scan() {
        let reply = CarrierReply::Response(json!({
            "TrackResponse": {
                "Response": {"ResponseStatus": {"Description": "Success"}},
                "Shipment": {
                    "Package": {
                        "Activity": {"Status": {"Type": "M", "Description": "ORDER PROCESSED"}, "Date": "20160104"}
                    }
                }
            }
        }));
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let result = normalize("1ZREQUESTED", &reply, eastern, now());
        assert_eq!(result.id, "1ZREQUESTED");
        assert_eq!(result.date.to_string(), "2016-01-04 13:00:00");
        assert_eq!(result.ship_date, None);
    }

    #[test]
    fn test_fault_is_error() {
        let reply = CarrierReply::Fault(json!({
            "Errors": {"ErrorDetail": {"Severity": "Hard", "PrimaryErrorCode": {
                "Code": "151018", "Description": "Invalid tracking number"
            }}}
        }));
        let result = normalize("1ZBAD", &reply, utc(), now());
        assert_eq!(result.status, TrackingStatus::Error);
        assert_eq!(result.id, "1ZBAD");
        assert_eq!(result.date, now());
        assert_eq!(result.error_code.as_deref(), Some("151018"));
        assert_eq!(result.message.as_deref(), Some("Invalid tracking number"));
    }
}
