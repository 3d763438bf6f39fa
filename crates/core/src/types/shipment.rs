//! Normalized carrier tracking result.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::status::Carrier;

/// Outcome of one tracking poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TrackingStatus {
    /// Tracking data consumed (delivered or in transit).
    Success,
    /// Carrier rejected the inquiry; retried on the next scheduled poll.
    Error,
    /// Any other response status the carrier reported verbatim.
    Carrier(String),
}

impl TrackingStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "Success",
            Self::Error => "Error",
            Self::Carrier(code) => code,
        }
    }

    /// Whether the poll produced usable tracking data.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<TrackingStatus> for String {
    fn from(status: TrackingStatus) -> Self {
        status.as_str().to_string()
    }
}

impl From<String> for TrackingStatus {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("success") {
            Self::Success
        } else if value.eq_ignore_ascii_case("error") {
            Self::Error
        } else {
            Self::Carrier(value)
        }
    }
}

/// Canonical shape both carrier adapters produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingResult {
    pub service: Carrier,
    /// Tracking number.
    pub id: String,
    pub status: TrackingStatus,
    /// Date of the latest event (or of the poll, for errors).
    #[serde(with = "super::datetime::required")]
    pub date: NaiveDateTime,
    pub message: Option<String>,
    /// `None` on success.
    pub error_code: Option<String>,
    /// From the earliest origin scan, when one exists yet.
    #[serde(with = "super::datetime::option", default)]
    pub ship_date: Option<NaiveDateTime>,
}
