//! Error types for the sync engine.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Failure reported by a remote collaborator (marketplace or carrier API).
///
/// Throttling is not an error: feeds report it as
/// [`Remote::Throttled`](crate::ports::Remote::Throttled) so the walker can
/// apply its single retry.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport failed or the service was down.
    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    /// Response could not be read as a payload tree.
    #[error("Malformed remote response: {0}")]
    Malformed(String),

    /// Service answered with an application-level error.
    #[error("Remote rejected request ({code}): {message}")]
    Rejected { code: String, message: String },
}

/// Failure reported by the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Row that should exist was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Natural-key or concurrency conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Part of a run that aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    /// Fetching order pages.
    Listing,
    /// Fetching line items or single orders.
    ItemFetch,
    /// Mapping and reconciling a fetched order.
    Reconciliation,
    /// Writing canonical records.
    Persistence,
}

impl SyncStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::ItemFetch => "item-fetch",
            Self::Reconciliation => "reconciliation",
            Self::Persistence => "persistence",
        }
    }
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run-level failure. Orders committed before the failure stay committed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Remote was still throttling after the single retry.
    #[error("{stage}: still throttled after retry")]
    ThrottledExhausted { stage: SyncStage },

    /// A page reached through a continuation token held no orders.
    #[error("listing: page {page} returned no orders")]
    EmptyPage { page: u32 },

    /// Cancellation event for an order that was never stored.
    #[error("reconciliation: cancellation for unknown order {order_id}")]
    OrphanCancellation { order_id: String },

    /// Run hit its maximum runtime.
    #[error("{stage}: run exceeded its {limit:?} deadline")]
    DeadlineExceeded { stage: SyncStage, limit: Duration },

    /// Remote collaborator failed.
    #[error("{stage}: {source}")]
    Remote {
        stage: SyncStage,
        #[source]
        source: RemoteError,
    },

    /// Persistence collaborator failed.
    #[error("persistence: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Stage to report to the operator.
    #[must_use]
    pub const fn stage(&self) -> SyncStage {
        match self {
            Self::ThrottledExhausted { stage }
            | Self::DeadlineExceeded { stage, .. }
            | Self::Remote { stage, .. } => *stage,
            Self::EmptyPage { .. } => SyncStage::Listing,
            Self::OrphanCancellation { .. } => SyncStage::Reconciliation,
            Self::Store(_) => SyncStage::Persistence,
        }
    }

    pub(crate) const fn remote(stage: SyncStage, source: RemoteError) -> Self {
        Self::Remote { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_reporting() {
        assert_eq!(
            SyncError::EmptyPage { page: 3 }.stage(),
            SyncStage::Listing
        );
        assert_eq!(
            SyncError::ThrottledExhausted {
                stage: SyncStage::ItemFetch
            }
            .stage(),
            SyncStage::ItemFetch
        );
        assert_eq!(
            SyncError::from(StoreError::Backend("down".into())).stage(),
            SyncStage::Persistence
        );
    }

    #[test]
    fn test_error_display_names_stage() {
        let err = SyncError::remote(
            SyncStage::ItemFetch,
            RemoteError::Rejected {
                code: "InvalidParameterValue".into(),
                message: "bad order id".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "item-fetch: Remote rejected request (InvalidParameterValue): bad order id"
        );
        assert_eq!(
            SyncError::OrphanCancellation {
                order_id: "112-1".into()
            }
            .to_string(),
            "reconciliation: cancellation for unknown order 112-1"
        );
    }
}
