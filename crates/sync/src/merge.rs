//! Upsert merge policy.
//!
//! Every mapped field overwrites the stored one, absent values included,
//! except `date_shipped`: it is a monotonic floor that is filled in when
//! unknown and only ever moves earlier.

use chrono::NaiveDateTime;
use retail_sync_core::{OrderRecord, RetailOrderId, StoredOrder};
use tracing::instrument;

use crate::error::StoreError;
use crate::ports::OrderStore;

/// Merge a freshly mapped record onto the stored one, if any.
#[must_use]
pub fn merge_order(existing: Option<&OrderRecord>, incoming: OrderRecord) -> OrderRecord {
    let Some(existing) = existing else {
        return incoming;
    };
    OrderRecord {
        date_shipped: earliest_ship_date(existing.date_shipped, incoming.date_shipped),
        ..incoming
    }
}

fn earliest_ship_date(
    stored: Option<NaiveDateTime>,
    incoming: Option<NaiveDateTime>,
) -> Option<NaiveDateTime> {
    match (stored, incoming) {
        (Some(stored), Some(incoming)) => Some(stored.min(incoming)),
        (stored, incoming) => stored.or(incoming),
    }
}

/// Find by natural key, merge, save.
///
/// # Errors
///
/// Returns `StoreError` if the lookup or the write fails.
#[instrument(skip(store, record), fields(order = %record.key))]
pub async fn upsert_order<S: OrderStore>(
    store: &S,
    record: OrderRecord,
) -> Result<StoredOrder, StoreError> {
    let existing = store.find_order(&record.key).await?;
    let merged = merge_order(existing.as_ref().map(|s| &s.record), record);
    let id: RetailOrderId = store.save_order(merged.clone()).await?;
    Ok(StoredOrder { id, record: merged })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use retail_sync_core::{NaturalKey, RetailSiteId, WhslSiteId, datetime};

    use super::*;

    fn record(shipped: Option<&str>) -> OrderRecord {
        let mut r = OrderRecord::new(NaturalKey::new("A-1", WhslSiteId::new(1), RetailSiteId::new(1)));
        r.date_shipped = shipped.map(|s| datetime::from_canonical(s).unwrap());
        r
    }

    #[test]
    fn test_new_order_passes_through() {
        let incoming = record(Some("2016-01-05 10:00:00"));
        assert_eq!(merge_order(None, incoming.clone()), incoming);
    }

    #[test]
    fn test_later_ship_date_is_ignored() {
        let existing = record(Some("2016-01-05 10:00:00"));
        let merged = merge_order(Some(&existing), record(Some("2016-01-07 08:00:00")));
        assert_eq!(merged.date_shipped, existing.date_shipped);
    }

    #[test]
    fn test_earlier_ship_date_wins() {
        let existing = record(Some("2016-01-05 10:00:00"));
        let incoming = record(Some("2016-01-04 08:00:00"));
        let merged = merge_order(Some(&existing), incoming.clone());
        assert_eq!(merged.date_shipped, incoming.date_shipped);
    }

    #[test]
    fn test_ship_date_filled_when_unknown_and_never_cleared() {
        let merged = merge_order(Some(&record(None)), record(Some("2016-01-05 10:00:00")));
        assert!(merged.date_shipped.is_some());

        let merged = merge_order(Some(&record(Some("2016-01-05 10:00:00"))), record(None));
        assert!(merged.date_shipped.is_some());
    }

    #[test]
    fn test_other_fields_overwrite_even_with_none() {
        let mut existing = record(None);
        existing.email = Some("old@example.com".into());
        existing.alt_order_id = Some("#1".into());
        let mut incoming = record(None);
        incoming.email = Some("new@example.com".into());

        let merged = merge_order(Some(&existing), incoming);
        assert_eq!(merged.email.as_deref(), Some("new@example.com"));
        assert_eq!(merged.alt_order_id, None);
    }
}
