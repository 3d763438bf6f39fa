//! In-process order store.
//!
//! Holds the canonical record set in ordered maps behind one lock. Used by
//! the CLI replay mode and by tests; a database-backed store implements the
//! same [`OrderStore`] contract.

use std::collections::BTreeMap;

use retail_sync_core::{
    DiscountSet, LineItemRecord, NaturalKey, OrderRecord, RetailOrderId, RetailSiteId,
    StoredOrder, TotalsRecord, WhslSiteId,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::ports::{OrderStore, SkuTranslator};

#[derive(Debug, Default)]
struct Tables {
    next_id: i32,
    ids: BTreeMap<NaturalKey, RetailOrderId>,
    orders: BTreeMap<RetailOrderId, OrderRecord>,
    line_items: BTreeMap<RetailOrderId, Vec<LineItemRecord>>,
    totals: BTreeMap<RetailOrderId, TotalsRecord>,
    discounts: BTreeMap<RetailOrderId, DiscountSet>,
    translations: Vec<(WhslSiteId, RetailSiteId)>,
}

/// Order store kept in memory.
///
/// Row IDs are assigned from 1 in insertion order and stay stable for a
/// natural key. Also records SKU translation requests.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    tables: RwLock<Tables>,
}

impl InMemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored order, by row ID.
    pub async fn orders(&self) -> Vec<StoredOrder> {
        self.tables
            .read()
            .await
            .orders
            .iter()
            .map(|(id, record)| StoredOrder {
                id: *id,
                record: record.clone(),
            })
            .collect()
    }

    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    pub async fn line_items(&self, order: RetailOrderId) -> Vec<LineItemRecord> {
        self.tables
            .read()
            .await
            .line_items
            .get(&order)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn totals(&self, order: RetailOrderId) -> Option<TotalsRecord> {
        self.tables.read().await.totals.get(&order).cloned()
    }

    pub async fn discounts(&self, order: RetailOrderId) -> Option<DiscountSet> {
        self.tables.read().await.discounts.get(&order).cloned()
    }

    /// Site pairs SKU translation was requested for, in call order.
    pub async fn translations(&self) -> Vec<(WhslSiteId, RetailSiteId)> {
        self.tables.read().await.translations.clone()
    }

    async fn ensure_order(&self, order: RetailOrderId) -> Result<(), StoreError> {
        if self.tables.read().await.orders.contains_key(&order) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("retail order {order}")))
        }
    }
}

impl OrderStore for InMemoryOrderStore {
    async fn find_order(&self, key: &NaturalKey) -> Result<Option<StoredOrder>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.ids.get(key).and_then(|id| {
            tables.orders.get(id).map(|record| StoredOrder {
                id: *id,
                record: record.clone(),
            })
        }))
    }

    async fn save_order(&self, record: OrderRecord) -> Result<RetailOrderId, StoreError> {
        let mut tables = self.tables.write().await;
        let id = if let Some(id) = tables.ids.get(&record.key) {
            *id
        } else {
            tables.next_id += 1;
            let id = RetailOrderId::new(tables.next_id);
            tables.ids.insert(record.key.clone(), id);
            debug!(order = %record.key, %id, "inserted order");
            id
        };
        tables.orders.insert(id, record);
        Ok(id)
    }

    async fn replace_line_items(
        &self,
        order: RetailOrderId,
        items: Vec<LineItemRecord>,
    ) -> Result<(), StoreError> {
        self.ensure_order(order).await?;
        if let Some(stray) = items.iter().find(|item| item.retail_order_id != order) {
            return Err(StoreError::Conflict(format!(
                "line item for order {} written under order {order}",
                stray.retail_order_id
            )));
        }
        self.tables.write().await.line_items.insert(order, items);
        Ok(())
    }

    async fn replace_totals(
        &self,
        order: RetailOrderId,
        totals: TotalsRecord,
    ) -> Result<(), StoreError> {
        self.ensure_order(order).await?;
        self.tables.write().await.totals.insert(order, totals);
        Ok(())
    }

    async fn replace_discounts(
        &self,
        order: RetailOrderId,
        discounts: DiscountSet,
    ) -> Result<(), StoreError> {
        self.ensure_order(order).await?;
        self.tables.write().await.discounts.insert(order, discounts);
        Ok(())
    }

    async fn orders_missing_line_items(
        &self,
        whsl_site_id: WhslSiteId,
        retail_site_id: RetailSiteId,
    ) -> Result<Vec<StoredOrder>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .filter(|(_, record)| {
                record.key.whsl_site_id == whsl_site_id
                    && record.key.retail_site_id == retail_site_id
            })
            .filter(|(id, _)| tables.line_items.get(*id).is_none_or(Vec::is_empty))
            .map(|(id, record)| StoredOrder {
                id: *id,
                record: record.clone(),
            })
            .collect())
    }
}

impl SkuTranslator for InMemoryOrderStore {
    async fn translate_skus(
        &self,
        whsl_site_id: WhslSiteId,
        retail_site_id: RetailSiteId,
    ) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .translations
            .push((whsl_site_id, retail_site_id));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn key(order_id: &str) -> NaturalKey {
        NaturalKey::new(order_id, WhslSiteId::new(1), RetailSiteId::new(2))
    }

    fn line(order: RetailOrderId) -> LineItemRecord {
        LineItemRecord {
            retail_order_id: order,
            external_line_id: Some("L1".into()),
            product_external_id: None,
            sku: Some("SKU-1".into()),
            name: None,
            quantity: 1,
            unit_price: Decimal::ONE,
            final_price: Decimal::ONE,
            other_charges: None,
        }
    }

    #[tokio::test]
    async fn test_save_keeps_id_per_natural_key() {
        let store = InMemoryOrderStore::new();
        let first = store.save_order(OrderRecord::new(key("A"))).await.unwrap();
        let other = store.save_order(OrderRecord::new(key("B"))).await.unwrap();
        let again = store.save_order(OrderRecord::new(key("A"))).await.unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(store.order_count().await, 2);
        assert_eq!(
            store.find_order(&key("A")).await.unwrap().unwrap().id,
            first
        );
        assert!(store.find_order(&key("C")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_requires_stored_order() {
        let store = InMemoryOrderStore::new();
        let err = store
            .replace_totals(RetailOrderId::new(9), TotalsRecord::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_replace_rejects_foreign_line_items() {
        let store = InMemoryOrderStore::new();
        let id = store.save_order(OrderRecord::new(key("A"))).await.unwrap();
        let err = store
            .replace_line_items(id, vec![line(RetailOrderId::new(99))])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_orders_missing_line_items() {
        let store = InMemoryOrderStore::new();
        let with_lines = store.save_order(OrderRecord::new(key("A"))).await.unwrap();
        let without = store.save_order(OrderRecord::new(key("B"))).await.unwrap();
        store
            .save_order(OrderRecord::new(NaturalKey::new(
                "C",
                WhslSiteId::new(1),
                RetailSiteId::new(3),
            )))
            .await
            .unwrap();
        store
            .replace_line_items(with_lines, vec![line(with_lines)])
            .await
            .unwrap();

        let orphans = store
            .orders_missing_line_items(WhslSiteId::new(1), RetailSiteId::new(2))
            .await
            .unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans.first().unwrap().id, without);
    }
}
