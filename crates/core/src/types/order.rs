//! Canonical order record.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::id::{RetailOrderId, RetailSiteId, StatusId, WhslSiteId};

/// Natural key identifying one canonical order across repeated syncs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    /// Remote order ID (Amazon order ID, Shopify numeric ID).
    pub order_id: String,
    /// Owning site.
    pub whsl_site_id: WhslSiteId,
    /// Remote source site.
    pub retail_site_id: RetailSiteId,
}

impl NaturalKey {
    /// Create a natural key.
    #[must_use]
    pub fn new(
        order_id: impl Into<String>,
        whsl_site_id: WhslSiteId,
        retail_site_id: RetailSiteId,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            whsl_site_id,
            retail_site_id,
        }
    }
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}/{}",
            self.order_id, self.whsl_site_id, self.retail_site_id
        )
    }
}

/// Postal address block, upper-cased on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: Option<String>,
    pub company: Option<String>,
    pub street1: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    /// State, province, or region.
    pub state: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// Whether every field of the block is absent.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.company.is_none()
            && self.street1.is_none()
            && self.street2.is_none()
            && self.city.is_none()
            && self.postcode.is_none()
            && self.state.is_none()
            && self.country.is_none()
    }
}

/// A remote order normalized into the local schema.
///
/// Every optional field is `None` when the remote payload did not carry a
/// usable value. Mappers never invent placeholder values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(flatten)]
    pub key: NaturalKey,
    /// Human-facing order number (Shopify `name`, e.g. `#1001`).
    pub alt_order_id: Option<String>,
    /// Resolved against the status vocabulary; `None` only when the
    /// vocabulary lacks even the default status.
    pub status: Option<StatusId>,
    #[serde(with = "super::datetime::option")]
    pub date_purchased: Option<NaiveDateTime>,
    #[serde(with = "super::datetime::option")]
    pub date_last_updated: Option<NaiveDateTime>,
    /// Monotonic floor: once stored it only ever moves earlier.
    #[serde(with = "super::datetime::option")]
    pub date_shipped: Option<NaiveDateTime>,
    #[serde(with = "super::datetime::option")]
    pub date_canceled: Option<NaiveDateTime>,
    pub delivery: Address,
    pub billing: Address,
    pub customer_id: Option<String>,
    pub telephone: Option<String>,
    /// Lower-cased.
    pub email: Option<String>,
    pub payment_method: Option<String>,
    pub cc_type: Option<String>,
    /// Mask literal followed by the last four characters of the card number.
    pub cc_number: Option<String>,
    /// Multi-value marketing attribution, joined with `::`.
    pub heard_about: Option<String>,
}

impl OrderRecord {
    /// Create an empty record for a natural key.
    #[must_use]
    pub fn new(key: NaturalKey) -> Self {
        Self {
            key,
            alt_order_id: None,
            status: None,
            date_purchased: None,
            date_last_updated: None,
            date_shipped: None,
            date_canceled: None,
            delivery: Address::default(),
            billing: Address::default(),
            customer_id: None,
            telephone: None,
            email: None,
            payment_method: None,
            cc_type: None,
            cc_number: None,
            heard_about: None,
        }
    }
}

/// An order as held by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOrder {
    pub id: RetailOrderId,
    #[serde(flatten)]
    pub record: OrderRecord,
}
