//! Per-invocation sync context.

use std::collections::HashMap;

use retail_sync_core::{CanonicalStatus, NaturalKey, Retailer, RetailSiteId, StatusId, WhslSiteId};
use serde::Deserialize;

use crate::config::{AmazonCredentials, ShopifyCredentials};

/// Order status names mapped to local status IDs.
///
/// Lookups are exact on the name. Anything the vocabulary lacks resolves to
/// `Processing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct StatusVocabulary {
    by_name: HashMap<String, StatusId>,
}

impl StatusVocabulary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one entry.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, id: StatusId) -> Self {
        self.by_name.insert(name.into(), id);
        self
    }

    /// Exact lookup.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<StatusId> {
        self.by_name.get(name).copied()
    }

    /// Lookup with the `Processing` fallback.
    #[must_use]
    pub fn resolve_or_processing(&self, name: &str) -> Option<StatusId> {
        self.resolve(name)
            .or_else(|| self.canonical(CanonicalStatus::Processing))
    }

    #[must_use]
    pub fn canonical(&self, status: CanonicalStatus) -> Option<StatusId> {
        self.resolve(status.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl FromIterator<(String, StatusId)> for StatusVocabulary {
    fn from_iter<T: IntoIterator<Item = (String, StatusId)>>(iter: T) -> Self {
        Self {
            by_name: iter.into_iter().collect(),
        }
    }
}

/// Remote credentials the context carries for its retailer.
#[derive(Debug, Clone)]
pub enum Credentials {
    Amazon(AmazonCredentials),
    Shopify(ShopifyCredentials),
    /// Replays and tests run without credentials.
    None,
}

/// Site identity, credentials and status vocabulary for one invocation.
///
/// Built once and passed by reference to every mapper and walker call.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub retailer: Retailer,
    pub whsl_site_id: WhslSiteId,
    pub retail_site_id: RetailSiteId,
    pub credentials: Credentials,
    pub statuses: StatusVocabulary,
}

impl SyncContext {
    #[must_use]
    pub const fn new(
        retailer: Retailer,
        whsl_site_id: WhslSiteId,
        retail_site_id: RetailSiteId,
        statuses: StatusVocabulary,
    ) -> Self {
        Self {
            retailer,
            whsl_site_id,
            retail_site_id,
            credentials: Credentials::None,
            statuses,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Natural key of a remote order within this context's sites.
    #[must_use]
    pub fn key(&self, order_id: impl Into<String>) -> NaturalKey {
        NaturalKey::new(order_id, self.whsl_site_id, self.retail_site_id)
    }
}
