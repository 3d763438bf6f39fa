//! Status enums for retailers, orders, and carriers.

use serde::{Deserialize, Serialize};

/// Remote order source a site can sync with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retailer {
    /// Amazon Marketplace Web Service orders.
    Amazon,
    /// Shopify Admin API orders.
    Shopify,
}

impl Retailer {
    /// All retailers with sync logic, in display order.
    pub const ALL: [Self; 2] = [Self::Shopify, Self::Amazon];

    /// Name of the retail site row this retailer's orders belong to.
    #[must_use]
    pub const fn site_name(self) -> &'static str {
        match self {
            Self::Amazon => "Amazon",
            Self::Shopify => "Shopify",
        }
    }
}

impl std::fmt::Display for Retailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.site_name())
    }
}

impl std::str::FromStr for Retailer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "amazon" => Ok(Self::Amazon),
            "shopify" => Ok(Self::Shopify),
            _ => Err(format!("invalid retailer: {s}")),
        }
    }
}

/// Order status names the sync engine resolves by itself.
///
/// Everything else in the status vocabulary comes straight from the remote
/// payload (Amazon sends names like `Unshipped` or `PartiallyShipped`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalStatus {
    /// Default for any status the vocabulary does not know.
    Processing,
    Shipped,
    Cancelled,
}

impl CanonicalStatus {
    /// Name used for the vocabulary lookup.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipping carrier a tracking number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Carrier {
    Ups,
    Fedex,
}

impl Carrier {
    /// Service tag stored with each shipment status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ups => "UPS",
            Self::Fedex => "FEDEX",
        }
    }
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Carrier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UPS" => Ok(Self::Ups),
            "FEDEX" => Ok(Self::Fedex),
            _ => Err(format!("invalid carrier: {s}")),
        }
    }
}
