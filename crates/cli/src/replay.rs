//! File-backed collaborators for replaying captured payloads.
//!
//! # Order capture layout
//!
//! ```text
//! <dir>/page-1.json          {"orders": [...], "next_token": "page-2"}
//! <dir>/page-2.json          {"orders": [...]}
//! <dir>/items/<order>.json   [ ...line items... ]
//! <dir>/orders/<order>.json  { ...one order... }
//! ```
//!
//! A page with a `next_token` continues at the file named by the token.
//! Otherwise a numbered page continues at the next number while that file
//! exists. A page file may also be a bare array of orders.
//!
//! # Carrier capture layout
//!
//! One JSON object keyed by tracking number, each value either
//! `{"response": {...}}` or `{"fault": {...}}`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use retail_sync::RemoteError;
use retail_sync::ports::{
    CarrierClient, CarrierReply, ListFilter, OrderFeed, OrderPage, PageCursor, Remote,
};
use retail_sync_core::Carrier;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::CliError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PageFile {
    Paged {
        orders: Vec<Value>,
        #[serde(default)]
        next_token: Option<String>,
    },
    Bare(Vec<Value>),
}

/// Order feed reading a capture directory.
#[derive(Debug, Clone)]
pub struct ReplayFeed {
    dir: PathBuf,
}

impl ReplayFeed {
    /// # Errors
    ///
    /// Returns `CliError::Io` when `dir` is not a readable directory.
    pub fn open(dir: &Path) -> Result<Self, CliError> {
        if !dir.is_dir() {
            return Err(CliError::Io {
                path: dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn page_path(&self, number: u32) -> PathBuf {
        self.dir.join(format!("page-{number}.json"))
    }

    async fn read_json(path: &Path) -> Result<Option<Value>, RemoteError> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RemoteError::Unavailable(format!("{}: {e}", path.display()))),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| RemoteError::Malformed(format!("{}: {e}", path.display())))
    }
}

impl OrderFeed for ReplayFeed {
    async fn list_orders(
        &self,
        filter: &ListFilter,
        cursor: Option<&PageCursor>,
    ) -> Result<Remote<OrderPage>, RemoteError> {
        let (path, number) = match cursor {
            None => (self.page_path(1), Some(1)),
            Some(PageCursor::Page(n)) => (self.page_path(*n), Some(*n)),
            Some(PageCursor::Token(token)) => (self.dir.join(format!("{token}.json")), None),
        };
        debug!(path = %path.display(), ?filter, "replaying page");

        let Some(tree) = Self::read_json(&path).await? else {
            return Ok(Remote::Ready(OrderPage::default()));
        };
        let page: PageFile = serde_json::from_value(tree)
            .map_err(|e| RemoteError::Malformed(format!("{}: {e}", path.display())))?;

        let (orders, next_token) = match page {
            PageFile::Paged { orders, next_token } => (orders, next_token),
            PageFile::Bare(orders) => (orders, None),
        };
        let next = match (next_token, number) {
            (Some(token), _) => Some(PageCursor::Token(token)),
            (None, Some(n)) if self.page_path(n + 1).is_file() => Some(PageCursor::Page(n + 1)),
            _ => None,
        };
        Ok(Remote::Ready(OrderPage { orders, next }))
    }

    async fn get_order(&self, order_id: &str) -> Result<Remote<Option<Value>>, RemoteError> {
        let path = self.dir.join("orders").join(format!("{order_id}.json"));
        Self::read_json(&path).await.map(Remote::Ready)
    }

    async fn get_order_line_items(&self, order_id: &str) -> Result<Remote<Vec<Value>>, RemoteError> {
        let path = self.dir.join("items").join(format!("{order_id}.json"));
        match Self::read_json(&path).await? {
            None => Ok(Remote::Ready(Vec::new())),
            Some(Value::Array(items)) => Ok(Remote::Ready(items)),
            Some(single) => Ok(Remote::Ready(vec![single])),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CapturedReply {
    Response(Value),
    Fault(Value),
}

/// Carrier client answering from a capture file.
#[derive(Debug, Clone)]
pub struct ReplayCarrier {
    carrier: Carrier,
    replies: BTreeMap<String, CapturedReply>,
}

impl ReplayCarrier {
    /// # Errors
    ///
    /// Returns `CliError` when the file cannot be read or parsed.
    pub async fn load(carrier: Carrier, path: &Path) -> Result<Self, CliError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CliError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let replies = serde_json::from_str(&raw).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { carrier, replies })
    }

    /// Tracking numbers present in the capture.
    #[must_use]
    pub fn tracking_numbers(&self) -> Vec<String> {
        self.replies.keys().cloned().collect()
    }
}

impl CarrierClient for ReplayCarrier {
    fn carrier(&self) -> Carrier {
        self.carrier
    }

    async fn track(&self, tracking_number: &str) -> Result<CarrierReply, RemoteError> {
        match self.replies.get(tracking_number) {
            Some(CapturedReply::Response(tree)) => Ok(CarrierReply::Response(tree.clone())),
            Some(CapturedReply::Fault(tree)) => Ok(CarrierReply::Fault(tree.clone())),
            None => Err(RemoteError::Unavailable(format!(
                "no captured reply for {tracking_number}"
            ))),
        }
    }
}
