//! Replay captured order listings through the sync walker.
//!
//! # Usage
//!
//! ```bash
//! # Walk orders updated in the last 3 days
//! retail-sync orders --retailer amazon --site 1 --retail-site 2 --days-ago 3 \
//!     --replay captures/amazon --statuses statuses.yaml
//!
//! # Same walk, pausing between pages as a live walk would
//! retail-sync orders --retailer amazon --site 1 --retail-site 2 --days-ago 3 \
//!     --replay captures/amazon --paced
//!
//! # Sync one order by remote ID
//! retail-sync orders --retailer shopify --site 1 --retail-site 3 \
//!     --replay captures/shopify --order 450789469
//! ```

use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use clap::{Args, ValueEnum};
use retail_sync::context::Credentials;
use retail_sync::mapping::source_for;
use retail_sync::memory::InMemoryOrderStore;
use retail_sync::ports::ListFilter;
use retail_sync::walker::RepairReport;
use retail_sync::{
    OrderWalker, OrphanPolicy, StatusVocabulary, SyncConfig, SyncContext, SyncReport, WalkPolicy,
};
use retail_sync_core::{
    DiscountSet, LineItemRecord, Retailer, RetailSiteId, StoredOrder, TotalsRecord, WhslSiteId,
};
use serde::Serialize;

use super::emit;
use crate::error::CliError;
use crate::replay::ReplayFeed;

/// Which date the listing filters on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Window {
    /// Orders updated since the start date.
    #[default]
    Updated,
    /// Orders created since the start date.
    Created,
    /// Currently open orders, ignoring the start date.
    Open,
}

#[derive(Debug, Args)]
pub struct OrdersArgs {
    /// Remote order source
    #[arg(long)]
    pub retailer: Retailer,

    /// Wholesale site ID owning the orders
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..))]
    pub site: i32,

    /// Retail site ID the orders come from
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..))]
    pub retail_site: i32,

    /// Start the walk this many days before today, at midnight UTC
    #[arg(long, default_value_t = 0)]
    pub days_ago: u32,

    /// Listing filter
    #[arg(long, value_enum, default_value_t = Window::Updated)]
    pub window: Window,

    /// Directory of captured payloads
    #[arg(long)]
    pub replay: PathBuf,

    /// YAML map of status name to status ID
    #[arg(long)]
    pub statuses: Option<PathBuf>,

    /// Sync this one order instead of walking the listing
    #[arg(long)]
    pub order: Option<String>,

    /// Afterwards, fetch line items for stored orders that have none
    #[arg(long)]
    pub repair_line_items: bool,

    /// Record cancellations of unknown orders instead of aborting
    #[arg(long)]
    pub record_orphans: bool,

    /// Pause between pages and before throttle retries as a live walk does
    #[arg(long)]
    pub paced: bool,
}

#[derive(Debug, Serialize)]
struct OrderSnapshot {
    #[serde(flatten)]
    order: StoredOrder,
    line_items: Vec<LineItemRecord>,
    totals: Option<TotalsRecord>,
    discounts: Option<DiscountSet>,
}

#[derive(Debug, Serialize)]
struct OrdersOutput<'a> {
    report: &'a SyncReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    repair: Option<RepairReport>,
    orders: Vec<OrderSnapshot>,
}

/// Run the `orders` subcommand.
///
/// # Errors
///
/// Returns `CliError` when the inputs cannot be read or the walk aborts. An
/// aborted walk still prints its report and whatever it stored.
pub async fn run(args: OrdersArgs, config: &SyncConfig) -> Result<(), CliError> {
    let statuses = load_statuses(args.statuses.as_deref()).await?;
    let ctx = SyncContext::new(
        args.retailer,
        WhslSiteId::new(args.site),
        RetailSiteId::new(args.retail_site),
        statuses,
    )
    .with_credentials(credentials_for(config, args.retailer));

    let feed = ReplayFeed::open(&args.replay)?;
    let store = InMemoryOrderStore::new();
    let orphan_policy = if args.record_orphans {
        OrphanPolicy::Record
    } else {
        OrphanPolicy::Abort
    };
    let policy = walk_policy(config, args.retailer, args.paced).with_orphan_policy(orphan_policy);
    let walker = OrderWalker::new(
        &ctx,
        source_for(args.retailer),
        &feed,
        &store,
        &store,
        policy,
    );

    let report = if let Some(order_id) = &args.order {
        walker.sync_single_order(order_id).await?
    } else {
        match walker.run(filter(args.window, args.days_ago)).await {
            Ok(report) => report,
            Err(aborted) => {
                emit_store(&aborted.report, None, &store).await?;
                return Err(Box::new(aborted).into());
            }
        }
    };

    let repair = if args.repair_line_items {
        Some(walker.repair_orphan_line_items().await?)
    } else {
        None
    };

    emit_store(&report, repair, &store).await
}

async fn emit_store(
    report: &SyncReport,
    repair: Option<RepairReport>,
    store: &InMemoryOrderStore,
) -> Result<(), CliError> {
    let mut orders = Vec::new();
    for order in store.orders().await {
        orders.push(OrderSnapshot {
            line_items: store.line_items(order.id).await,
            totals: store.totals(order.id).await,
            discounts: store.discounts(order.id).await,
            order,
        });
    }
    emit(&OrdersOutput {
        report,
        repair,
        orders,
    })
}

/// Listing filter starting `days_ago` days before today at midnight.
fn filter(window: Window, days_ago: u32) -> ListFilter {
    let start = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(u64::from(days_ago)))
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN);
    match window {
        Window::Updated => ListFilter::UpdatedAfter(start),
        Window::Created => ListFilter::CreatedAfter(start),
        Window::Open => ListFilter::Open,
    }
}

/// Captured payloads are never throttled, so replays skip pacing unless asked.
fn walk_policy(config: &SyncConfig, retailer: Retailer, paced: bool) -> WalkPolicy {
    if paced {
        config.walk_policy(retailer)
    } else {
        WalkPolicy::immediate(config.max_runtime)
    }
}

fn credentials_for(config: &SyncConfig, retailer: Retailer) -> Credentials {
    match retailer {
        Retailer::Amazon => config
            .amazon
            .clone()
            .map_or(Credentials::None, Credentials::Amazon),
        Retailer::Shopify => config
            .shopify
            .clone()
            .map_or(Credentials::None, Credentials::Shopify),
    }
}

async fn load_statuses(path: Option<&Path>) -> Result<StatusVocabulary, CliError> {
    let Some(path) = path else {
        tracing::warn!("no status vocabulary given; orders will carry no status");
        return Ok(StatusVocabulary::new());
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_yaml::from_str(&raw).map_err(|source| CliError::Statuses {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::Timelike;

    use super::*;

    #[test]
    fn test_filter_starts_at_midnight() {
        let ListFilter::UpdatedAfter(start) = filter(Window::Updated, 3) else {
            panic!("wrong window");
        };
        assert_eq!(start.hour(), 0);
        assert_eq!(
            Utc::now().date_naive().signed_duration_since(start.date()).num_days(),
            3
        );
        assert_eq!(filter(Window::Open, 3), ListFilter::Open);
    }

    #[test]
    fn test_paced_walk_uses_configured_pauses() {
        let config = SyncConfig::from_lookup(|key| match key {
            "SYNC_THROTTLE_BACKOFF_SECS" => Some("7".to_string()),
            "SYNC_PAGE_DELAY_SECS" => Some("2".to_string()),
            _ => None,
        })
        .unwrap();

        let paced = walk_policy(&config, Retailer::Amazon, true);
        assert_eq!(paced.throttle_backoff, Duration::from_secs(7));
        assert_eq!(paced.page_delay, Duration::from_secs(2));
        assert_eq!(paced.max_runtime, config.max_runtime);

        let replay = walk_policy(&config, Retailer::Amazon, false);
        assert_eq!(replay.throttle_backoff, Duration::ZERO);
        assert_eq!(replay.page_delay, Duration::ZERO);
        assert_eq!(replay.max_runtime, config.max_runtime);
    }

    #[tokio::test]
    async fn test_load_statuses_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statuses.yaml");
        std::fs::write(&path, "Processing: 1\nShipped: 3\nCancelled: 4\n").unwrap();
        let statuses = load_statuses(Some(&path)).await.unwrap();
        assert_eq!(statuses.len(), 3);
    }
}
