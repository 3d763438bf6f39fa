//! Retail Sync CLI - Replay captured payloads through the sync engine.
//!
//! # Usage
//!
//! ```bash
//! # Replay an Amazon listing capture into the in-memory store
//! retail-sync orders --retailer amazon --site 1 --retail-site 2 --days-ago 3 \
//!     --replay captures/amazon --statuses statuses.yaml
//!
//! # Normalize captured UPS replies
//! retail-sync packages --carrier ups --replay captures/ups.json
//! ```
//!
//! # Commands
//!
//! - `orders` - Walk a captured listing, print the run report and stored records
//! - `packages` - Reconcile captured carrier replies, print the shipment report
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Log filter (default: `retail_sync=info,retail_sync_cli=info`)
//! - `LOG_FORMAT` - `json` for structured logs, text otherwise
//! - see `retail_sync::config` for the engine settings

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use retail_sync::SyncConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod replay;

use commands::orders::OrdersArgs;
use commands::packages::PackagesArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "retail-sync")]
#[command(author, version, about = "Retail order and shipment sync tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a captured order listing through the sync walker
    Orders(OrdersArgs),
    /// Replay captured carrier replies through the shipment reconciler
    Packages(PackagesArgs),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SyncConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            send_default_pii: false, // payloads carry customer addresses
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(with_sentry: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "retail_sync=info,retail_sync_cli=info".into());

    let is_json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let json_layer = is_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!is_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let sentry_layer =
        with_sentry.then(|| sentry_tracing::layer().event_filter(sentry_event_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_layer)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration is needed before tracing for the Sentry DSN
    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(false);
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    let sentry_guard = init_sentry(&config);
    init_tracing(sentry_guard.is_some());

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &SyncConfig) -> Result<(), CliError> {
    match cli.command {
        Commands::Orders(args) => commands::orders::run(args, config).await,
        Commands::Packages(args) => commands::packages::run(args, config).await,
    }
}
