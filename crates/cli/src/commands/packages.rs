//! Replay captured carrier replies through the shipment reconciler.

use std::path::PathBuf;

use clap::Args;
use retail_sync::SyncConfig;
use retail_sync::shipment::ShipmentReconciler;
use retail_sync_core::Carrier;

use super::emit;
use crate::error::CliError;
use crate::replay::ReplayCarrier;

#[derive(Debug, Args)]
pub struct PackagesArgs {
    /// Carrier the tracking numbers belong to (ups, fedex)
    #[arg(long)]
    pub carrier: Carrier,

    /// JSON capture keyed by tracking number
    #[arg(long)]
    pub replay: PathBuf,

    /// Poll only these tracking numbers (default: every captured one)
    #[arg(long = "tracking")]
    pub tracking_numbers: Vec<String>,
}

/// Run the `packages` subcommand.
///
/// # Errors
///
/// Returns `CliError` when the capture cannot be read.
pub async fn run(args: PackagesArgs, config: &SyncConfig) -> Result<(), CliError> {
    let client = ReplayCarrier::load(args.carrier, &args.replay).await?;
    let tracking_numbers = if args.tracking_numbers.is_empty() {
        client.tracking_numbers()
    } else {
        args.tracking_numbers
    };

    let report = ShipmentReconciler::new(
        &client,
        config.carrier_utc_offset,
        config.tracking_concurrency,
    )
    .reconcile(tracking_numbers)
    .await;
    emit(&report)
}
