//! Harvester module for walking the ID space
//!
//! This module contains the harvesting core, including:
//! - The batch controller state machine
//! - Per-run harvest state (cursor, known IDs, empty-batch counter)
//! - Liveness probing to tell data gaps from source downtime

mod controller;
mod probe;
mod state;

pub use controller::{HarvestSettings, Harvester};
pub use probe::{Liveness, LivenessProber};
pub use state::{HarvestState, Phase};

use crate::config::Config;
use crate::fetch::build_strategy;
use crate::record::Extractor;
use crate::storage::CsvStore;
use crate::HarvestError;

/// Runs a complete harvest from a configuration
///
/// This is the main entry point for a harvest. It will:
/// 1. Build the configured fetch strategy
/// 2. Open the CSV store and load prior records
/// 3. Compute the resume cursor
/// 4. Loop over batches until a fatal error occurs
pub async fn harvest(config: Config) -> Result<(), HarvestError> {
    let fetcher = build_strategy(&config).await?;
    let store = CsvStore::new(&config.output.file).with_dry_run(config.output.dry_run);
    let extractor = Extractor::new(&config.fields)?;

    let mut harvester = Harvester::new(HarvestSettings::from(&config), fetcher, store, extractor)?;
    harvester.run().await
}
