//! Output module for inspecting and maintaining the record store
//!
//! This module handles:
//! - Store statistics for the `--stats` mode
//! - The offline sort pass that rewrites an append-mode store in ID order

pub mod stats;

pub use stats::{compute_statistics, load_statistics, print_statistics, StoreStatistics};

use crate::storage::{merge, PersistMode, RecordStore};
use crate::HarvestError;

/// Rewrites the store sorted by ID with one row per ID
///
/// Append mode leaves rows in write order and may leave duplicates behind;
/// this pass loads everything, merges (last row wins), and overwrites.
///
/// # Returns
///
/// The number of rows removed as duplicates
pub fn sort_store(store: &mut dyn RecordStore) -> Result<usize, HarvestError> {
    let records = store.load()?;
    let before = records.len();

    let sorted = merge(Vec::new(), records);
    let removed = before - sorted.len();

    store.persist(&sorted, PersistMode::Overwrite)?;
    tracing::info!(
        "Sorted {} records ({} duplicate rows removed)",
        sorted.len(),
        removed
    );
    Ok(removed)
}
