//! Statistics over the record store
//!
//! This module computes and prints a summary of what a store holds, for the
//! `--stats` mode.

use crate::record::Record;
use crate::storage::RecordStore;
use crate::HarvestError;
use std::collections::HashMap;

/// Store statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Rows in the store, duplicates included
    pub total_rows: u64,

    /// Rows with a populated primary field
    pub non_empty_rows: u64,

    /// Rows recorded as "no data"
    pub empty_rows: u64,

    /// IDs that appear on more than one row
    pub duplicate_ids: Vec<u64>,

    pub first_id: Option<u64>,
    pub last_id: Option<u64>,
}

/// Computes statistics from loaded records
pub fn compute_statistics(records: &[Record]) -> StoreStatistics {
    let mut occurrences: HashMap<u64, u32> = HashMap::new();
    for record in records {
        *occurrences.entry(record.id).or_default() += 1;
    }

    let mut duplicate_ids: Vec<u64> = occurrences
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id)
        .collect();
    duplicate_ids.sort_unstable();

    let non_empty_rows = records.iter().filter(|r| !r.is_empty()).count() as u64;

    StoreStatistics {
        total_rows: records.len() as u64,
        non_empty_rows,
        empty_rows: records.len() as u64 - non_empty_rows,
        duplicate_ids,
        first_id: records.iter().map(|r| r.id).min(),
        last_id: records.iter().map(|r| r.id).max(),
    }
}

/// Loads statistics from a store
pub fn load_statistics(store: &dyn RecordStore) -> Result<StoreStatistics, HarvestError> {
    let records = store.load()?;
    Ok(compute_statistics(&records))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Total rows: {}", stats.total_rows);

    let percentage = if stats.total_rows > 0 {
        (stats.non_empty_rows as f64 / stats.total_rows as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "  Rows with data: {} ({:.1}%)",
        stats.non_empty_rows, percentage
    );
    println!("  Empty rows: {}", stats.empty_rows);

    match (stats.first_id, stats.last_id) {
        (Some(first), Some(last)) => println!("  ID range: {} - {}", first, last),
        _ => println!("  ID range: (empty store)"),
    }
    println!();

    if !stats.duplicate_ids.is_empty() {
        println!("Duplicate IDs ({}):", stats.duplicate_ids.len());
        for id in stats.duplicate_ids.iter().take(20) {
            println!("  - {}", id);
        }
        if stats.duplicate_ids.len() > 20 {
            println!("  ... and {} more", stats.duplicate_ids.len() - 20);
        }
        println!("Run with --sort to deduplicate.");
    }
}
