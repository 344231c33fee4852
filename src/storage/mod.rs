//! Storage module for persisting harvested records
//!
//! This module handles the durable side of a harvest:
//! - Loading previously harvested records at startup
//! - Merging new results into the existing set (unique by ID, ordered by ID)
//! - Appending or overwriting the CSV store after every committed batch

mod csv_store;
mod traits;

pub use csv_store::CsvStore;
pub use traits::{PersistMode, RecordStore, StorageError, StorageResult};

use crate::record::Record;
use std::collections::BTreeMap;

/// Merges new records into an existing sequence
///
/// The result holds one record per ID, sorted by ascending integer ID. When
/// an ID appears more than once the last occurrence wins, with `new_records`
/// taking precedence over `existing`.
///
/// # Example
///
/// ```
/// use seq_harvest::record::Record;
/// use seq_harvest::storage::merge;
///
/// let existing = vec![Record::empty(3), Record::empty(1)];
/// let merged = merge(vec![Record::empty(2)], existing);
/// let ids: Vec<u64> = merged.iter().map(|r| r.id).collect();
/// assert_eq!(ids, vec![1, 2, 3]);
/// ```
pub fn merge(new_records: Vec<Record>, existing: Vec<Record>) -> Vec<Record> {
    let mut by_id: BTreeMap<u64, Record> = BTreeMap::new();
    for record in existing.into_iter().chain(new_records) {
        by_id.insert(record.id, record);
    }
    by_id.into_values().collect()
}
