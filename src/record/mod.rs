//! Harvested record model
//!
//! A record is keyed by its positive integer ID and carries a fixed, ordered
//! set of optional text fields. Absent fields are stored as empty strings, so
//! a record with every field empty is a valid "no data at this ID" result.

mod extractor;

pub use extractor::Extractor;

use serde::{Deserialize, Serialize};

/// Column names of the CSV store, in order
pub const FIELD_NAMES: [&str; 7] = [
    "id",
    "first_name",
    "middle_name",
    "last_name",
    "first_date",
    "second_date",
    "category",
];

/// Width of the zero-padded ID sent to the remote source
pub const ID_WIDTH: usize = 7;

/// One harvested entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_date: String,
    #[serde(default)]
    pub second_date: String,
    #[serde(default)]
    pub category: String,
}

impl Record {
    /// Creates a record with every field empty
    pub fn empty(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Returns true if the primary marker field is absent
    ///
    /// The given name is the marker for "the source had data at this ID";
    /// other fields are not consulted.
    pub fn is_empty(&self) -> bool {
        self.first_name.is_empty()
    }
}

/// Formats an ID as a fixed-width zero-padded string
pub fn padded_id(id: u64) -> String {
    format!("{:0width$}", id, width = ID_WIDTH)
}
