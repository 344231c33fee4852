//! Seq-Harvest: a sequential-ID record harvester
//!
//! This crate walks an unbounded integer ID space in batches, fetches the
//! record behind each ID from a remote source, and accumulates the results
//! into a deduplicated, ID-ordered CSV store. Sustained runs of empty batches
//! trigger a liveness probe so that source downtime is rolled back and retried
//! instead of being recorded as a gap.

pub mod config;
pub mod fetch;
pub mod harvester;
pub mod output;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for Seq-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("No usable credentials configured for the {strategy} fetch strategy")]
    NoCredentials { strategy: String },

    #[error("Harvester already terminated after a fatal error")]
    Terminated,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector for {field}: {selector}")]
    InvalidSelector { field: String, selector: String },
}

/// Result type alias for Seq-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvester::{Harvester, Phase};
pub use record::{Extractor, Record};
pub use storage::{merge, CsvStore, PersistMode, RecordStore};
