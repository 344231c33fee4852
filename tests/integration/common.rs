//! Test utilities and mock implementations for integration tests.

use async_trait::async_trait;
use seq_harvest::config::FieldSelectors;
use seq_harvest::fetch::{FetchError, FetchOutcome, FetchStrategy};
use seq_harvest::harvester::HarvestSettings;
use seq_harvest::record::{Extractor, Record};
use seq_harvest::storage::{merge, PersistMode, RecordStore, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Fixtures
// =============================================================================

pub fn named(id: u64, first_name: &str) -> Record {
    Record {
        id,
        first_name: first_name.to_string(),
        ..Record::default()
    }
}

/// A record page in the shape the default selectors expect
pub fn record_page(first_name: &str, last_name: &str) -> String {
    format!(
        r#"<html><body>
        <span id="first_name">{}</span>
        <span id="last_name">{}</span>
        <span id="category">General</span>
        </body></html>"#,
        first_name, last_name
    )
}

pub const NOT_FOUND_PAGE: &str = "<html><body><p>Record not found</p></body></html>";

pub fn extractor() -> Extractor {
    Extractor::new(&FieldSelectors::default()).unwrap()
}

/// Settings with no cooldowns so state-machine tests never sleep
pub fn settings(start_id: u64, batch_size: u32, threshold: u32) -> HarvestSettings {
    HarvestSettings {
        start_id,
        batch_size,
        empty_batch_threshold: threshold,
        resume: true,
        keep_empty: true,
        refetch_empty: false,
        persist_mode: PersistMode::Overwrite,
        fetch_timeout: Duration::from_millis(200),
        probe_id: 1,
        probe_timeout: Duration::from_millis(500),
        rollback_cooldown: Duration::ZERO,
        ignore_fetch_errors: false,
        error_cooldown: Duration::ZERO,
    }
}

// =============================================================================
// ScriptedFetcher
// =============================================================================

/// Fetch strategy answering from an in-memory script.
///
/// IDs with a page return it, IDs marked slow time out, IDs marked failing
/// return a fetch error, and everything else returns a "not found" page.
/// Every call is logged.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    pages: Arc<Mutex<HashMap<u64, String>>>,
    slow: Arc<Mutex<HashSet<u64>>>,
    failing: Arc<Mutex<HashSet<u64>>>,
    calls: Arc<Mutex<Vec<u64>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, id: u64, first_name: &str) -> Self {
        self.set_record(id, first_name);
        self
    }

    pub fn set_record(&self, id: u64, first_name: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(id, record_page(first_name, "Test"));
    }

    pub fn set_slow(&self, id: u64) {
        self.slow.lock().unwrap().insert(id);
    }

    pub fn set_failing(&self, id: u64) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn clear_failing(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// IDs fetched so far, in call order
    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl FetchStrategy for ScriptedFetcher {
    async fn fetch(&self, id: u64, _timeout: Duration) -> Result<FetchOutcome, FetchError> {
        self.calls.lock().unwrap().push(id);

        if self.failing.lock().unwrap().contains(&id) {
            return Err(FetchError::Status {
                url: format!("scripted://{}", id),
                status: 500,
            });
        }

        if self.slow.lock().unwrap().contains(&id) {
            return Ok(FetchOutcome::TimedOut);
        }

        let page = self
            .pages
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| NOT_FOUND_PAGE.to_string());
        Ok(FetchOutcome::Document(page))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory record store that mirrors CSV store semantics.
///
/// Writes can be switched to fail to exercise storage error handling.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<Record>>>,
    writes: Arc<Mutex<Vec<(PersistMode, usize)>>>,
    read_only: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Record>) -> Self {
        let store = Self::default();
        *store.rows.lock().unwrap() = rows;
        store
    }

    /// Stored rows in storage order
    pub fn rows(&self) -> Vec<Record> {
        self.rows.lock().unwrap().clone()
    }

    /// Makes every later persist call fail
    pub fn set_read_only(&self) {
        *self.read_only.lock().unwrap() = true;
    }

    /// One entry per persist call: mode and row count
    pub fn writes(&self) -> Vec<(PersistMode, usize)> {
        self.writes.lock().unwrap().clone()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self) -> StorageResult<Vec<Record>> {
        let mut rows = self.rows();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    fn persist(&mut self, records: &[Record], mode: PersistMode) -> StorageResult<()> {
        if *self.read_only.lock().unwrap() {
            return Err(StorageError::Write {
                path: "memory".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only store"),
            });
        }

        self.writes.lock().unwrap().push((mode, records.len()));
        let mut rows = self.rows.lock().unwrap();
        match mode {
            PersistMode::Append => rows.extend_from_slice(records),
            PersistMode::Overwrite => *rows = merge(records.to_vec(), Vec::new()),
        }
        Ok(())
    }
}
