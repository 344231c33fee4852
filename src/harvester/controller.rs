//! Batch controller - the harvest state machine
//!
//! The controller walks the ID space one batch at a time:
//!
//! | Phase | Action | Next |
//! |-------|--------|------|
//! | Advancing | batch fully known | Advancing (cursor + batch) |
//! | Advancing | batch has data | Advancing (commit, counter reset) |
//! | Advancing | batch empty, below threshold | Advancing (cursor + batch) |
//! | Advancing | batch empty, threshold reached | ProbingLiveness |
//! | ProbingLiveness | probe alive | Advancing (cursor + batch) |
//! | ProbingLiveness | probe dead | RollingBack |
//! | RollingBack | cursor - (threshold - 1) * batch | Sleeping |
//! | Sleeping | cooldown elapses | Advancing |
//!
//! Any fetch error (unless ignored), store read or write error moves the
//! controller to `Terminated` and is returned to the caller.

use crate::config::{Config, OutputMode};
use crate::fetch::{FetchError, FetchOutcome, FetchStrategy};
use crate::harvester::probe::{Liveness, LivenessProber};
use crate::harvester::state::{HarvestState, Phase};
use crate::record::{Extractor, Record};
use crate::storage::{merge, PersistMode, RecordStore, StorageError};
use crate::{ConfigError, HarvestError};
use futures::future::join_all;
use std::time::Duration;

/// Controller settings, resolved from [`Config`]
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub start_id: u64,
    pub batch_size: u32,
    pub empty_batch_threshold: u32,
    pub resume: bool,
    pub keep_empty: bool,
    pub refetch_empty: bool,
    pub persist_mode: PersistMode,
    pub fetch_timeout: Duration,
    pub probe_id: u64,
    pub probe_timeout: Duration,
    pub rollback_cooldown: Duration,
    pub ignore_fetch_errors: bool,
    pub error_cooldown: Duration,
}

impl From<&Config> for HarvestSettings {
    fn from(config: &Config) -> Self {
        Self {
            start_id: config.harvest.start_id,
            batch_size: config.harvest.batch_size,
            empty_batch_threshold: config.harvest.empty_batch_threshold,
            resume: config.harvest.resume,
            keep_empty: config.harvest.keep_empty,
            refetch_empty: config.harvest.refetch_empty,
            persist_mode: match config.output.mode {
                OutputMode::Append => PersistMode::Append,
                OutputMode::Overwrite => PersistMode::Overwrite,
            },
            fetch_timeout: Duration::from_millis(config.fetch.timeout_ms),
            probe_id: config.fetch.probe_id,
            probe_timeout: Duration::from_millis(config.fetch.probe_timeout_ms),
            rollback_cooldown: Duration::from_secs(config.harvest.rollback_cooldown_secs),
            ignore_fetch_errors: config.harvest.ignore_fetch_errors,
            error_cooldown: Duration::from_secs(config.harvest.error_cooldown_secs),
        }
    }
}

impl HarvestSettings {
    fn batch_len(&self) -> u64 {
        u64::from(self.batch_size)
    }

    /// How far the cursor moves back after a dead probe
    ///
    /// Every batch since the last confirmed-alive point is retried except the
    /// one the probe was triggered on, which the cursor still points at.
    pub fn rollback_distance(&self) -> u64 {
        u64::from(self.empty_batch_threshold.saturating_sub(1)) * self.batch_len()
    }
}

/// Drives the harvest over a fetch strategy and a record store
pub struct Harvester<F, S>
where
    F: FetchStrategy,
    S: RecordStore,
{
    settings: HarvestSettings,
    fetcher: F,
    store: S,
    extractor: Extractor,
    prober: LivenessProber,
    state: HarvestState,
    phase: Phase,
}

impl<F, S> Harvester<F, S>
where
    F: FetchStrategy,
    S: RecordStore,
{
    /// Loads persisted state and computes the resume cursor
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run, in the `Advancing` phase
    /// * `Err(HarvestError::Storage)` - The store exists but could not be read
    /// * `Err(HarvestError::Config)` - The batch size is zero
    pub fn new(
        settings: HarvestSettings,
        fetcher: F,
        store: S,
        extractor: Extractor,
    ) -> Result<Self, HarvestError> {
        if settings.batch_size == 0 {
            return Err(ConfigError::Validation("batch_size must be at least 1".to_string()).into());
        }

        let records = store.load()?;
        let mut state = HarvestState::from_records(records, settings.start_id, settings.refetch_empty);
        if settings.resume {
            if let Some(last) = state.last_recorded_id() {
                state.cursor = last + 1;
            }
        }

        tracing::info!(
            "Loaded {} stored records ({} known), starting at id {}",
            state.records.len(),
            state.known_count(),
            state.cursor
        );

        let prober = LivenessProber::new(settings.probe_id, settings.probe_timeout);

        Ok(Self {
            settings,
            fetcher,
            store,
            extractor,
            prober,
            state,
            phase: Phase::Advancing,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> u64 {
        self.state.cursor
    }

    pub fn consecutive_empty(&self) -> u32 {
        self.state.consecutive_empty
    }

    pub fn state(&self) -> &HarvestState {
        &self.state
    }

    pub fn records(&self) -> &[Record] {
        &self.state.records
    }

    /// Runs until a fatal error occurs
    ///
    /// There is no success exit: the loop keeps walking the ID space until
    /// the caller drops the future or an error is returned.
    pub async fn run(&mut self) -> Result<(), HarvestError> {
        tracing::info!(
            "Harvesting from id {} in batches of {} using the {} fetcher",
            self.state.cursor,
            self.settings.batch_size,
            self.fetcher.name()
        );

        loop {
            self.step().await?;
        }
    }

    /// Performs one state transition and returns the new phase
    pub async fn step(&mut self) -> Result<Phase, HarvestError> {
        let next = match self.phase {
            Phase::Advancing => self.advance().await,
            Phase::ProbingLiveness => Ok(self.probe_liveness().await),
            Phase::RollingBack => Ok(self.roll_back()),
            Phase::Sleeping => {
                tracing::info!(
                    "Sleeping {:?} before resuming at id {}",
                    self.settings.rollback_cooldown,
                    self.state.cursor
                );
                tokio::time::sleep(self.settings.rollback_cooldown).await;
                Ok(Phase::Advancing)
            }
            Phase::Terminated => Err(HarvestError::Terminated),
        };

        match next {
            Ok(phase) => {
                self.phase = phase;
                Ok(phase)
            }
            Err(e) => {
                tracing::error!("Harvest terminated at id {}: {}", self.state.cursor, e);
                self.phase = Phase::Terminated;
                Err(e)
            }
        }
    }

    async fn advance(&mut self) -> Result<Phase, HarvestError> {
        let batch_start = self.state.cursor;
        let batch_end = batch_start + self.settings.batch_len();

        let pending: Vec<u64> = (batch_start..batch_end)
            .filter(|id| !self.state.is_known(*id))
            .collect();

        if pending.is_empty() {
            tracing::info!(
                "All items in batch {} - {} already exist",
                batch_start,
                batch_end - 1
            );
            self.state.cursor = batch_end;
            return Ok(Phase::Advancing);
        }

        tracing::info!("Processing batch {} - {}", batch_start, batch_end - 1);

        let outcomes = match self.fetch_all(&pending).await {
            Ok(outcomes) => outcomes,
            Err(e) if self.settings.ignore_fetch_errors => {
                tracing::warn!(
                    "Fetch failed in batch {} - {}: {}; retrying after {:?}",
                    batch_start,
                    batch_end - 1,
                    e,
                    self.settings.error_cooldown
                );
                tokio::time::sleep(self.settings.error_cooldown).await;
                return Ok(Phase::Advancing);
            }
            Err(e) => return Err(e.into()),
        };

        let kept: Vec<Record> = pending
            .iter()
            .zip(outcomes)
            .map(|(&id, outcome)| {
                let record = self.extractor.extract(id, &outcome.into_document());
                if record.is_empty() {
                    tracing::debug!("No info found for {}", id);
                } else {
                    tracing::debug!("Found {}: {} {}", id, record.first_name, record.last_name);
                }
                record
            })
            .filter(|record| self.settings.keep_empty || !record.is_empty())
            .collect();

        if kept.iter().any(|record| !record.is_empty()) {
            tracing::info!(
                "Writing {} records for batch {} - {}",
                kept.len(),
                batch_start,
                batch_end - 1
            );
            self.commit(kept)?;
            self.state.consecutive_empty = 0;
            self.state.cursor = batch_end;
            return Ok(Phase::Advancing);
        }

        self.state.consecutive_empty += 1;
        if self.state.consecutive_empty < self.settings.empty_batch_threshold {
            tracing::info!(
                "Batch {} - {} is empty ({}/{})",
                batch_start,
                batch_end - 1,
                self.state.consecutive_empty,
                self.settings.empty_batch_threshold
            );
            self.state.cursor = batch_end;
            Ok(Phase::Advancing)
        } else {
            self.state.consecutive_empty = 0;
            Ok(Phase::ProbingLiveness)
        }
    }

    /// Fetches every pending ID and waits for all of them to settle
    async fn fetch_all(&self, ids: &[u64]) -> Result<Vec<FetchOutcome>, FetchError> {
        let timeout = self.settings.fetch_timeout;

        if self.fetcher.supports_concurrency() {
            join_all(ids.iter().map(|&id| self.fetcher.fetch(id, timeout)))
                .await
                .into_iter()
                .collect()
        } else {
            let mut outcomes = Vec::with_capacity(ids.len());
            for &id in ids {
                tracing::debug!("Processing {}", id);
                outcomes.push(self.fetcher.fetch(id, timeout).await?);
            }
            Ok(outcomes)
        }
    }

    fn commit(&mut self, kept: Vec<Record>) -> Result<(), StorageError> {
        let ids: Vec<u64> = kept.iter().map(|r| r.id).collect();

        // Appending an ID that is already stored would leave two rows for it
        let replaces_stored = self.state.records.iter().any(|r| ids.contains(&r.id));
        let mode = if replaces_stored {
            PersistMode::Overwrite
        } else {
            self.settings.persist_mode
        };

        let merged = merge(kept.clone(), self.state.records.clone());
        match mode {
            PersistMode::Append => self.store.persist(&kept, PersistMode::Append)?,
            PersistMode::Overwrite => self.store.persist(&merged, PersistMode::Overwrite)?,
        }

        self.state.records = merged;
        self.state.mark_known(ids);
        Ok(())
    }

    async fn probe_liveness(&mut self) -> Phase {
        match self.prober.probe(&self.fetcher, &self.extractor).await {
            Liveness::Alive => {
                self.state.cursor += self.settings.batch_len();
                Phase::Advancing
            }
            Liveness::Dead => Phase::RollingBack,
        }
    }

    fn roll_back(&mut self) -> Phase {
        let target = self
            .state
            .cursor
            .saturating_sub(self.settings.rollback_distance());

        tracing::warn!(
            "Source seems down, rolling back from id {} to {} and retrying",
            self.state.cursor,
            target
        );
        self.state.cursor = target;
        Phase::Sleeping
    }
}
