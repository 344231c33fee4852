/// Controller phase and per-run harvest state
use crate::record::Record;
use std::collections::HashSet;
use std::fmt;

/// Where the batch controller is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Fetching and committing batches at the cursor
    Advancing,

    /// A run of empty batches hit the threshold; the source is being re-checked
    ProbingLiveness,

    /// The probe failed; the cursor is about to move back
    RollingBack,

    /// Cooling down before retrying the rolled-back batches
    Sleeping,

    /// A fatal error stopped the controller
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Advancing => "advancing",
            Self::ProbingLiveness => "probing_liveness",
            Self::RollingBack => "rolling_back",
            Self::Sleeping => "sleeping",
            Self::Terminated => "terminated",
        };
        write!(f, "{}", name)
    }
}

/// Mutable state for one harvest run
///
/// Built from the persisted store at startup and mutated only by the
/// controller. Nothing here outlives the process; durability comes from the
/// store writes after each committed batch.
#[derive(Debug, Clone)]
pub struct HarvestState {
    /// Start of the next unprocessed batch
    pub cursor: u64,

    /// Empty batches seen since the last commit or probe
    pub consecutive_empty: u32,

    /// In-memory mirror of the store, ordered by ID
    pub records: Vec<Record>,

    known_ids: HashSet<u64>,
}

impl HarvestState {
    /// Builds the state from loaded records
    ///
    /// With `refetch_empty`, stored records lacking data are left out of the
    /// known set so their IDs get fetched again.
    pub fn from_records(records: Vec<Record>, cursor: u64, refetch_empty: bool) -> Self {
        let known_ids = records
            .iter()
            .filter(|r| !refetch_empty || !r.is_empty())
            .map(|r| r.id)
            .collect();

        Self {
            cursor,
            consecutive_empty: 0,
            records,
            known_ids,
        }
    }

    pub fn is_known(&self, id: u64) -> bool {
        self.known_ids.contains(&id)
    }

    pub fn mark_known(&mut self, ids: impl IntoIterator<Item = u64>) {
        self.known_ids.extend(ids);
    }

    pub fn known_count(&self) -> usize {
        self.known_ids.len()
    }

    /// Highest stored ID, if any
    pub fn last_recorded_id(&self) -> Option<u64> {
        self.records.iter().map(|r| r.id).max()
    }
}
