use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use crate::data_store::read_set::ReadEntry;
use crate::data_store::{Address, Value};

/// What one writing commit observed and published.
///
/// `reads` are the values the transaction depended on, valid at clock value
/// `commit_version - 1`. Replaying records in `commit_version` order against
/// the initial store must reproduce every recorded read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    /// Clock value observed by `begin`.
    pub start_snapshot: u64,
    /// Odd clock value held while writing back.
    pub commit_version: u64,
    pub reads: Vec<(Address, Value)>,
    pub writes: Vec<(Address, Value)>,
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Commits that published a write set.
    pub commits: u64,
    /// Commits with an empty write set.
    pub read_only_commits: u64,
    /// Aborted attempts.
    pub aborts: u64,
}

/// Engine-wide counters, shared by every transaction of one `Norec`.
#[derive(Debug, Default)]
pub struct Stats {
    commits: AtomicU64,
    read_only_commits: AtomicU64,
    aborts: AtomicU64,
    history: Option<Mutex<Vec<CommitRecord>>>,
}

impl Stats {
    pub fn new(record_history: bool) -> Self {
        Self {
            history: record_history.then(|| Mutex::new(Vec::new())),
            ..Default::default()
        }
    }

    pub fn records_history(&self) -> bool {
        self.history.is_some()
    }

    pub(crate) fn record_abort(&self) {
        self.aborts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read_only(&self) {
        self.read_only_commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self, record: Option<CommitRecord>) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        if let (Some(history), Some(record)) = (&self.history, record) {
            history.lock().push(record);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            commits: self.commits.load(Ordering::Relaxed),
            read_only_commits: self.read_only_commits.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
        }
    }

    /// Recorded commits ordered by `commit_version`. Empty unless history
    /// recording is enabled.
    pub fn history(&self) -> Vec<CommitRecord> {
        let mut records = match &self.history {
            Some(history) => history.lock().clone(),
            None => Vec::new(),
        };
        records.sort_by_key(|r| r.commit_version);
        records
    }
}

impl CommitRecord {
    pub(crate) fn new<'a>(
        start_snapshot: u64,
        commit_version: u64,
        reads: impl Iterator<Item = &'a ReadEntry>,
        writes: impl Iterator<Item = (Address, Value)>,
    ) -> Self {
        let mut writes: Vec<_> = writes.collect();
        writes.sort_unstable();
        Self {
            start_snapshot,
            commit_version,
            reads: reads.map(|e| (e.address, e.value)).collect(),
            writes,
        }
    }
}
