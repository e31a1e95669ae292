use std::sync::Arc;

use log::{debug, warn};

use crate::clock::GlobalClock;
use crate::config::NorecConfig;
use crate::data_store::Value;
use crate::data_store::object_store::ObjectStore;
use crate::errors::Result;
use crate::stats::{CommitRecord, Stats, StatsSnapshot};
use crate::transaction::Transaction;

/// NOrec Prelude
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::config::*;
    pub use crate::data_store::object_store::*;
    pub use crate::data_store::{Address, Value};
    pub use crate::errors::*;
    pub use crate::stats::*;
    pub use crate::transaction::*;
    pub use crate::*;
}

/// The main entry point for the NOrec Software Transactional Memory system.
///
/// Owns the shared store and the single global clock that coordinates every
/// transaction over it. Cheap to share between threads by reference (or in an
/// `Arc`); each thread drives its own [`Transaction`] contexts.
pub struct Norec {
    clock: Arc<GlobalClock>,
    store: Arc<ObjectStore>,
    stats: Arc<Stats>,
    config: NorecConfig,
}

impl Norec {
    /// Creates an engine over `cells` cells initialized to `initial`, with the
    /// default configuration.
    pub fn new(cells: usize, initial: Value) -> Self {
        Self::build(ObjectStore::new(cells, initial), NorecConfig::default())
    }

    /// Creates an engine over `cells` cells initialized to `initial`.
    ///
    /// # Errors
    ///
    /// Returns [`NorecError::InvalidConfig`](crate::NorecError::InvalidConfig)
    /// if `config` does not validate.
    pub fn with_config(cells: usize, initial: Value, config: NorecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(ObjectStore::new(cells, initial), config))
    }

    /// Creates an engine whose cell `i` holds `values[i]`.
    pub fn from_values(values: &[Value], config: NorecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(ObjectStore::from_values(values), config))
    }

    fn build(store: ObjectStore, config: NorecConfig) -> Self {
        Self {
            clock: Arc::new(GlobalClock::new()),
            store: Arc::new(store),
            stats: Arc::new(Stats::new(config.record_history)),
            config,
        }
    }

    pub fn config(&self) -> &NorecConfig {
        &self.config
    }

    /// Number of cells in the store.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Current value of the global clock.
    pub fn clock(&self) -> u64 {
        self.clock.now()
    }

    /// Starts a new transaction. The returned context is already begun.
    pub fn start_transaction(&self) -> Transaction {
        let mut txn = Transaction::new(
            Arc::clone(&self.clock),
            Arc::clone(&self.store),
            Arc::clone(&self.stats),
        );
        txn.begin();
        txn
    }

    /// Runs `body` as a transaction until it commits.
    ///
    /// After an abort, whether signalled by a read, by the commit or by the
    /// body itself through [`Transaction::abort`], the same context is begun
    /// again and `body` re-runs from scratch. `body` must therefore be free of
    /// side effects outside the transaction. Any other error is returned
    /// immediately without committing.
    ///
    /// Retries are unbounded unless `max_attempts` is configured, in which
    /// case the last abort is returned once the cap is hit.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ::norec::prelude::*;
    ///
    /// let stm = Norec::new(2, 100);
    /// stm.atomically(|txn| {
    ///     let a = txn.read(0)?;
    ///     let b = txn.read(1)?;
    ///     txn.write(0, a - 50)?;
    ///     txn.write(1, b + 50)
    /// })
    /// .unwrap();
    /// assert_eq!(stm.snapshot(), vec![50, 150]);
    /// ```
    pub fn atomically<R, F>(&self, mut body: F) -> Result<R>
    where
        F: FnMut(&mut Transaction) -> Result<R>,
    {
        let mut txn = self.start_transaction();
        let mut backoff = self.config.retry.backoff();
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            let result = body(&mut txn).and_then(|value| txn.commit().map(|_| value));
            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_abort() => {
                    txn.mark_aborted(&e);
                    if self.config.max_attempts.is_some_and(|max| attempts >= max) {
                        warn!("Giving up after {} aborted attempts: {}", attempts, e);
                        return Err(e);
                    }
                    debug!("Attempt {} aborted, retrying: {}", attempts, e);
                    backoff.pause();
                    txn.begin();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Copies the whole store as of a single clock version.
    ///
    /// Not a transaction: it does not conflict with anything and never aborts,
    /// it simply retries the copy until no commit overlapped it.
    pub fn snapshot(&self) -> Vec<Value> {
        loop {
            let t = self.clock.wait_even();
            let values = self.store.copy_values();
            if self.clock.now() == t {
                return values;
            }
        }
    }

    /// Sum of all cells, taken from a consistent [`snapshot`](Self::snapshot).
    pub fn total(&self) -> i128 {
        self.snapshot().into_iter().map(i128::from).sum()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Recorded writing commits in version order. Empty unless
    /// `record_history` is enabled.
    pub fn commit_history(&self) -> Vec<CommitRecord> {
        self.stats.history()
    }
}
