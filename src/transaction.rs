use std::sync::Arc;

use log::{debug, trace};

use crate::clock::GlobalClock;
use crate::conflict::validation::validate;
use crate::data_store::object_store::ObjectStore;
use crate::data_store::read_set::ReadSet;
use crate::data_store::write_set::WriteSet;
use crate::data_store::{Address, Value};
use crate::errors::{AbortReason, NorecError, Result};
use crate::stats::{CommitRecord, Stats};

/// Lifecycle of one transaction attempt.
///
/// `Committed` and `Aborted` are terminal for the attempt; calling
/// [`Transaction::begin`] starts a fresh attempt from either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    NotStarted,
    Running,
    /// Inside `commit`, trying to acquire the commit window.
    Validating,
    Committed,
    Aborted,
}

/// Result of a successful [`Transaction::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The write set was empty. Nothing was published and the clock did not
    /// move; the reads were consistent at `snapshot`.
    ReadOnly { snapshot: u64 },
    /// The write set was published.
    Written {
        /// Clock value observed by `begin`.
        start_snapshot: u64,
        /// Odd clock value held during write-back. The store is visible at
        /// `commit_version + 1` afterwards.
        commit_version: u64,
    },
}

/// A transaction context.
///
/// Owns the read set, the write set and the clock snapshot of the current
/// attempt. It belongs to the thread executing it and is never shared, so
/// none of its state needs synchronization; only the clock and the store it
/// points at are shared.
///
/// A context is reusable: [`begin`](Self::begin) discards whatever the
/// previous attempt left behind.
pub struct Transaction {
    clock: Arc<GlobalClock>,
    store: Arc<ObjectStore>,
    stats: Arc<Stats>,
    state: TxnState,
    /// Clock value observed by the last `begin`.
    start_snapshot: u64,
    /// Version the current reads are known to be consistent with.
    snapshot: u64,
    read_set: ReadSet,
    write_set: WriteSet,
}

impl Transaction {
    /// Creates an idle context. Call [`begin`](Self::begin) before using it.
    ///
    /// This is typically called internally by [`Norec`](crate::Norec), which
    /// hands out contexts that are already begun.
    pub fn new(clock: Arc<GlobalClock>, store: Arc<ObjectStore>, stats: Arc<Stats>) -> Self {
        Self {
            clock,
            store,
            stats,
            state: TxnState::NotStarted,
            start_snapshot: 0,
            snapshot: 0,
            read_set: ReadSet::new(),
            write_set: WriteSet::new(),
        }
    }

    pub fn state(&self) -> TxnState {
        self.state
    }

    /// The version this attempt's reads are currently consistent with.
    pub fn snapshot(&self) -> u64 {
        self.snapshot
    }

    pub fn read_set(&self) -> &ReadSet {
        &self.read_set
    }

    pub fn write_set(&self) -> &WriteSet {
        &self.write_set
    }

    /// Starts a new attempt.
    ///
    /// Clears the read and write sets unconditionally, then spins until the
    /// global clock is even and takes that value as the snapshot. Always
    /// succeeds.
    pub fn begin(&mut self) {
        self.read_set.clear();
        self.write_set.clear();
        self.snapshot = self.clock.wait_even();
        self.start_snapshot = self.snapshot;
        self.state = TxnState::Running;
        trace!("Transaction began at snapshot {}", self.snapshot);
    }

    /// Reads the value at `address`.
    ///
    /// A pending write to `address` in this attempt is returned as is, without
    /// touching the store or the read set. Otherwise the store value is read
    /// and, if any commit happened since the snapshot was taken, the whole
    /// read set is re-validated and the value re-read until it is consistent
    /// with everything read so far. The value is then logged in the read set.
    ///
    /// # Arguments
    ///
    /// * `address` - Index of the cell to read.
    ///
    /// # Returns
    ///
    /// The value of the cell as of this transaction's snapshot.
    ///
    /// # Errors
    ///
    /// * [`NorecError::Aborted`] if re-validation found a read that is no
    ///   longer current. The attempt is over; call `begin` and retry.
    /// * [`NorecError::AddressOutOfBounds`] if `address` names no cell.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ::norec::prelude::*;
    ///
    /// let stm = Norec::new(2, 100);
    /// let mut txn = stm.start_transaction();
    ///
    /// txn.write(0, 50).unwrap();
    /// assert_eq!(txn.read(0).unwrap(), 50);
    /// assert_eq!(txn.read(1).unwrap(), 100);
    /// ```
    pub fn read(&mut self, address: Address) -> Result<Value> {
        debug_assert_eq!(self.state, TxnState::Running, "read outside a running transaction");

        if let Some(value) = self.write_set.get(address) {
            return Ok(value);
        }

        let mut value = self.store.load(address)?;
        while self.snapshot != self.clock.now() {
            trace!(
                "Clock moved past snapshot {} while reading address {}",
                self.snapshot, address
            );
            self.snapshot = self.revalidate()?;
            value = self.store.load_unchecked(address);
        }

        self.read_set.record(address, value);
        Ok(value)
    }

    /// Buffers `value` for `address`.
    ///
    /// Nothing is visible to other transactions until a successful commit.
    /// Writing the same address again replaces the buffered value.
    ///
    /// # Errors
    ///
    /// Returns [`NorecError::AddressOutOfBounds`] if `address` names no cell.
    /// The write set is left untouched in that case.
    pub fn write(&mut self, address: Address, value: Value) -> Result<()> {
        debug_assert_eq!(self.state, TxnState::Running, "write outside a running transaction");
        self.store.check(address)?;
        self.write_set.insert(address, value);
        Ok(())
    }

    /// Attempts to commit the attempt.
    ///
    /// A read-only attempt commits without touching the clock. Otherwise the
    /// clock is moved from the snapshot to the next odd value with a CAS. If
    /// another committer got there first, the read set is re-validated to a
    /// fresh snapshot and the CAS is retried. Once the CAS succeeds the write
    /// set is written back and the clock is released to the next even value.
    ///
    /// # Returns
    ///
    /// A [`CommitOutcome`] describing what was published.
    ///
    /// # Errors
    ///
    /// Returns [`NorecError::Aborted`] if re-validation fails. Nothing was
    /// written; call `begin` and retry.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ::norec::prelude::*;
    ///
    /// let stm = Norec::new(2, 100);
    /// let mut txn = stm.start_transaction();
    ///
    /// let a = txn.read(0).unwrap();
    /// let b = txn.read(1).unwrap();
    /// txn.write(0, a - 50).unwrap();
    /// txn.write(1, b + 50).unwrap();
    ///
    /// match txn.commit() {
    ///     Ok(outcome) => println!("Committed: {:?}", outcome),
    ///     Err(e) if e.is_abort() => println!("Aborted, retry: {}", e),
    ///     Err(e) => eprintln!("Error during commit: {}", e),
    /// }
    /// ```
    pub fn commit(&mut self) -> Result<CommitOutcome> {
        debug_assert_eq!(self.state, TxnState::Running, "commit outside a running transaction");

        if self.write_set.is_empty() {
            self.state = TxnState::Committed;
            self.stats.record_read_only();
            trace!("Read-only transaction committed at {}", self.snapshot);
            return Ok(CommitOutcome::ReadOnly {
                snapshot: self.snapshot,
            });
        }

        self.state = TxnState::Validating;
        while !self.clock.try_acquire(self.snapshot) {
            trace!("Commit CAS lost at snapshot {}, revalidating", self.snapshot);
            self.snapshot = self.revalidate()?;
        }

        // Commit window: the clock is odd until `release`.
        self.write_set.write_back(&self.store);
        self.clock.release(self.snapshot);

        let commit_version = self.snapshot + 1;
        self.state = TxnState::Committed;
        debug!(
            "Transaction committed {} writes at version {} (began at {})",
            self.write_set.len(),
            commit_version,
            self.start_snapshot
        );

        let record = self.stats.records_history().then(|| {
            CommitRecord::new(
                self.start_snapshot,
                commit_version,
                self.read_set.iter(),
                self.write_set.iter(),
            )
        });
        self.stats.record_commit(record);

        Ok(CommitOutcome::Written {
            start_snapshot: self.start_snapshot,
            commit_version,
        })
    }

    /// Abandons the attempt and returns the abort signal to propagate.
    ///
    /// ```no_run
    /// use ::norec::prelude::*;
    ///
    /// let stm = Norec::new(2, 10);
    /// let mut txn = stm.start_transaction();
    /// if txn.read(0).unwrap() < 50 {
    ///     let err = txn.abort("insufficient funds");
    ///     assert!(err.is_abort());
    /// }
    /// ```
    pub fn abort(&mut self, reason: impl Into<String>) -> NorecError {
        let err = NorecError::Aborted(AbortReason::Explicit(reason.into()));
        self.mark_aborted(&err);
        err
    }

    /// Moves the attempt to `Aborted`, counting it once.
    pub(crate) fn mark_aborted(&mut self, err: &NorecError) {
        if self.state != TxnState::Aborted {
            self.state = TxnState::Aborted;
            self.stats.record_abort();
            debug!("Transaction aborted at snapshot {}: {}", self.snapshot, err);
        }
    }

    fn revalidate(&mut self) -> Result<u64> {
        match validate(&self.clock, &self.store, &self.read_set) {
            Ok(t) => Ok(t),
            Err(e) => {
                self.mark_aborted(&e);
                Err(e)
            }
        }
    }
}
