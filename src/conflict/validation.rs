use std::hint;

use log::trace;

use crate::clock::GlobalClock;
use crate::data_store::object_store::ObjectStore;
use crate::data_store::read_set::ReadSet;
use crate::errors::{AbortReason, NorecError, Result};

/// Value-based validation of a read set against the store.
///
/// Waits until no commit is in flight, then checks every read-set entry
/// against the store. If the clock did not move during the scan, the whole
/// read set is consistent with that clock value and it is returned as the
/// transaction's refreshed snapshot. If the clock moved, the scan is repeated
/// against the new version.
///
/// # Errors
///
/// Returns [`NorecError::Aborted`] with
/// [`AbortReason::ReadSetInvalidated`] as soon as one entry no longer matches.
pub fn validate(clock: &GlobalClock, store: &ObjectStore, read_set: &ReadSet) -> Result<u64> {
    loop {
        let t = clock.now();
        if GlobalClock::is_locked(t) {
            hint::spin_loop();
            continue;
        }

        if let Some(entry) = read_set.first_mismatch(store) {
            trace!(
                "Validation at {} failed: address {} changed from {}",
                t, entry.address, entry.value
            );
            return Err(NorecError::Aborted(AbortReason::ReadSetInvalidated {
                address: entry.address,
            }));
        }

        if clock.now() == t {
            return Ok(t);
        }
        trace!("Clock moved during validation at {}, rescanning", t);
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    /// Runs `validate` on another thread while this thread holds the commit
    /// window, writes `address` and then releases the window.
    fn validate_across_commit(address: usize, value: i64) -> Result<u64> {
        let clock = GlobalClock::new();
        let store = ObjectStore::from_values(&[10, 20]);
        let mut rs = ReadSet::new();
        rs.record(0, 10);

        assert!(clock.try_acquire(0));
        thread::scope(|s| {
            let validator = s.spawn(|| validate(&clock, &store, &rs));
            thread::sleep(Duration::from_millis(20));
            assert!(!validator.is_finished(), "validation ran during the commit window");
            store.store(address, value);
            clock.release(0);
            validator.join().unwrap()
        })
    }

    #[test]
    fn waits_out_commit_window_then_succeeds() {
        assert_eq!(validate_across_commit(1, 25), Ok(2));
    }

    #[test]
    fn waits_out_commit_window_then_aborts() {
        assert_eq!(
            validate_across_commit(0, 11),
            Err(NorecError::Aborted(AbortReason::ReadSetInvalidated { address: 0 }))
        );
    }

    #[test]
    fn empty_read_set_returns_current_even_clock() {
        let clock = GlobalClock::new();
        let store = ObjectStore::new(2, 0);
        assert!(clock.try_acquire(0));
        clock.release(0);
        assert_eq!(validate(&clock, &store, &ReadSet::new()), Ok(2));
    }

    #[test]
    fn unchanged_values_survive_unrelated_commits() {
        let clock = GlobalClock::new();
        let store = ObjectStore::from_values(&[10, 20]);
        let mut rs = ReadSet::new();
        rs.record(0, 10);

        // A commit touching only cell 1.
        assert!(clock.try_acquire(0));
        store.store(1, 25);
        clock.release(0);

        assert_eq!(validate(&clock, &store, &rs), Ok(2));
    }

    #[test]
    fn changed_value_aborts() {
        let clock = GlobalClock::new();
        let store = ObjectStore::from_values(&[10, 20]);
        let mut rs = ReadSet::new();
        rs.record(1, 20);
        rs.record(0, 10);

        assert!(clock.try_acquire(0));
        store.store(0, 5);
        clock.release(0);

        assert_eq!(
            validate(&clock, &store, &rs),
            Err(NorecError::Aborted(AbortReason::ReadSetInvalidated { address: 0 }))
        );
    }

    #[test]
    fn same_value_written_back_is_still_valid() {
        let clock = GlobalClock::new();
        let store = ObjectStore::from_values(&[10]);
        let mut rs = ReadSet::new();
        rs.record(0, 10);

        assert!(clock.try_acquire(0));
        store.store(0, 11);
        clock.release(0);
        assert!(clock.try_acquire(2));
        store.store(0, 10);
        clock.release(2);

        assert_eq!(validate(&clock, &store, &rs), Ok(4));
    }
}
