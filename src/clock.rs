use std::hint;
use std::sync::atomic::{AtomicU64, Ordering};

/// The global sequence lock.
///
/// A single counter shared by every transaction. An even value means no
/// commit is in flight and the store reflects exactly that version; an odd
/// value means a committer is writing back its write set. The counter only
/// ever increases, by one on `try_acquire` and by one more on `release`.
///
/// Loads are `Acquire` and the publishing store is `Release`, so a thread
/// that observes a new even value also observes every cell written in the
/// commit window that produced it. The acquiring CAS is `SeqCst`.
#[derive(Debug, Default)]
pub struct GlobalClock {
    seq: AtomicU64,
}

impl GlobalClock {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
        }
    }

    /// Reads the current clock value.
    #[inline]
    pub fn now(&self) -> u64 {
        self.seq.load(Ordering::Acquire)
    }

    /// Returns `true` if `version` denotes a commit in progress.
    #[inline]
    pub fn is_locked(version: u64) -> bool {
        version & 1 != 0
    }

    /// Spins until the clock is observed even and returns that value.
    ///
    /// Never blocks on the committer; it only waits out the commit window.
    pub fn wait_even(&self) -> u64 {
        loop {
            let t = self.now();
            if !Self::is_locked(t) {
                return t;
            }
            hint::spin_loop();
        }
    }

    /// Tries to open the commit window by moving the clock from `snapshot`
    /// to `snapshot + 1`.
    ///
    /// Exactly one thread can succeed for a given even `snapshot`.
    #[inline]
    pub fn try_acquire(&self, snapshot: u64) -> bool {
        debug_assert!(!Self::is_locked(snapshot));
        self.seq
            .compare_exchange(snapshot, snapshot + 1, Ordering::SeqCst, Ordering::Acquire)
            .is_ok()
    }

    /// Closes the commit window opened by a successful
    /// [`try_acquire`](Self::try_acquire) for `snapshot`, publishing
    /// `snapshot + 2`.
    ///
    /// Only the thread holding the window may call this.
    #[inline]
    pub fn release(&self, snapshot: u64) {
        debug_assert_eq!(self.seq.load(Ordering::Relaxed), snapshot + 1);
        self.seq.store(snapshot + 2, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_even_at_zero() {
        let clock = GlobalClock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.wait_even(), 0);
    }

    #[test]
    fn acquire_release_advances_by_two() {
        let clock = GlobalClock::new();
        assert!(clock.try_acquire(0));
        assert!(GlobalClock::is_locked(clock.now()));
        clock.release(0);
        assert_eq!(clock.now(), 2);
    }

    #[test]
    fn stale_snapshot_cannot_acquire() {
        let clock = GlobalClock::new();
        assert!(clock.try_acquire(0));
        clock.release(0);
        assert!(!clock.try_acquire(0));
        assert_eq!(clock.now(), 2);
        assert!(clock.try_acquire(2));
        assert!(!clock.try_acquire(2));
        clock.release(2);
        assert_eq!(clock.now(), 4);
    }

    #[test]
    fn wait_even_outlasts_commit_window() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let clock = Arc::new(GlobalClock::new());
        assert!(clock.try_acquire(0));

        let waiter = {
            let clock = Arc::clone(&clock);
            thread::spawn(move || clock.wait_even())
        };

        thread::sleep(Duration::from_millis(20));
        clock.release(0);
        assert_eq!(waiter.join().unwrap(), 2);
    }
}
