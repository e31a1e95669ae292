use std::sync::atomic::{AtomicI64, Ordering};

use crate::data_store::{Address, Value};
use crate::errors::{NorecError, Result};

/// A fixed-size array of mutable cells, indexed by address.
///
/// Cells carry no per-object metadata: no versions, no locks. Consistency of
/// what a reader sees is established solely through the
/// [`GlobalClock`](crate::clock::GlobalClock). Cells are atomics so that a
/// racing load during a commit window is well defined; it may be stale but is
/// never torn, and validation throws it away.
#[derive(Debug)]
pub struct ObjectStore {
    cells: Box<[AtomicI64]>,
}

impl ObjectStore {
    /// Creates a store of `len` cells, all holding `initial`.
    pub fn new(len: usize, initial: Value) -> Self {
        Self {
            cells: (0..len).map(|_| AtomicI64::new(initial)).collect(),
        }
    }

    /// Creates a store whose cell `i` holds `values[i]`.
    pub fn from_values(values: &[Value]) -> Self {
        Self {
            cells: values.iter().map(|v| AtomicI64::new(*v)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns an error if `address` does not name a cell.
    #[inline]
    pub fn check(&self, address: Address) -> Result<()> {
        if address < self.cells.len() {
            Ok(())
        } else {
            Err(NorecError::AddressOutOfBounds {
                address,
                len: self.cells.len(),
            })
        }
    }

    /// Loads the current value of a cell.
    ///
    /// `Acquire` keeps the caller's following clock read from being hoisted
    /// above this load.
    #[inline]
    pub fn load(&self, address: Address) -> Result<Value> {
        self.check(address)?;
        Ok(self.cells[address].load(Ordering::Acquire))
    }

    /// Loads an address already known to be in bounds.
    #[inline]
    pub(crate) fn load_unchecked(&self, address: Address) -> Value {
        self.cells[address].load(Ordering::Acquire)
    }

    /// Overwrites a cell. Only called from inside a commit window.
    #[inline]
    pub(crate) fn store(&self, address: Address, value: Value) {
        self.cells[address].store(value, Ordering::Release);
    }

    /// Copies every cell. Not consistent on its own; callers bracket it with
    /// clock reads.
    pub(crate) fn copy_values(&self) -> Vec<Value> {
        self.cells.iter().map(|c| c.load(Ordering::Acquire)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_is_uniform() {
        let store = ObjectStore::new(4, 1000);
        assert_eq!(store.len(), 4);
        assert!(!store.is_empty());
        for addr in 0..4 {
            assert_eq!(store.load(addr).unwrap(), 1000);
        }
    }

    #[test]
    fn out_of_bounds_is_reported() {
        let store = ObjectStore::from_values(&[1, 2]);
        assert_eq!(
            store.load(2),
            Err(NorecError::AddressOutOfBounds { address: 2, len: 2 })
        );
        assert!(store.check(1).is_ok());
    }

    #[test]
    fn store_then_load() {
        let store = ObjectStore::from_values(&[5, 6, 7]);
        store.store(1, 60);
        assert_eq!(store.copy_values(), vec![5, 60, 7]);
    }
}
