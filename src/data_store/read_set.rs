use crate::data_store::object_store::ObjectStore;
use crate::data_store::{Address, Value};

/// One observation made by a transaction: the value it saw at an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadEntry {
    pub address: Address,
    pub value: Value,
}

/// Append-only log of the values a transaction attempt has read, kept in
/// read order.
///
/// Validation is value-based: an entry is still valid as long as the store
/// holds the same value, regardless of how many commits happened in between.
#[derive(Debug, Default, Clone)]
pub struct ReadSet {
    entries: Vec<ReadEntry>,
}

impl ReadSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, address: Address, value: Value) {
        self.entries.push(ReadEntry { address, value });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReadEntry> {
        self.entries.iter()
    }

    /// Returns the first entry whose recorded value differs from the store,
    /// scanning in read order.
    pub(crate) fn first_mismatch(&self, store: &ObjectStore) -> Option<&ReadEntry> {
        self.entries
            .iter()
            .find(|entry| store.load_unchecked(entry.address) != entry.value)
    }
}
