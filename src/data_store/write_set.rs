use ahash::AHashMap as HashMap;

use crate::data_store::object_store::ObjectStore;
use crate::data_store::{Address, Value};

/// Pending writes of a transaction attempt, keyed by address.
///
/// Writing an address twice keeps only the latest value.
#[derive(Debug, Default, Clone)]
pub struct WriteSet {
    pending: HashMap<Address, Value>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: Address, value: Value) {
        self.pending.insert(address, value);
    }

    pub fn get(&self, address: Address) -> Option<Value> {
        self.pending.get(&address).copied()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Address, Value)> + '_ {
        self.pending.iter().map(|(a, v)| (*a, *v))
    }

    /// Writes every pending value back to the store. Must only run while the
    /// caller holds the commit window.
    pub(crate) fn write_back(&self, store: &ObjectStore) {
        for (address, value) in &self.pending {
            store.store(*address, *value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut ws = WriteSet::new();
        ws.insert(4, 1);
        ws.insert(4, 2);
        ws.insert(4, 3);
        assert_eq!(ws.len(), 1);
        assert_eq!(ws.get(4), Some(3));
        assert_eq!(ws.get(5), None);
    }

    #[test]
    fn write_back_applies_all() {
        let store = ObjectStore::new(3, 0);
        let mut ws = WriteSet::new();
        ws.insert(0, 7);
        ws.insert(2, 9);
        ws.write_back(&store);
        assert_eq!(store.copy_values(), vec![7, 0, 9]);
    }
}
