/// The shared, addressable cells every transaction operates on.
pub mod object_store;
/// Per-attempt log of values observed by a transaction.
pub mod read_set;
/// Per-attempt buffer of pending writes.
pub mod write_set;

/// Index of a cell in the [`object_store::ObjectStore`].
pub type Address = usize;

/// The scalar held by every cell.
pub type Value = i64;
