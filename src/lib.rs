//! NOrec: Software Transactional Memory without ownership records.
//!
//! Transactions run optimistically over a fixed array of integer cells. The
//! only shared coordination state is one global sequence counter: readers
//! validate by value whenever the counter moved, and committers serialize
//! through a single compare-and-swap on it.
//!
//! ```no_run
//! use ::norec::prelude::*;
//!
//! let stm = Norec::new(2, 100);
//! stm.atomically(|txn| {
//!     let from = txn.read(0)?;
//!     let to = txn.read(1)?;
//!     txn.write(0, from - 50)?;
//!     txn.write(1, to + 50)
//! })
//! .unwrap();
//! assert_eq!(stm.total(), 200);
//! ```

pub mod bank;
pub mod clock;
pub mod config;
pub mod conflict;
pub mod data_store;
pub mod errors;
pub mod norec;
pub mod stats;
pub mod transaction;

// Re-export key types and structs for easier access
pub use crate::norec::{Norec, prelude};
pub use clock::GlobalClock;
pub use config::{NorecConfig, RetryPolicy};
pub use data_store::object_store::ObjectStore;
pub use data_store::{Address, Value};
pub use errors::{AbortReason, NorecError, Result};
pub use stats::{CommitRecord, StatsSnapshot};
pub use transaction::{CommitOutcome, Transaction, TxnState};
