//! Common utilities for NOrec integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use norec::{Address, CommitRecord, Norec, NorecConfig, Value};

/// Helper function to create a shared engine, optionally recording commits.
pub fn setup_norec(cells: usize, initial: Value, record_history: bool) -> Arc<Norec> {
    let config = NorecConfig {
        record_history,
        ..Default::default()
    };
    Arc::new(Norec::with_config(cells, initial, config).unwrap())
}

/// Sequential reference for `norec::bank::transfer_batch`.
pub fn apply_transfers(model: &mut [Value], pairs: &[(Address, Address)], amount: Value) {
    for &(from, to) in pairs {
        if model[from] < amount {
            break;
        }
        model[from] -= amount;
        model[to] += amount;
    }
}

/// Replays recorded commits one at a time in version order.
///
/// Panics if a commit depended on a value that the serial order does not
/// produce at that point. Returns the final state.
pub fn replay_history(initial: &[Value], history: &[CommitRecord]) -> Vec<Value> {
    let mut state = initial.to_vec();
    let mut last_version = None;
    for record in history {
        assert_eq!(record.commit_version % 2, 1, "commit version must be odd");
        assert!(record.start_snapshot < record.commit_version);
        if let Some(prev) = last_version {
            assert!(record.commit_version > prev, "duplicate commit version");
        }
        last_version = Some(record.commit_version);

        for &(address, value) in &record.reads {
            assert_eq!(
                state[address], value,
                "commit {} read a value no serial order produces at address {}",
                record.commit_version, address
            );
        }
        for &(address, value) in &record.writes {
            state[address] = value;
        }
    }
    state
}
