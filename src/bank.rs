//! Bank-account transfer workload.
//!
//! Every account starts with the same balance; each transaction moves a fixed
//! amount between randomly chosen pairs of distinct accounts, so the sum over
//! all accounts is invariant. Used by the `norec-bank` binary and the
//! conservation tests.

use std::ops::Range;
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data_store::{Address, Value};
use crate::errors::{NorecError, Result};
use crate::norec::Norec;
use crate::transaction::Transaction;

pub const TRANSFER_AMOUNT: Value = 50;
pub const INITIAL_BALANCE: Value = 1000;
pub const TRANSFERS_PER_TXN: usize = 10;
/// Thread counts accepted by the command-line driver.
pub const ALLOWED_THREADS: [usize; 3] = [1, 2, 4];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    pub accounts: usize,
    /// Transactions across all threads; each thread runs
    /// `transactions / threads`.
    pub transactions: usize,
    pub threads: usize,
    pub transfer_amount: Value,
    pub initial_balance: Value,
    pub transfers_per_txn: usize,
    /// Give each thread its own slice of accounts so that no two threads
    /// ever touch the same cell.
    pub disjoint: bool,
    pub seed: u64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            accounts: 1_000_000,
            transactions: 100_000,
            threads: 1,
            transfer_amount: TRANSFER_AMOUNT,
            initial_balance: INITIAL_BALANCE,
            transfers_per_txn: TRANSFERS_PER_TXN,
            disjoint: false,
            seed: 0,
        }
    }
}

impl BankConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(NorecError::InvalidConfig("threads must be at least 1".to_string()));
        }
        let per_thread = if self.disjoint {
            self.accounts / self.threads
        } else {
            self.accounts
        };
        if per_thread < 2 {
            return Err(NorecError::InvalidConfig(format!(
                "{} accounts cannot hold distinct transfer pairs for {} threads",
                self.accounts, self.threads
            )));
        }
        if self.transfer_amount < 0 {
            return Err(NorecError::InvalidConfig(
                "transfer_amount must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Accounts that thread `tid` draws from.
    fn range_for(&self, tid: usize) -> Range<Address> {
        if self.disjoint {
            let width = self.accounts / self.threads;
            tid * width..(tid + 1) * width
        } else {
            0..self.accounts
        }
    }
}

/// Outcome of [`run_bank`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankReport {
    pub threads: usize,
    pub transactions: usize,
    pub elapsed: Duration,
    pub total_before: i128,
    pub total_after: i128,
    pub commits: u64,
    pub read_only_commits: u64,
    pub aborts: u64,
}

impl BankReport {
    pub fn is_conserved(&self) -> bool {
        self.total_before == self.total_after
    }
}

/// Applies a sequence of transfers inside one transaction.
///
/// Stops at the first transfer whose source cannot cover `amount`; the
/// transfers before it still commit with the transaction.
pub fn transfer_batch(
    txn: &mut Transaction,
    pairs: &[(Address, Address)],
    amount: Value,
) -> Result<()> {
    for &(from, to) in pairs {
        let source = txn.read(from)?;
        if source < amount {
            break;
        }
        let target = txn.read(to)?;
        txn.write(from, source - amount)?;
        txn.write(to, target + amount)?;
    }
    Ok(())
}

/// Draws `count` pairs of distinct accounts from `range`.
///
/// # Panics
///
/// Panics if `range` holds fewer than two accounts.
pub fn pick_pairs<R: Rng>(
    rng: &mut R,
    range: Range<Address>,
    count: usize,
) -> Vec<(Address, Address)> {
    assert!(range.len() >= 2, "cannot draw distinct pairs from {:?}", range);
    (0..count)
        .map(|_| loop {
            let from = rng.random_range(range.clone());
            let to = rng.random_range(range.clone());
            if from != to {
                break (from, to);
            }
        })
        .collect()
}

/// Runs the workload on `stm` and reports timing and the conservation check.
///
/// Worker threads are released together by a barrier. The pairs of one
/// logical transaction are drawn before its first attempt, so a retry replays
/// the same transfers.
///
/// # Errors
///
/// Returns [`NorecError::InvalidConfig`] if `config` does not validate or does
/// not fit the store, or the first non-abort error raised by a worker.
pub fn run_bank(stm: &Norec, config: &BankConfig) -> Result<BankReport> {
    config.validate()?;
    if config.accounts > stm.len() {
        return Err(NorecError::InvalidConfig(format!(
            "{} accounts requested but the store holds {}",
            config.accounts,
            stm.len()
        )));
    }

    let total_before = stm.total();
    let stats_before = stm.stats();
    let per_thread = config.transactions / config.threads;
    let barrier = Barrier::new(config.threads);

    let start = Instant::now();
    let results: Vec<Result<()>> = thread::scope(|s| {
        let handles: Vec<_> = (0..config.threads)
            .map(|tid| {
                let barrier = &barrier;
                s.spawn(move || -> Result<()> {
                    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tid as u64));
                    let range = config.range_for(tid);
                    barrier.wait();
                    for i in 0..per_thread {
                        let pairs = pick_pairs(&mut rng, range.clone(), config.transfers_per_txn);
                        stm.atomically(|txn| transfer_batch(txn, &pairs, config.transfer_amount))?;
                        debug!("Thread {} finished transaction {}", tid, i + 1);
                    }
                    Ok(())
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });
    let elapsed = start.elapsed();
    results.into_iter().collect::<Result<Vec<()>>>()?;

    let stats_after = stm.stats();
    Ok(BankReport {
        threads: config.threads,
        transactions: per_thread * config.threads,
        elapsed,
        total_before,
        total_after: stm.total(),
        commits: stats_after.commits - stats_before.commits,
        read_only_commits: stats_after.read_only_commits - stats_before.read_only_commits,
        aborts: stats_after.aborts - stats_before.aborts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_distinct_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for (from, to) in pick_pairs(&mut rng, 10..13, 200) {
            assert_ne!(from, to);
            assert!((10..13).contains(&from));
            assert!((10..13).contains(&to));
        }
    }

    #[test]
    #[should_panic(expected = "cannot draw distinct pairs")]
    fn single_account_range_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        pick_pairs(&mut rng, 5..6, 1);
    }

    #[test]
    fn disjoint_ranges_do_not_overlap() {
        let config = BankConfig {
            accounts: 1000,
            threads: 4,
            disjoint: true,
            ..Default::default()
        };
        assert_eq!(config.range_for(0), 0..250);
        assert_eq!(config.range_for(3), 750..1000);
    }

    #[test]
    fn rejects_unusable_configs() {
        let too_small = BankConfig {
            accounts: 3,
            threads: 2,
            disjoint: true,
            ..Default::default()
        };
        assert!(too_small.validate().is_err());

        let no_threads = BankConfig {
            threads: 0,
            ..Default::default()
        };
        assert!(no_threads.validate().is_err());
    }

    #[test]
    fn insufficient_source_stops_the_batch() {
        let stm = Norec::new(3, 60);
        stm.atomically(|txn| transfer_batch(txn, &[(0, 1), (0, 2), (1, 2)], 50))
            .unwrap();
        // (0,1) moves 50; (0,2) finds 10 < 50 and ends the batch.
        assert_eq!(stm.snapshot(), vec![10, 110, 60]);
    }

    #[test]
    fn store_smaller_than_config_is_rejected() {
        let stm = Norec::new(10, INITIAL_BALANCE);
        let config = BankConfig {
            accounts: 100,
            transactions: 10,
            ..Default::default()
        };
        assert!(matches!(run_bank(&stm, &config), Err(NorecError::InvalidConfig(_))));
    }
}
