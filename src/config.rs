use std::hint;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::errors::{NorecError, Result};

/// What [`Norec::atomically`](crate::Norec::atomically) does between an
/// aborted attempt and the next `begin`.
///
/// The engine itself never backs off; this only shapes the caller-side retry
/// loop and has no effect on correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Retry immediately.
    #[default]
    Spin,
    /// Spin for `initial_spins` after the first abort, doubling up to
    /// `max_spins`. Once the cap is reached the thread also yields.
    ExponentialBackoff { initial_spins: u32, max_spins: u32 },
}

impl RetryPolicy {
    pub(crate) fn backoff(&self) -> Backoff {
        match *self {
            RetryPolicy::Spin => Backoff { next: 0, max: 0 },
            RetryPolicy::ExponentialBackoff {
                initial_spins,
                max_spins,
            } => Backoff {
                next: initial_spins,
                max: max_spins,
            },
        }
    }
}

/// Per-call backoff state derived from a [`RetryPolicy`].
#[derive(Debug)]
pub(crate) struct Backoff {
    next: u32,
    max: u32,
}

impl Backoff {
    pub(crate) fn pause(&mut self) {
        if self.max == 0 {
            return;
        }
        for _ in 0..self.next {
            hint::spin_loop();
        }
        if self.next >= self.max {
            thread::yield_now();
        } else {
            self.next = self.next.saturating_mul(2).min(self.max);
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NorecConfig {
    /// Pause policy between aborted attempts in `atomically`.
    pub retry: RetryPolicy,
    /// Give up after this many attempts. `None` retries forever.
    pub max_attempts: Option<u64>,
    /// Keep a [`CommitRecord`](crate::stats::CommitRecord) for every writing
    /// commit.
    pub record_history: bool,
}

impl NorecConfig {
    pub fn validate(&self) -> Result<()> {
        if let RetryPolicy::ExponentialBackoff {
            initial_spins,
            max_spins,
        } = self.retry
        {
            if initial_spins == 0 {
                return Err(NorecError::InvalidConfig(
                    "initial_spins must be greater than zero".to_string(),
                ));
            }
            if max_spins < initial_spins {
                return Err(NorecError::InvalidConfig(format!(
                    "max_spins ({}) is smaller than initial_spins ({})",
                    max_spins, initial_spins
                )));
            }
        }
        if self.max_attempts == Some(0) {
            return Err(NorecError::InvalidConfig(
                "max_attempts must allow at least one attempt".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_literal_contract() {
        let config = NorecConfig::default();
        assert_eq!(config.retry, RetryPolicy::Spin);
        assert_eq!(config.max_attempts, None);
        assert!(!config.record_history);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_backoff() {
        let config = NorecConfig {
            retry: RetryPolicy::ExponentialBackoff {
                initial_spins: 0,
                max_spins: 8,
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(NorecError::InvalidConfig(_))));

        let config = NorecConfig {
            retry: RetryPolicy::ExponentialBackoff {
                initial_spins: 16,
                max_spins: 8,
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(NorecError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_attempts() {
        let config = NorecConfig {
            max_attempts: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_from_json() {
        let config: NorecConfig = serde_json::from_str(
            r#"{"retry":{"kind":"exponential_backoff","initial_spins":4,"max_spins":64},"max_attempts":100}"#,
        )
        .unwrap();
        assert_eq!(
            config.retry,
            RetryPolicy::ExponentialBackoff {
                initial_spins: 4,
                max_spins: 64
            }
        );
        assert_eq!(config.max_attempts, Some(100));
        assert!(!config.record_history);

        let empty: NorecConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, NorecConfig::default());
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut backoff = RetryPolicy::ExponentialBackoff {
            initial_spins: 2,
            max_spins: 10,
        }
        .backoff();
        backoff.pause();
        assert_eq!(backoff.next, 4);
        backoff.pause();
        backoff.pause();
        assert_eq!(backoff.next, 10);
        backoff.pause();
        assert_eq!(backoff.next, 10);
    }
}
