use std::fmt;

use thiserror::Error;

/// Why a transaction attempt was abandoned.
///
/// Carried by [`NorecError::Aborted`] for diagnostics only; the retry loop
/// does not need to inspect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// A value recorded in the read set no longer matches the store.
    ReadSetInvalidated {
        /// First address found to have changed.
        address: usize,
    },
    /// The transaction body asked to abort.
    Explicit(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::ReadSetInvalidated { address } => {
                write!(f, "read set invalidated at address {}", address)
            }
            AbortReason::Explicit(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NorecError {
    #[error("Transaction aborted: {0}")]
    Aborted(AbortReason),

    #[error("Address {address} out of bounds for store of {len} cells")]
    AddressOutOfBounds { address: usize, len: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl NorecError {
    /// Returns `true` when this error is the abort signal, i.e. the attempt
    /// should be retried from `begin`.
    pub fn is_abort(&self) -> bool {
        matches!(self, NorecError::Aborted(_))
    }
}

pub type Result<T> = std::result::Result<T, NorecError>;
