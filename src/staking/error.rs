//! Errors surfaced at the staking service boundary.

use thiserror::Error;

use crate::chain::{ChainError, TransactionError};
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum StakingError {
    /// Transport to the chain unavailable.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Data assembly or computation failed. The cause is logged, not exposed.
    #[error("Unable to calculate network {0}")]
    Calculation(&'static str),

    /// Actionable rejection, shown to the caller as is.
    #[error("{0}")]
    Validation(String),

    #[error("Network {0} is not supported")]
    UnsupportedNetwork(String),

    #[error("{0}")]
    Transaction(#[from] TransactionError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The detached registration task panicked.
    #[error("Registration task failed: {0}")]
    TaskFailed(String),
}

impl StakingError {
    /// Wrap a chain failure while computing `what`.
    ///
    /// Transport and transaction errors keep their class. Everything else
    /// becomes a generic calculation error.
    pub fn from_chain(what: &'static str, error: ChainError) -> Self {
        match error {
            ChainError::Connection(message) => StakingError::Connection(message),
            e @ ChainError::Timeout { .. } => StakingError::Timeout(e.to_string()),
            ChainError::Transaction(e) => StakingError::Transaction(e),
            ChainError::InvalidAddress(address) => {
                StakingError::Validation(format!("Invalid address: {}", address))
            }
            _ => StakingError::Calculation(what),
        }
    }
}

pub type StakingResult<T> = Result<T, StakingError>;
