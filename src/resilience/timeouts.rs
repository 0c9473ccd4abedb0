//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap chain calls with a deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from connection errors

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::chain::types::{ChainError, ChainResult};

/// Run `fut`, failing with [`ChainError::Timeout`] once `limit` elapses.
pub async fn with_timeout<T, F>(operation: &'static str, limit: Duration, fut: F) -> ChainResult<T>
where
    F: Future<Output = ChainResult<T>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_secs = limit.as_secs(), "Chain call timed out");
            Err(ChainError::Timeout {
                operation,
                secs: limit.as_secs(),
            })
        }
    }
}
