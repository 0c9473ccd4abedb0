//! Dapp registry subsystem.
//!
//! # Data Flow
//! ```text
//! Approved registration (staking service)
//!     → DappRegistry::put (keyed by network + address)
//!     → store.rs (concurrent map, saved to JSON after each put)
//!
//! Dapp lookup (HTTP)
//!     → DappRegistry::get
//! ```

pub mod store;
pub mod types;

pub use store::InMemoryDappRegistry;
pub use types::{DappItem, DappRecord, Developer, RegistryError, RegistryResult};

use crate::config::NetworkName;

/// Storage capability for dapp metadata.
#[trait_variant::make(Send)]
pub trait DappRegistry
where
    Self: Send + Sync + 'static,
{
    async fn get(&self, address: &str, network: NetworkName) -> RegistryResult<Option<DappRecord>>;

    /// Store `item` under `network`, replacing any previous record.
    async fn put(&self, item: DappItem, network: NetworkName) -> RegistryResult<DappRecord>;
}
