//! Chain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Network name (from request path)
//!     → selector.rs (resolve client, fall back to default network)
//!     → client.rs (lazy connection, timeouts, one-shot reconnect)
//!     → values.rs (typed values out of dynamically decoded storage)
//!     → ChainSnapshot / DappInfo / DecodedCall (types.rs)
//! ```
//!
//! # Design Decisions
//! - Consumers depend on the `ChainApi` trait, never on `SubstrateClient`
//! - One client per network, created at startup and connected on first use
//! - Every RPC call has a deadline; submission has its own, longer one
//! - Connection errors are retried once after reconnecting, nothing else is

pub mod api;
pub mod client;
pub mod selector;
pub mod types;
pub mod values;

pub use api::ChainApi;
pub use client::SubstrateClient;
pub use selector::NetworkSelector;
pub use types::{
    ChainError, ChainResult, ChainSnapshot, ConnectionStatus, DappInfo, DappState, DecodedCall,
    SmartContract, Transaction, TransactionError,
};
