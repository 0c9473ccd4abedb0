//! Read-only staking statistics API for Astar-family networks.
//!
//! # Architecture Overview
//!
//! ```text
//!     HTTP request
//!         → http (router, middleware, handlers)
//!         → staking (APR/APY engine, registration flows)
//!         → chain (network selector → Substrate RPC client)
//!         → registry (dapp metadata store)
//!
//!     Cross-cutting: config, observability, resilience, lifecycle
//! ```

// Core subsystems
pub mod chain;
pub mod config;
pub mod http;
pub mod registry;
pub mod staking;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ApiConfig;
pub use http::ApiServer;
pub use lifecycle::Shutdown;
