//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a chain node:
//!     → reconnect.rs (live connection or one serialized connect)
//!     → timeouts.rs (enforce per-call deadline)
//!     → On transport failure: reset that connection, reconnect once, retry once
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retry loops below the service boundary; callers retry at a higher layer

pub mod reconnect;
pub mod timeouts;

pub use reconnect::Reconnector;
pub use timeouts::with_timeout;
