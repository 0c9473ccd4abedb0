//! Staking subsystem.
//!
//! # Data Flow
//! ```text
//! Network name
//!     → service.rs (resolve client, fetch snapshot + TVL concurrently)
//!     → apr.rs (pure APR / APY / ETA math)
//!     → caller
//!
//! Registration request
//!     → registration.rs (signature or submission flow, chosen per network)
//!     → signature.rs (sr25519 / ed25519 / ecdsa)
//!     → registry (only on Approved)
//! ```
//!
//! # Design Decisions
//! - Chain errors are rewrapped here; nothing below leaks to callers
//! - APR/APY failures surface as one generic error, the cause is logged

pub mod apr;
pub mod error;
pub mod registration;
pub mod service;
pub mod signature;

pub use error::{StakingError, StakingResult};
pub use registration::{
    RegistrationFlow, RegistrationRequest, RegistrationState, RegistrationStrategy,
    SignatureRegistration, SubmissionRegistration,
};
pub use service::{EraEta, StakingService, TokenStats, TvlInfo};
