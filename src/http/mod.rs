//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request ID, trace, timeout, body limit)
//!     → handlers.rs (path/body extraction, call staking service)
//!     → response.rs (JSON bodies, u128 as strings, errors as 500)
//!     → Send to client
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use handlers::AppState;
pub use response::ApiError;
pub use server::{build_router, ApiServer};
