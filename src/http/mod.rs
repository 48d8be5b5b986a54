//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout, body limit)
//!     → auth.rs (Auth Gate, authorized endpoints only)
//!     → params.rs (extract, normalize, validate)
//!     → context.rs (RequestContext handed to the business handler)
//!     → response.rs (success body or { type, error } envelope)
//!     → Send to client
//! ```

pub mod auth;
pub mod context;
pub mod params;
pub mod response;
pub mod server;

pub use auth::AuthGate;
pub use context::RequestContext;
pub use params::Params;
pub use response::{StandardError, StandardErrors};
pub use server::HttpServer;
