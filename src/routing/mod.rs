//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at start):
//!     Protocol[] + HandlerMap
//!     → binder.rs (resolve endpoint per handler)
//!     → protocol::path (template → axum route variants)
//!     → endpoint.rs (freeze as Arc<CompiledEndpoint>)
//!     → axum Router + BindReport
//!
//! Incoming Request:
//!     axum route match
//!     → [Auth Gate if authorized]
//!     → binder.rs dispatch (params → handler task → response)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at start, immutable at runtime
//! - Deterministic: handlers bound in endpoint-name order
//! - Conflicts are skipped, never panicked on

pub mod binder;
pub mod endpoint;
pub mod handler;

pub use binder::{BindReport, BoundRoute, RouteBinder, SkipReason, SkippedHandler};
pub use endpoint::CompiledEndpoint;
pub use handler::{Handler, HandlerMap};
pub use crate::protocol::path;
pub use crate::protocol::path::{PathError, PathTemplate};
