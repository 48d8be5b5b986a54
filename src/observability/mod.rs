//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Binder, Auth Gate and lifecycle produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every event carries the module name as a field
//! - Request ID flows in through the HTTP layer stack
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
