//! Protocol-driven module library.
//!
//! A module serves one or more declarative protocols: each endpoint's path,
//! method, params and response contract come from a protocol file, and only
//! the business handlers are written by hand.

// Core subsystems
pub mod config;
pub mod http;
pub mod protocol;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub mod echo;

pub use config::{FileConfig, ModuleConfig, ModuleOptions};
pub use http::{AuthGate, Params, RequestContext};
pub use lifecycle::{BackgroundTask, BoxError, Module, ModuleBuilder, ModuleError, ModuleEvent, ModuleState};
pub use protocol::{Protocol, ProtocolCatalog};
pub use routing::{BindReport, Handler, HandlerMap};
