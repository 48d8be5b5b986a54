//! Protocol schema subsystem.
//!
//! # Data Flow
//! ```text
//! protocol file (JSON/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (path/param invariants, status ranges)
//!       using path.rs (template parsing)
//!     → Protocol (validated, immutable)
//!     → shared via Arc with the route binder
//! ```
//!
//! # Design Decisions
//! - One protocol per API domain, named after its file
//! - Protocols are data only; all behavior lives in routing/ and http/
//! - Message templates are rendered by template.rs at emission time

pub mod loader;
pub mod path;
pub mod schema;
pub mod template;
pub mod validation;

pub use loader::{load_protocol, parse_json, parse_toml, ProtocolCatalog, ProtocolError};
pub use path::{PathError, PathTemplate};
pub use schema::{
    canonical_key, BodyShape, EndpointSpec, ErrorSpec, HttpMethod, ParamSpec, Protocol, ResponseSpec,
    ShapeMismatch, SuccessSpec, Transport,
};
pub use validation::{validate_protocol, ValidationError};
