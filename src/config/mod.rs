//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FileConfig
//!
//! FileConfig + environment (env.rs) + ModuleOptions
//!     → ModuleConfig::resolve (precedence merge)
//!     → validation.rs
//!     → ModuleConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once resolved; a module is restarted to change it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env::{EnvSource, ProcessEnv};
pub use loader::{load_config, ConfigError};
pub use schema::{
    generate_api_key, FileConfig, LimitsConfig, ModuleConfig, ModuleOptions, ModuleSection,
    ObservabilityConfig, TimeoutConfig,
};
pub use validation::ValidationError;
