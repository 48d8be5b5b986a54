//! Environment variable source.
//!
//! Variables are scoped by module: a module named `item-store` reads
//! `ITEM_STORE_HOST`, `ITEM_STORE_PORT` and `ITEM_STORE_API_KEY`. Empty
//! values count as unset.

use std::collections::HashMap;

/// Names the module when no explicit name is given.
pub const MODULE_NAME_VAR: &str = "MODULE_NAME";
pub const HOST_SUFFIX: &str = "HOST";
pub const PORT_SUFFIX: &str = "PORT";
pub const API_KEY_SUFFIX: &str = "API_KEY";

/// Read access to environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|value| !value.is_empty()).cloned()
    }
}

/// Module name upper-cased, every non-alphanumeric char replaced by `_`.
pub fn env_prefix(module: &str) -> String {
    module
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Full variable name, e.g. `ITEMS_PORT`.
pub fn env_var(module: &str, suffix: &str) -> String {
    format!("{}_{}", env_prefix(module), suffix)
}
