//! Configuration schema definitions.
//!
//! This module defines the settings file structure and the resolved settings
//! of one module. File types derive Serde traits for deserialization from TOML.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::env::{env_var, EnvSource, API_KEY_SUFFIX, HOST_SUFFIX, MODULE_NAME_VAR, PORT_SUFFIX};
use crate::config::loader::ConfigError;
use crate::config::validation::validate_module_config;
use crate::http::response::StandardErrors;

/// Host used when nothing else names one.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Root of the settings file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FileConfig {
    /// Module name, if the file describes a single module.
    pub name: Option<String>,

    /// Bind host shared by all modules.
    pub host: Option<String>,

    /// Bind port shared by all modules.
    pub port: Option<u16>,

    /// Shared secret shared by all modules.
    pub api_key: Option<String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Process-wide standard errors.
    pub errors: StandardErrors,

    /// Per-module overrides, keyed by module name.
    pub modules: BTreeMap<String, ModuleSection>,
}

/// `[modules.<name>]` overrides.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ModuleSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub request_secs: Option<u64>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Explicit settings, e.g. from the command line. Highest precedence.
#[derive(Debug, Clone, Default)]
pub struct ModuleOptions {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
}

/// Resolved settings of one module.
#[derive(Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub api_key: String,
    /// The secret was generated because no source provided one.
    pub api_key_generated: bool,
    pub timeouts: TimeoutConfig,
    pub limits: LimitsConfig,
    pub errors: StandardErrors,
}

impl ModuleConfig {
    /// Defaults for `name` on `port`, with a freshly generated secret.
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: DEFAULT_HOST.to_string(),
            port,
            api_key: generate_api_key(),
            api_key_generated: true,
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            errors: StandardErrors::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self.api_key_generated = false;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.timeouts.request_secs = secs;
        self
    }

    pub fn with_errors(mut self, errors: StandardErrors) -> Self {
        self.errors = errors;
        self
    }

    /// `host:port` as handed to the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve settings from every source.
    ///
    /// Precedence: explicit options, environment, the `[modules.<name>]`
    /// section, the file top level, then defaults (a generated secret).
    pub fn resolve(
        file: &FileConfig,
        options: &ModuleOptions,
        env: &impl EnvSource,
    ) -> Result<Self, ConfigError> {
        let name = options
            .name
            .clone()
            .or_else(|| env.var(MODULE_NAME_VAR))
            .or_else(|| file.name.clone())
            .ok_or(ConfigError::MissingName)?;

        let default_section = ModuleSection::default();
        let section = file.modules.get(&name).unwrap_or(&default_section);

        let host = options
            .host
            .clone()
            .or_else(|| env.var(&env_var(&name, HOST_SUFFIX)))
            .or_else(|| section.host.clone())
            .or_else(|| file.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let env_port = match env.var(&env_var(&name, PORT_SUFFIX)) {
            Some(value) => Some(value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnv {
                var: env_var(&name, PORT_SUFFIX),
                value,
            })?),
            None => None,
        };
        let port = options
            .port
            .or(env_port)
            .or(section.port)
            .or(file.port)
            .ok_or_else(|| ConfigError::MissingPort(name.clone()))?;

        let explicit_key = options
            .api_key
            .clone()
            .or_else(|| env.var(&env_var(&name, API_KEY_SUFFIX)))
            .or_else(|| section.api_key.clone())
            .or_else(|| file.api_key.clone());
        let (api_key, api_key_generated) = match explicit_key {
            Some(key) => (key, false),
            None => (generate_api_key(), true),
        };

        let mut timeouts = file.timeouts.clone();
        if let Some(secs) = section.request_secs {
            timeouts.request_secs = secs;
        }

        let config = Self {
            name,
            host,
            port,
            api_key,
            api_key_generated,
            timeouts,
            limits: file.limits.clone(),
            errors: file.errors.clone(),
        };

        validate_module_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

impl fmt::Debug for ModuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key_generated", &self.api_key_generated)
            .field("timeouts", &self.timeouts)
            .field("limits", &self.limits)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

/// Random shared secret: 16 bytes as 32 lower-case hex chars.
pub fn generate_api_key() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn file() -> FileConfig {
        toml::from_str(
            r#"
            host = "127.0.0.1"
            port = 8000
            api_key = "shared"

            [modules.items]
            port = 9000
            request_secs = 5
            "#,
        )
        .unwrap()
    }

    #[test]
    fn generated_key_is_hex() {
        let key = generate_api_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(key, generate_api_key());
    }

    #[test]
    fn module_section_overrides_top_level() {
        let options = ModuleOptions {
            name: Some("items".into()),
            ..Default::default()
        };
        let config = ModuleConfig::resolve(&file(), &options, &env(&[])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.api_key, "shared");
        assert!(!config.api_key_generated);
        assert_eq!(config.timeouts.request_secs, 5);
    }

    #[test]
    fn env_beats_file_and_options_beat_env() {
        let vars = env(&[
            ("MODULE_NAME", "items"),
            ("ITEMS_PORT", "9100"),
            ("ITEMS_API_KEY", "from-env"),
        ]);
        let config = ModuleConfig::resolve(&file(), &ModuleOptions::default(), &vars).unwrap();
        assert_eq!(config.name, "items");
        assert_eq!(config.port, 9100);
        assert_eq!(config.api_key, "from-env");

        let options = ModuleOptions {
            port: Some(9200),
            api_key: Some("abc".into()),
            ..Default::default()
        };
        let config = ModuleConfig::resolve(&file(), &options, &vars).unwrap();
        assert_eq!(config.port, 9200);
        assert_eq!(config.api_key, "abc");
    }

    #[test]
    fn other_modules_inherit_top_level() {
        let options = ModuleOptions {
            name: Some("orders".into()),
            ..Default::default()
        };
        let config = ModuleConfig::resolve(&file(), &options, &env(&[])).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn missing_secret_is_generated() {
        let options = ModuleOptions {
            name: Some("items".into()),
            port: Some(9000),
            ..Default::default()
        };
        let config = ModuleConfig::resolve(&FileConfig::default(), &options, &env(&[])).unwrap();
        assert!(config.api_key_generated);
        assert_eq!(config.api_key.len(), 32);
        assert_eq!(config.host, DEFAULT_HOST);
    }

    #[test]
    fn missing_name_or_port() {
        let err = ModuleConfig::resolve(&FileConfig::default(), &ModuleOptions::default(), &env(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingName));

        let options = ModuleOptions {
            name: Some("items".into()),
            ..Default::default()
        };
        let err = ModuleConfig::resolve(&FileConfig::default(), &options, &env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPort(name) if name == "items"));
    }

    #[test]
    fn bad_env_port_is_reported() {
        let vars = env(&[("ITEMS_PORT", "ninety")]);
        let options = ModuleOptions {
            name: Some("items".into()),
            ..Default::default()
        };
        let err = ModuleConfig::resolve(&file(), &options, &vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var, .. } if var == "ITEMS_PORT"));
    }

    #[test]
    fn debug_hides_secret() {
        let config = ModuleConfig::new("items", 9000).with_api_key("abc-secret");
        assert!(!format!("{:?}", config).contains("abc-secret"));
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
    }
}
