//! Protocol loading from disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::protocol::schema::{EndpointSpec, Protocol};
use crate::protocol::validation::{validate_protocol, ValidationError};

/// Error type for protocol loading.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in protocol {name}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML in protocol {name}: {source}")]
    Toml {
        name: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported protocol file: {0} (expected .json or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("protocol {name} failed validation: {}", join_errors(.errors))]
    Invalid {
        name: String,
        errors: Vec<ValidationError>,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn validated(name: &str, endpoints: BTreeMap<String, EndpointSpec>) -> Result<Protocol, ProtocolError> {
    let protocol = Protocol::new(name, endpoints);
    validate_protocol(&protocol).map_err(|errors| ProtocolError::Invalid {
        name: name.to_string(),
        errors,
    })?;
    Ok(protocol)
}

/// Parse and validate a protocol from JSON text.
pub fn parse_json(name: &str, content: &str) -> Result<Protocol, ProtocolError> {
    let endpoints = serde_json::from_str(content).map_err(|source| ProtocolError::Json {
        name: name.to_string(),
        source,
    })?;
    validated(name, endpoints)
}

/// Parse and validate a protocol from TOML text.
pub fn parse_toml(name: &str, content: &str) -> Result<Protocol, ProtocolError> {
    let endpoints = toml::from_str(content).map_err(|source| ProtocolError::Toml {
        name: name.to_string(),
        source,
    })?;
    validated(name, endpoints)
}

/// Load a protocol file. The protocol is named after the file stem.
pub fn load_protocol(path: &Path) -> Result<Protocol, ProtocolError> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ProtocolError::UnsupportedFormat(path.to_path_buf()))?;

    let content = fs::read_to_string(path).map_err(|source| ProtocolError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json(name, &content),
        Some("toml") => parse_toml(name, &content),
        _ => Err(ProtocolError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Named protocols available to the process, one per API domain.
#[derive(Debug, Clone, Default)]
pub struct ProtocolCatalog {
    protocols: BTreeMap<String, Arc<Protocol>>,
}

impl ProtocolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.json` and `.toml` file in `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, ProtocolError> {
        let entries = fs::read_dir(dir).map_err(|source| ProtocolError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut catalog = Self::new();
        for entry in entries {
            let path = entry
                .map_err(|source| ProtocolError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();
            let supported = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json") | Some("toml")
            );
            if path.is_file() && supported {
                let protocol = load_protocol(&path)?;
                tracing::debug!(
                    protocol = %protocol.name(),
                    endpoints = protocol.len(),
                    "Protocol loaded"
                );
                catalog.insert(protocol);
            }
        }
        Ok(catalog)
    }

    /// Add a protocol, replacing any protocol with the same name.
    pub fn insert(&mut self, protocol: Protocol) {
        self.protocols
            .insert(protocol.name().to_string(), Arc::new(protocol));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Protocol>> {
        self.protocols.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }
}
