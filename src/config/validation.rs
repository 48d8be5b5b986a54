//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, statuses in range)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function over the config
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{FileConfig, LimitsConfig, ModuleConfig, TimeoutConfig};
use crate::http::response::StandardErrors;

/// One invalid setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a freshly parsed settings file.
pub fn validate_file_config(config: &FileConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_timeouts(&config.timeouts, "timeouts.request_secs", &mut errors);
    check_limits(&config.limits, &mut errors);
    check_errors(&config.errors, &mut errors);

    for (name, section) in &config.modules {
        if name.trim().is_empty() {
            errors.push(ValidationError::new("modules", "module name must not be empty"));
        }
        if section.request_secs == Some(0) {
            errors.push(ValidationError::new(
                format!("modules.{}.request_secs", name),
                "must be greater than 0",
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate resolved module settings.
pub fn validate_module_config(config: &ModuleConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "must not be empty"));
    }
    if config.host.trim().is_empty() {
        errors.push(ValidationError::new("host", "must not be empty"));
    }
    if config.api_key.is_empty() {
        errors.push(ValidationError::new("api_key", "must not be empty"));
    }
    check_timeouts(&config.timeouts, "timeouts.request_secs", &mut errors);
    check_limits(&config.limits, &mut errors);
    check_errors(&config.errors, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_timeouts(timeouts: &TimeoutConfig, field: &str, errors: &mut Vec<ValidationError>) {
    if timeouts.request_secs == 0 {
        errors.push(ValidationError::new(field, "must be greater than 0"));
    }
}

fn check_limits(limits: &LimitsConfig, errors: &mut Vec<ValidationError>) {
    if limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }
}

fn check_errors(standard: &StandardErrors, errors: &mut Vec<ValidationError>) {
    let entries = [
        ("errors.malformed_request", standard.malformed_request.status),
        ("errors.bad_response", standard.bad_response.status),
        ("errors.unresolved", standard.unresolved.status),
    ];
    for (field, status) in entries {
        if !(400..600).contains(&status) {
            errors.push(ValidationError::new(
                format!("{}.status", field),
                format!("{} is not an error status", status),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_violation() {
        let mut config = ModuleConfig::new("", 9000).with_api_key("");
        config.timeouts.request_secs = 0;
        config.errors.unresolved.status = 200;

        let errors = validate_module_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["name", "api_key", "timeouts.request_secs", "errors.unresolved.status"]
        );
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_file_config(&FileConfig::default()).is_ok());
        assert!(validate_module_config(&ModuleConfig::new("items", 0)).is_ok());
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = FileConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_file_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_file_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}
