//! Protocol validation.
//!
//! # Responsibilities
//! - Check every endpoint's path template against its declared params
//! - Reject params whose names collide once normalized (`userId` / `user_id`)
//! - Check declared status codes are usable for their role
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: Protocol → Result<(), Vec<ValidationError>>
//! - Runs at load time so the binder only sees well-formed endpoints

use std::collections::HashMap;
use std::fmt;

use crate::protocol::path::PathTemplate;
use crate::protocol::schema::{canonical_key, EndpointSpec, Protocol};

/// A single problem found in a protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub endpoint: String,
    pub message: String,
}

impl ValidationError {
    fn new(endpoint: &str, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.message)
    }
}

/// Validate every endpoint of a protocol.
pub fn validate_protocol(protocol: &Protocol) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    for (name, spec) in protocol.endpoints() {
        validate_endpoint(name, spec, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_endpoint(name: &str, spec: &EndpointSpec, errors: &mut Vec<ValidationError>) {
    if name.trim().is_empty() {
        errors.push(ValidationError::new(name, "endpoint name must not be empty"));
    }

    match PathTemplate::parse(&spec.path) {
        Ok(template) => {
            if let Err(e) = template.check_params(&spec.params) {
                errors.push(ValidationError::new(name, e.to_string()));
            }
            if let Err(e) = template.routes(&spec.params) {
                errors.push(ValidationError::new(name, e.to_string()));
            }
        }
        Err(e) => errors.push(ValidationError::new(name, e.to_string())),
    }

    let mut canonical: HashMap<String, &str> = HashMap::new();
    for param in spec.params.keys() {
        if let Some(first) = canonical.insert(canonical_key(param), param) {
            errors.push(ValidationError::new(
                name,
                format!("params '{}' and '{}' collide once normalized", first, param),
            ));
        }
    }

    let success = spec.response.success.status;
    if !(200..400).contains(&success) {
        errors.push(ValidationError::new(
            name,
            format!("success status {} is outside 200-399", success),
        ));
    }

    for (error_name, error) in &spec.response.error {
        if error_name.trim().is_empty() {
            errors.push(ValidationError::new(name, "error name must not be empty"));
        }
        if !(400..600).contains(&error.status) {
            errors.push(ValidationError::new(
                name,
                format!("error '{}' status {} is outside 400-599", error_name, error.status),
            ));
        }
    }
}
