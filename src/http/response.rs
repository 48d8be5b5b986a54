//! Response construction.
//!
//! # Responsibilities
//! - Build the JSON error envelope `{ "type": name, "error": message }`
//! - Build success responses (bare status or JSON body)
//! - Hold the process-wide standard errors (malformed request, bad response,
//!   unresolved request)
//!
//! # Design Decisions
//! - Error bodies carry only the rendered template, never internal detail
//! - Invalid status codes degrade to 500 instead of panicking

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::protocol::template;

/// Envelope `type` of the malformed-request error.
pub const MALFORMED_REQUEST: &str = "malformedRequest";
/// Envelope `type` of the bad-response error.
pub const BAD_RESPONSE: &str = "badResponse";
/// Envelope `type` sent when a handler never answered.
pub const UNRESOLVED: &str = "unresolved";

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// JSON error envelope.
pub fn error_response(status: u16, kind: &str, message: String) -> Response {
    (
        status_code(status),
        Json(json!({ "type": kind, "error": message })),
    )
        .into_response()
}

/// Success with an optional JSON body.
pub fn success_response(status: u16, body: Option<Value>) -> Response {
    match body {
        Some(body) => (status_code(status), Json(body)).into_response(),
        None => status_code(status).into_response(),
    }
}

/// Fixed response for a failed Auth Gate check: 403, empty body.
pub fn unauthorized() -> Response {
    StatusCode::FORBIDDEN.into_response()
}

/// A process-wide error: status plus message template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StandardError {
    pub status: u16,
    pub msg: String,
}

impl StandardError {
    /// Render the template and wrap it in the error envelope.
    pub fn respond(&self, kind: &str, data: &Value) -> Response {
        error_response(self.status, kind, template::render(&self.msg, Some(data)))
    }
}

/// Errors the binder itself answers with, shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StandardErrors {
    /// A required param is missing. Template fields: `field`, `endpoint`.
    pub malformed_request: StandardError,

    /// A handler's success payload broke the declared shape, or it raised an
    /// undeclared error. Template fields: `reason`, `missing`, `endpoint`.
    pub bad_response: StandardError,

    /// A handler dropped its context without answering. Template field: `endpoint`.
    pub unresolved: StandardError,
}

impl Default for StandardErrors {
    fn default() -> Self {
        Self {
            malformed_request: StandardError {
                status: 422,
                msg: "malformed request: missing required parameter '{field}'".to_string(),
            },
            bad_response: StandardError {
                status: 500,
                msg: "bad response from {endpoint}: {reason}".to_string(),
            },
            unresolved: StandardError {
                status: 500,
                msg: "request to {endpoint} was not resolved".to_string(),
            },
        }
    }
}
