//! Per-request context handed to business handlers.
//!
//! # Responsibilities
//! - Expose the validated params of one request
//! - Emit exactly one response: success, a declared error, or nothing
//! - Check success payloads against the declared body shape
//!
//! # Design Decisions
//! - Emitters take `self`, so a second emission does not compile
//! - The response travels back to the binder over a oneshot channel
//! - A context dropped without emitting closes the channel; the binder answers
//!   with the `unresolved` standard error

use std::fmt;
use std::sync::Arc;

use axum::response::Response;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::http::params::Params;
use crate::http::response::success_response;
use crate::protocol::template;
use crate::routing::endpoint::CompiledEndpoint;

/// The request as seen by a business handler.
pub struct RequestContext {
    endpoint: Arc<CompiledEndpoint>,
    params: Params,
    reply: oneshot::Sender<Response>,
}

impl RequestContext {
    pub(crate) fn new(
        endpoint: Arc<CompiledEndpoint>,
        params: Params,
    ) -> (Self, oneshot::Receiver<Response>) {
        let (reply, receiver) = oneshot::channel();
        (
            Self {
                endpoint,
                params,
                reply,
            },
            receiver,
        )
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Endpoint name.
    pub fn endpoint(&self) -> &str {
        self.endpoint.name()
    }

    pub fn module(&self) -> &str {
        self.endpoint.module()
    }

    /// Error names this endpoint may emit.
    pub fn declared_errors(&self) -> impl Iterator<Item = &str> {
        self.endpoint.spec().response.error.keys().map(String::as_str)
    }

    pub fn declares_error(&self, name: &str) -> bool {
        self.endpoint.declares_error(name)
    }

    /// Answer with the declared success status.
    ///
    /// Without a declared body schema the result is ignored and a bare status
    /// is sent. A result that breaks the schema is replaced by the standard
    /// bad-response error.
    pub fn success(self, result: impl Into<Option<Value>>) {
        let result = result.into();
        let success = &self.endpoint.spec().response.success;

        let response = match &success.body {
            None => {
                self.log_success(result.as_ref());
                success_response(success.status, None)
            }
            Some(shape) => match shape.check(result.as_ref()) {
                Ok(()) => {
                    self.log_success(result.as_ref());
                    match result {
                        Some(Value::Null) | None => success_response(success.status, None),
                        body => success_response(success.status, body),
                    }
                }
                Err(mismatch) => self
                    .endpoint
                    .bad_response(&mismatch.to_string(), mismatch.missing()),
            },
        };

        self.reply(response);
    }

    /// Serialize `result` and answer as [`RequestContext::success`] does.
    pub fn success_with<T: Serialize>(self, result: &T) {
        match serde_json::to_value(result) {
            Ok(value) => self.success(value),
            Err(e) => {
                let response = self
                    .endpoint
                    .bad_response(&format!("result is not serializable: {}", e), &[]);
                self.reply(response);
            }
        }
    }

    /// Answer with a declared business error.
    ///
    /// The declared template is rendered with `data`. An undeclared name is
    /// answered with the standard bad-response error.
    pub fn error(self, name: &str, data: impl Into<Option<Value>>) {
        let data: Option<Value> = data.into();
        let response = self.endpoint.business_error(name, data.as_ref());
        self.reply(response);
    }

    fn log_success(&self, result: Option<&Value>) {
        let success = &self.endpoint.spec().response.success;
        if success.msg.is_empty() {
            tracing::debug!(
                module = %self.endpoint.module(),
                endpoint = %self.endpoint.name(),
                status = success.status,
                "Request succeeded"
            );
        } else {
            tracing::info!(
                module = %self.endpoint.module(),
                endpoint = %self.endpoint.name(),
                status = success.status,
                "{}",
                template::render(&success.msg, result)
            );
        }
    }

    fn reply(self, response: Response) {
        if self.reply.send(response).is_err() {
            tracing::debug!(
                endpoint = %self.endpoint.name(),
                "Client went away before the response was ready"
            );
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("endpoint", &self.endpoint.name())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
