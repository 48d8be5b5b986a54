//! Endpoints compiled at bind time.
//!
//! Everything a request needs from its endpoint (transport, canonical param
//! names, declared error emitters, standard errors) is resolved once here and
//! shared by every request through an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::response::Response;
use serde_json::{json, Value};

use crate::http::params::Malformed;
use crate::http::response::{
    error_response, StandardError, StandardErrors, BAD_RESPONSE, MALFORMED_REQUEST, UNRESOLVED,
};
use crate::protocol::template;
use crate::protocol::{canonical_key, EndpointSpec, Transport};

/// An endpoint bound to a handler, ready to serve requests.
#[derive(Debug)]
pub struct CompiledEndpoint {
    module: Arc<str>,
    protocol: String,
    name: String,
    spec: EndpointSpec,
    transport: Transport,
    canonical: HashMap<String, String>,
    errors: HashMap<String, StandardError>,
    standard: Arc<StandardErrors>,
}

impl CompiledEndpoint {
    pub fn compile(
        module: Arc<str>,
        protocol: &str,
        name: &str,
        spec: EndpointSpec,
        standard: Arc<StandardErrors>,
    ) -> Self {
        let canonical = spec
            .params
            .keys()
            .map(|declared| (canonical_key(declared), declared.clone()))
            .collect();

        let errors = spec
            .response
            .error
            .iter()
            .map(|(name, declared)| {
                (
                    name.clone(),
                    StandardError {
                        status: declared.status,
                        msg: declared.msg.clone(),
                    },
                )
            })
            .collect();

        Self {
            module,
            protocol: protocol.to_string(),
            name: name.to_string(),
            transport: spec.transport(),
            spec,
            canonical,
            errors,
            standard,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &EndpointSpec {
        &self.spec
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Declared param name matching an incoming key, if any.
    pub fn canonical_name(&self, key: &str) -> Option<&str> {
        self.canonical.get(&canonical_key(key)).map(String::as_str)
    }

    pub fn declares_error(&self, name: &str) -> bool {
        self.errors.contains_key(name)
    }

    /// The declared error `name` rendered with `data`; an undeclared name gets
    /// the standard bad-response error.
    pub(crate) fn business_error(&self, name: &str, data: Option<&Value>) -> Response {
        let Some(declared) = self.errors.get(name) else {
            return self.bad_response(&format!("undeclared error '{}'", name), &[]);
        };

        let message = template::render(&declared.msg, data);
        tracing::info!(
            module = %self.module,
            endpoint = %self.name,
            error = %name,
            status = declared.status,
            "{}",
            message
        );
        error_response(declared.status, name, message)
    }

    pub(crate) fn malformed(&self, malformed: &Malformed) -> Response {
        tracing::warn!(
            module = %self.module,
            endpoint = %self.name,
            field = %malformed.field(),
            "Malformed request"
        );
        self.standard.malformed_request.respond(
            MALFORMED_REQUEST,
            &json!({ "field": malformed.field(), "endpoint": self.name }),
        )
    }

    pub(crate) fn bad_response(&self, reason: &str, missing: &[String]) -> Response {
        tracing::error!(
            module = %self.module,
            endpoint = %self.name,
            reason = %reason,
            "Handler produced a response that breaks the protocol"
        );
        self.standard.bad_response.respond(
            BAD_RESPONSE,
            &json!({
                "reason": reason,
                "missing": missing.join(", "),
                "endpoint": self.name,
            }),
        )
    }

    pub(crate) fn unresolved(&self) -> Response {
        tracing::error!(
            module = %self.module,
            endpoint = %self.name,
            "Handler finished without answering the request"
        );
        self.standard
            .unresolved
            .respond(UNRESOLVED, &json!({ "endpoint": self.name }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn endpoint() -> CompiledEndpoint {
        let spec: EndpointSpec = serde_json::from_value(json!({
            "path": "/item/:id",
            "method": "GET",
            "params": { "id": "string" },
            "response": {
                "success": { "status": 200 },
                "error": { "notFound": { "status": 404, "msg": "no item {id}" } }
            }
        }))
        .unwrap();
        CompiledEndpoint::compile(
            Arc::from("items"),
            "items",
            "getItem",
            spec,
            Arc::new(StandardErrors::default()),
        )
    }

    async fn body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn declared_names_are_resolved_at_compile() {
        let endpoint = endpoint();
        assert!(endpoint.declares_error("notFound"));
        assert!(!endpoint.declares_error("gone"));
        assert_eq!(endpoint.canonical_name("ID"), Some("id"));
    }

    #[tokio::test]
    async fn business_error_renders_declared_template() {
        let endpoint = endpoint();
        let response = endpoint.business_error("notFound", Some(&json!({ "id": "7" })));
        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(body(response).await, json!({ "type": "notFound", "error": "no item 7" }));

        let response = endpoint.business_error("gone", None);
        assert_eq!(response.status().as_u16(), 500);
        assert_eq!(body(response).await["type"], BAD_RESPONSE);
    }
}
