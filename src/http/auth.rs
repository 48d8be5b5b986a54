//! Shared-secret Auth Gate.
//!
//! The credential is the raw `Authorization` header value, compared byte for
//! byte with the module's secret. Any mismatch ends the request with 403 and an
//! empty body.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::{self, Next},
    response::Response,
    Router,
};

use crate::http::response::unauthorized;
use crate::observability::metrics;

/// Gate comparing the presented credential with the module secret.
#[derive(Clone)]
pub struct AuthGate {
    module: Arc<str>,
    api_key: Arc<str>,
}

impl AuthGate {
    pub fn new(module: impl Into<Arc<str>>, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            module: module.into(),
            api_key: api_key.into(),
        }
    }

    /// Exact equality of the `Authorization` header with the secret.
    pub fn permits(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .map(|value| value.as_bytes() == self.api_key.as_bytes())
            .unwrap_or(false)
    }

    /// Guard every route of `router` with this gate.
    ///
    /// Used by route-extension hooks for routes outside the protocol.
    pub fn protect<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self.clone(), require_api_key))
    }
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

/// Middleware form of the gate.
pub async fn require_api_key(State(gate): State<AuthGate>, request: Request, next: Next) -> Response {
    if gate.permits(request.headers()) {
        return next.run(request).await;
    }

    tracing::warn!(
        module = %gate.module,
        method = %request.method(),
        path = %request.uri().path(),
        "Rejected request with missing or invalid credentials"
    );
    metrics::record_auth_failure(&gate.module);
    unauthorized()
}
