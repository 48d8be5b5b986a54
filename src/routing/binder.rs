//! Route Binder.
//!
//! # Responsibilities
//! - Resolve each handler's endpoint in the bound protocols
//! - Compile endpoint paths into axum routes
//! - Guard `authorized` endpoints with the Auth Gate
//! - Dispatch each request: params → handler task → response
//!
//! # Design Decisions
//! - One bad handler entry never aborts binding; it is logged and reported
//! - Route collisions are detected up front so the axum router never panics
//! - The first protocol declaring an endpoint wins
//! - Handlers run on their own task; a panic or dropped context becomes the
//!   `unresolved` standard error

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query,
    },
    handler::Handler as _,
    middleware,
    response::Response,
    routing::{on, MethodRouter},
    Router,
};

use crate::http::auth::{require_api_key, AuthGate};
use crate::http::context::RequestContext;
use crate::http::params;
use crate::http::response::StandardErrors;
use crate::observability::metrics;
use crate::protocol::{EndpointSpec, HttpMethod, Protocol};
use crate::routing::endpoint::CompiledEndpoint;
use crate::routing::handler::{Handler, HandlerMap};
use crate::protocol::path::{route_shape, PathError, PathTemplate};

/// A route the binder registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundRoute {
    pub endpoint: String,
    pub protocol: String,
    pub method: HttpMethod,
    pub path: String,
    pub authorized: bool,
}

/// Why a handler (or one of its route variants) was not routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No bound protocol declares the endpoint.
    UnknownEndpoint,
    /// The endpoint's path template does not compile.
    InvalidPath(PathError),
    /// The route variant collides with one already registered.
    Conflict { path: String, existing: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownEndpoint => write!(f, "no protocol declares this endpoint"),
            SkipReason::InvalidPath(e) => write!(f, "invalid path: {}", e),
            SkipReason::Conflict { path, existing } => {
                write!(f, "route {} conflicts with {}", path, existing)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedHandler {
    pub name: String,
    pub reason: SkipReason,
}

/// Outcome of a bind pass.
#[derive(Debug, Clone, Default)]
pub struct BindReport {
    pub routes: Vec<BoundRoute>,
    pub skipped: Vec<SkippedHandler>,
}

impl BindReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn route(&self, endpoint: &str) -> Option<&BoundRoute> {
        self.routes.iter().find(|route| route.endpoint == endpoint)
    }
}

/// Turns protocols plus a handler map into an axum router.
#[derive(Debug, Clone)]
pub struct RouteBinder {
    module: Arc<str>,
    protocols: Vec<Arc<Protocol>>,
    gate: AuthGate,
    standard: Arc<StandardErrors>,
}

impl RouteBinder {
    pub fn new(
        module: impl Into<Arc<str>>,
        protocols: Vec<Arc<Protocol>>,
        gate: AuthGate,
        standard: Arc<StandardErrors>,
    ) -> Self {
        Self {
            module: module.into(),
            protocols,
            gate,
            standard,
        }
    }

    /// Bind every handler. Never fails; problems are logged and reported.
    pub fn bind(&self, handlers: &HandlerMap) -> (Router, BindReport) {
        tracing::info!(
            module = %self.module,
            protocols = ?self.protocols.iter().map(|p| p.name()).collect::<Vec<_>>(),
            handlers = handlers.len(),
            "Creating API endpoints"
        );

        let mut report = BindReport::default();
        let mut routes: BTreeMap<String, MethodRouter> = BTreeMap::new();
        let mut shapes: HashMap<String, String> = HashMap::new();
        let mut taken: HashSet<(String, HttpMethod)> = HashSet::new();

        for (name, handler) in handlers.iter() {
            let Some((protocol, spec)) = self.lookup(name) else {
                tracing::error!(
                    module = %self.module,
                    handler = %name,
                    "Handler trying to handle nonexistent endpoint"
                );
                report.skipped.push(SkippedHandler {
                    name: name.to_string(),
                    reason: SkipReason::UnknownEndpoint,
                });
                continue;
            };

            let variants = match PathTemplate::parse(&spec.path)
                .and_then(|template| template.routes(&spec.params))
            {
                Ok(variants) => variants,
                Err(e) => {
                    tracing::error!(
                        module = %self.module,
                        endpoint = %name,
                        path = %spec.path,
                        error = %e,
                        "Endpoint path does not compile"
                    );
                    report.skipped.push(SkippedHandler {
                        name: name.to_string(),
                        reason: SkipReason::InvalidPath(e),
                    });
                    continue;
                }
            };

            let endpoint = Arc::new(CompiledEndpoint::compile(
                Arc::clone(&self.module),
                protocol.name(),
                name,
                spec.clone(),
                Arc::clone(&self.standard),
            ));

            for path in variants {
                let shape = route_shape(&path);
                let existing = match shapes.get(&shape) {
                    Some(existing) if *existing != path => Some(existing.clone()),
                    _ if taken.contains(&(path.clone(), spec.method)) => Some(path.clone()),
                    _ => None,
                };
                if let Some(existing) = existing {
                    tracing::error!(
                        module = %self.module,
                        endpoint = %name,
                        method = %spec.method,
                        path = %path,
                        existing = %existing,
                        "Route conflicts with an existing route, skipping"
                    );
                    report.skipped.push(SkippedHandler {
                        name: name.to_string(),
                        reason: SkipReason::Conflict { path, existing },
                    });
                    continue;
                }

                shapes.insert(shape, path.clone());
                taken.insert((path.clone(), spec.method));

                let method_router = self.method_router(Arc::clone(&endpoint), Arc::clone(handler));
                let merged = match routes.remove(&path) {
                    Some(current) => current.merge(method_router),
                    None => method_router,
                };
                routes.insert(path.clone(), merged);

                tracing::debug!(
                    module = %self.module,
                    endpoint = %name,
                    method = %spec.method,
                    path = %path,
                    authorized = spec.authorized,
                    "Bound endpoint"
                );
                report.routes.push(BoundRoute {
                    endpoint: name.to_string(),
                    protocol: protocol.name().to_string(),
                    method: spec.method,
                    path,
                    authorized: spec.authorized,
                });
            }
        }

        for protocol in &self.protocols {
            for (name, _) in protocol.endpoints() {
                if !handlers.contains(name) {
                    tracing::debug!(
                        module = %self.module,
                        protocol = %protocol.name(),
                        endpoint = %name,
                        "Endpoint has no handler, not routed"
                    );
                }
            }
        }

        let router = routes
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(&path, method_router)
            });

        (router, report)
    }

    fn lookup(&self, name: &str) -> Option<(&Arc<Protocol>, &EndpointSpec)> {
        let mut declaring = self
            .protocols
            .iter()
            .filter_map(|protocol| protocol.endpoint(name).map(|spec| (protocol, spec)));

        let first = declaring.next()?;
        for (shadowed, _) in declaring {
            tracing::warn!(
                module = %self.module,
                endpoint = %name,
                used = %first.0.name(),
                ignored = %shadowed.name(),
                "Endpoint declared by more than one protocol"
            );
        }
        Some(first)
    }

    fn method_router(&self, endpoint: Arc<CompiledEndpoint>, handler: Arc<dyn Handler>) -> MethodRouter {
        let filter = endpoint.spec().method.filter();
        let authorized = endpoint.spec().authorized;

        let serve = move |path: Result<Path<HashMap<String, String>>, PathRejection>,
                          query: Result<Query<HashMap<String, String>>, QueryRejection>,
                          body: Bytes| {
            let endpoint = Arc::clone(&endpoint);
            let handler = Arc::clone(&handler);
            async move {
                let path = path.map(|Path(path)| path).unwrap_or_default();
                let query = query.map(|Query(query)| query).unwrap_or_default();
                dispatch(endpoint, handler, path, query, body).await
            }
        };

        if authorized {
            on(
                filter,
                serve.layer(middleware::from_fn_with_state(self.gate.clone(), require_api_key)),
            )
        } else {
            on(filter, serve)
        }
    }
}

async fn dispatch(
    endpoint: Arc<CompiledEndpoint>,
    handler: Arc<dyn Handler>,
    path: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Bytes,
) -> Response {
    let start = Instant::now();

    let response = match params::extract(&endpoint, path, query, &body) {
        Ok(params) => {
            let (ctx, reply) = RequestContext::new(Arc::clone(&endpoint), params);
            tokio::spawn(Handler::call(handler.as_ref(), ctx));
            match reply.await {
                Ok(response) => response,
                Err(_) => endpoint.unresolved(),
            }
        }
        Err(malformed) => endpoint.malformed(&malformed),
    };

    metrics::record_request(
        endpoint.module(),
        endpoint.name(),
        response.status().as_u16(),
        start,
    );
    response
}
