//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the bound router with the module's middleware stack
//!   (request ID, tracing, timeout, body limit)
//! - Bind the listener and serve on a background task
//!
//! # Design Decisions
//! - The serve task is aborted on stop: the port is released at once and
//!   in-flight connections are not drained
//! - Every response carries `x-request-id`, generated when the client sent none

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ModuleConfig;

/// HTTP server for one module.
pub struct HttpServer {
    module: Arc<str>,
    router: Router,
}

impl HttpServer {
    /// Wrap `routes` with the middleware stack configured for the module.
    pub fn new(config: &ModuleConfig, routes: Router) -> Self {
        Self {
            module: Arc::from(config.name.as_str()),
            router: Self::build_router(config, routes),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ModuleConfig, routes: Router) -> Router {
        routes
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// Bind `config`'s address.
    pub async fn bind(config: &ModuleConfig) -> io::Result<TcpListener> {
        TcpListener::bind(config.bind_address()).await
    }

    /// Serve on a background task until it ends or is aborted.
    pub fn spawn(self, listener: TcpListener) -> io::Result<(SocketAddr, JoinHandle<()>)> {
        let addr = listener.local_addr()?;
        tracing::info!(module = %self.module, address = %addr, "HTTP server starting");

        let module = self.module;
        let app = self.router.into_make_service();
        let handle = tokio::spawn(async move {
            match axum::serve(listener, app).await {
                Ok(()) => tracing::info!(module = %module, "HTTP server stopped"),
                Err(e) => tracing::error!(module = %module, error = %e, "HTTP server failed"),
            }
        });

        Ok((addr, handle))
    }
}
