//! Business handlers and the handler map.
//!
//! # Design Decisions
//! - A handler receives the [`RequestContext`] by value and answers through it
//! - Any `Fn(RequestContext) -> impl Future` closure is a handler
//! - Map keys are endpoint names; entries with no matching endpoint are
//!   skipped at bind time, never fatal

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::http::context::RequestContext;

/// Business logic for one endpoint.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, ()>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, ()> {
        Box::pin(self(ctx))
    }
}

/// Endpoint name → handler.
#[derive(Clone, Default)]
pub struct HandlerMap {
    handlers: BTreeMap<String, Arc<dyn Handler>>,
}

impl HandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`HandlerMap::insert`].
    pub fn on(mut self, endpoint: impl Into<String>, handler: impl Handler) -> Self {
        self.insert(endpoint, handler);
        self
    }

    /// Register a handler, returning the one it replaced.
    pub fn insert(
        &mut self,
        endpoint: impl Into<String>,
        handler: impl Handler,
    ) -> Option<Arc<dyn Handler>> {
        self.handlers.insert(endpoint.into(), Arc::new(handler))
    }

    pub fn insert_shared(
        &mut self,
        endpoint: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Option<Arc<dyn Handler>> {
        self.handlers.insert(endpoint.into(), handler)
    }

    pub fn get(&self, endpoint: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(endpoint)
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        self.handlers.contains_key(endpoint)
    }

    /// Handlers in endpoint-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Handler>)> {
        self.handlers.iter().map(|(name, handler)| (name.as_str(), handler))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}
