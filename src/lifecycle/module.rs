//! Module Lifecycle Manager.
//!
//! # Responsibilities
//! - Assemble a module from config, protocols, handlers, hooks and tasks
//! - Drive `start` and `stop` in a fixed order
//! - Publish state (watch) and lifecycle events (broadcast)
//!
//! # Start Sequence
//! ```text
//! stopped → starting
//!     → background tasks (best-effort, in order)
//!     → startup hook (failure: stop tasks, back to stopped)
//!     → bind routes + route extension hook
//!     → bind listener (failure: stop tasks, back to stopped)
//!     → running, Started event, secret returned
//! ```
//!
//! # Design Decisions
//! - Transitions are serialized by an async mutex; a second `start` is
//!   rejected, a `stop` outside `running` is a no-op
//! - Stop aborts the listener task instead of draining connections

use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::ModuleConfig;
use crate::http::auth::AuthGate;
use crate::http::server::HttpServer;
use crate::lifecycle::state::ModuleState;
use crate::lifecycle::supervisor::{BackgroundTask, BoxError, TaskSupervisor};
use crate::observability::metrics;
use crate::protocol::Protocol;
use crate::routing::{BindReport, Handler, HandlerMap, RouteBinder};

type Hook = Box<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;
type RouteHook = Box<dyn Fn(Router, &AuthGate) -> Router + Send + Sync>;

const EVENT_CAPACITY: usize = 16;

/// Lifecycle notifications. Subscribe before calling `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleEvent {
    Starting { name: String },
    Started { name: String, addr: SocketAddr },
    Stopping { name: String },
    Stopped { name: String },
}

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module {name} is already {state}")]
    AlreadyStarted { name: String, state: ModuleState },

    #[error("startup hook of module {name} failed: {source}")]
    StartupHook {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("module {name} could not listen on {address}: {source}")]
    Bind {
        name: String,
        address: String,
        #[source]
        source: io::Error,
    },
}

/// Builder for [`Module`].
pub struct ModuleBuilder {
    config: ModuleConfig,
    protocols: Vec<Arc<Protocol>>,
    handlers: HandlerMap,
    on_start: Option<Hook>,
    on_stop: Option<Hook>,
    routes: Option<RouteHook>,
    tasks: Vec<Arc<dyn BackgroundTask>>,
}

impl ModuleBuilder {
    fn new(config: ModuleConfig) -> Self {
        Self {
            config,
            protocols: Vec::new(),
            handlers: HandlerMap::new(),
            on_start: None,
            on_stop: None,
            routes: None,
            tasks: Vec::new(),
        }
    }

    /// Bind a protocol. Earlier protocols win on duplicate endpoint names.
    pub fn protocol(mut self, protocol: impl Into<Arc<Protocol>>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    /// Replace the handler map.
    pub fn handlers(mut self, handlers: HandlerMap) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn handler(mut self, endpoint: impl Into<String>, handler: impl Handler) -> Self {
        self.handlers.insert(endpoint, handler);
        self
    }

    /// Runs after background tasks start, before the listener binds.
    /// An error aborts `start`.
    pub fn on_start<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.on_start = Some(Box::new(move || -> BoxFuture<'static, Result<(), BoxError>> {
            Box::pin(hook())
        }));
        self
    }

    /// Runs first during `stop`. An error is logged and stop continues.
    pub fn on_stop<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.on_stop = Some(Box::new(move || -> BoxFuture<'static, Result<(), BoxError>> {
            Box::pin(hook())
        }));
        self
    }

    /// Extend the protocol router with extra routes.
    ///
    /// The hook gets the Auth Gate so it can protect what it adds with
    /// [`AuthGate::protect`]; routes it adds are open otherwise.
    pub fn routes<F>(mut self, hook: F) -> Self
    where
        F: Fn(Router, &AuthGate) -> Router + Send + Sync + 'static,
    {
        self.routes = Some(Box::new(hook));
        self
    }

    /// Register a background task. Tasks start in registration order.
    pub fn task(mut self, task: impl BackgroundTask + 'static) -> Self {
        self.tasks.push(Arc::new(task));
        self
    }

    pub fn task_shared(mut self, task: Arc<dyn BackgroundTask>) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn build(self) -> Module {
        let name: Arc<str> = Arc::from(self.config.name.as_str());
        let gate = AuthGate::new(Arc::clone(&name), self.config.api_key.as_str());

        let mut supervisor = TaskSupervisor::new(Arc::clone(&name));
        for task in self.tasks {
            supervisor.register(task);
        }

        let (state, _) = watch::channel(ModuleState::Stopped);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Module {
            inner: Arc::new(ModuleInner {
                name,
                config: self.config,
                protocols: self.protocols,
                handlers: self.handlers,
                on_start: self.on_start,
                on_stop: self.on_stop,
                routes: self.routes,
                gate,
                state,
                events,
                runtime: Mutex::new(Runtime {
                    supervisor,
                    server: None,
                }),
            }),
        }
    }
}

/// A networked component serving its protocols. Cheap to clone.
#[derive(Clone)]
pub struct Module {
    inner: Arc<ModuleInner>,
}

struct ModuleInner {
    name: Arc<str>,
    config: ModuleConfig,
    protocols: Vec<Arc<Protocol>>,
    handlers: HandlerMap,
    on_start: Option<Hook>,
    on_stop: Option<Hook>,
    routes: Option<RouteHook>,
    gate: AuthGate,
    state: watch::Sender<ModuleState>,
    events: broadcast::Sender<ModuleEvent>,
    runtime: Mutex<Runtime>,
}

struct Runtime {
    supervisor: TaskSupervisor,
    server: Option<RunningServer>,
}

struct RunningServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    report: BindReport,
}

impl Module {
    pub fn builder(config: ModuleConfig) -> ModuleBuilder {
        ModuleBuilder::new(config)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The effective shared secret.
    pub fn api_key(&self) -> &str {
        &self.inner.config.api_key
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.inner.config
    }

    pub fn gate(&self) -> &AuthGate {
        &self.inner.gate
    }

    pub fn state(&self) -> ModuleState {
        *self.inner.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ModuleState> {
        self.inner.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModuleEvent> {
        self.inner.events.subscribe()
    }

    /// Address the listener is bound to while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.runtime.lock().await.server.as_ref().map(|s| s.addr)
    }

    /// Routes bound by the last successful start.
    pub async fn bind_report(&self) -> Option<BindReport> {
        self.inner
            .runtime
            .lock()
            .await
            .server
            .as_ref()
            .map(|s| s.report.clone())
    }

    /// Protocol routes plus extension routes, without middleware.
    pub fn routes(&self) -> (Router, BindReport) {
        let binder = RouteBinder::new(
            Arc::clone(&self.inner.name),
            self.inner.protocols.clone(),
            self.inner.gate.clone(),
            Arc::new(self.inner.config.errors.clone()),
        );
        let (router, report) = binder.bind(&self.inner.handlers);

        let router = match &self.inner.routes {
            Some(extend) => extend(router, &self.inner.gate),
            None => router,
        };
        (router, report)
    }

    /// The complete application as served by `start`.
    pub fn app(&self) -> (Router, BindReport) {
        let (routes, report) = self.routes();
        (HttpServer::new(&self.inner.config, routes).into_router(), report)
    }

    /// Start the module and return its shared secret.
    pub async fn start(&self) -> Result<String, ModuleError> {
        let mut runtime = self.inner.runtime.lock().await;

        let state = self.state();
        if !state.is_stopped() {
            tracing::error!(module = %self.inner.name, state = %state, "Module is already started");
            return Err(ModuleError::AlreadyStarted {
                name: self.name().to_string(),
                state,
            });
        }

        self.transition(ModuleState::Starting);
        self.emit(ModuleEvent::Starting {
            name: self.name().to_string(),
        });
        tracing::info!(module = %self.inner.name, "Starting module");

        runtime.supervisor.start_all().await;

        if let Some(hook) = &self.inner.on_start {
            if let Err(source) = hook().await {
                tracing::error!(module = %self.inner.name, error = %source, "Startup hook failed");
                runtime.supervisor.stop_all().await;
                self.transition(ModuleState::Stopped);
                return Err(ModuleError::StartupHook {
                    name: self.name().to_string(),
                    source,
                });
            }
        }

        let (routes, report) = self.routes();
        let server = HttpServer::new(&self.inner.config, routes);
        let address = self.inner.config.bind_address();

        let bound = match HttpServer::bind(&self.inner.config).await {
            Ok(listener) => server.spawn(listener),
            Err(e) => Err(e),
        };
        let (addr, handle) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                tracing::error!(
                    module = %self.inner.name,
                    address = %address,
                    error = %source,
                    "Failed to bind listener"
                );
                runtime.supervisor.stop_all().await;
                self.transition(ModuleState::Stopped);
                return Err(ModuleError::Bind {
                    name: self.name().to_string(),
                    address,
                    source,
                });
            }
        };

        runtime.server = Some(RunningServer {
            addr,
            handle,
            report,
        });
        self.transition(ModuleState::Running);
        metrics::set_running(&self.inner.name, true);
        self.emit(ModuleEvent::Started {
            name: self.name().to_string(),
            addr,
        });
        tracing::info!(module = %self.inner.name, address = %addr, "Module started");

        Ok(self.inner.config.api_key.clone())
    }

    /// Stop the module. A no-op unless it is running.
    pub async fn stop(&self) {
        let mut runtime = self.inner.runtime.lock().await;

        let state = self.state();
        if !state.is_running() {
            tracing::info!(module = %self.inner.name, state = %state, "Module is not running, nothing to stop");
            return;
        }

        self.transition(ModuleState::Stopping);
        self.emit(ModuleEvent::Stopping {
            name: self.name().to_string(),
        });
        tracing::info!(module = %self.inner.name, "Stopping module");

        if let Some(hook) = &self.inner.on_stop {
            if let Err(e) = hook().await {
                tracing::error!(module = %self.inner.name, error = %e, "Teardown hook failed");
            }
        }

        if let Some(server) = runtime.server.take() {
            server.handle.abort();
            // Cancellation is the expected outcome; the listener is dropped either way.
            let _ = server.handle.await;
            tracing::info!(module = %self.inner.name, address = %server.addr, "Listener closed");
        }

        runtime.supervisor.stop_all().await;

        self.transition(ModuleState::Stopped);
        metrics::set_running(&self.inner.name, false);
        self.emit(ModuleEvent::Stopped {
            name: self.name().to_string(),
        });
        tracing::info!(module = %self.inner.name, "Module stopped");
    }

    fn transition(&self, state: ModuleState) {
        let previous = self.inner.state.send_replace(state);
        tracing::debug!(module = %self.inner.name, from = %previous, to = %state, "State transition");
    }

    fn emit(&self, event: ModuleEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("protocols", &self.inner.protocols.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("handlers", &self.inner.handlers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> Module {
        let config = ModuleConfig::new("items", 0)
            .with_host("127.0.0.1")
            .with_api_key("abc");
        Module::builder(config).build()
    }

    #[tokio::test]
    async fn start_returns_secret_and_rejects_second_start() {
        let module = module();
        assert_eq!(module.start().await.unwrap(), "abc");
        assert_eq!(module.state(), ModuleState::Running);
        assert!(module.local_addr().await.is_some());

        let err = module.start().await.unwrap_err();
        assert!(matches!(err, ModuleError::AlreadyStarted { state: ModuleState::Running, .. }));

        module.stop().await;
        assert_eq!(module.state(), ModuleState::Stopped);
        assert!(module.local_addr().await.is_none());
    }

    #[tokio::test]
    async fn stop_when_stopped_is_noop() {
        let module = module();
        let mut events = module.subscribe();
        module.stop().await;
        assert_eq!(module.state(), ModuleState::Stopped);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn failing_startup_hook_leaves_module_stopped() {
        let config = ModuleConfig::new("items", 0).with_host("127.0.0.1");
        let module = Module::builder(config)
            .on_start(|| async { Err::<(), BoxError>("no database".into()) })
            .build();

        let err = module.start().await.unwrap_err();
        assert!(matches!(err, ModuleError::StartupHook { .. }));
        assert!(err.to_string().contains("no database"));
        assert_eq!(module.state(), ModuleState::Stopped);
    }

    #[tokio::test]
    async fn events_follow_transitions() {
        let module = module();
        let mut events = module.subscribe();
        module.start().await.unwrap();
        module.stop().await;

        assert_eq!(events.recv().await.unwrap(), ModuleEvent::Starting { name: "items".into() });
        match events.recv().await.unwrap() {
            ModuleEvent::Started { name, addr } => {
                assert_eq!(name, "items");
                assert_ne!(addr.port(), 0);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(events.recv().await.unwrap(), ModuleEvent::Stopping { name: "items".into() });
        assert_eq!(events.recv().await.unwrap(), ModuleEvent::Stopped { name: "items".into() });
    }
}
