//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Start (module.rs):
//!     supervisor.rs starts tasks → startup hook → bind routes → bind listener
//!
//! Stop (module.rs):
//!     teardown hook → abort listener → supervisor.rs stops tasks (reverse)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Module::stop
//! ```
//!
//! # Design Decisions
//! - Ordered startup: tasks first, listener last (traffic only when ready)
//! - Ordered shutdown: stop accepting, then stop tasks
//! - No draining: in-flight requests are not awaited

pub mod module;
pub mod periodic;
pub mod shutdown;
pub mod signals;
pub mod state;
pub mod supervisor;

pub use module::{Module, ModuleBuilder, ModuleError, ModuleEvent};
pub use periodic::PeriodicTask;
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::{shutdown_signal, stop_on_signal, stop_when};
pub use state::ModuleState;
pub use supervisor::{BackgroundTask, BoxError, TaskSupervisor};
