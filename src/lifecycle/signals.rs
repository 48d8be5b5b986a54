//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl+C) or, on Unix, SIGTERM
//! - Stop a module when a signal or another trigger fires
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Nothing is installed implicitly; the owning process opts in
//! - A handler that cannot be installed is logged and never fires

use std::future::Future;

use tokio::task::JoinHandle;

use crate::lifecycle::module::Module;

/// Resolve on the first termination signal.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Stop `module` on the first termination signal.
pub fn stop_on_signal(module: Module) -> JoinHandle<()> {
    stop_when(module, shutdown_signal())
}

/// Stop `module` once `trigger` resolves.
pub fn stop_when<F>(module: Module, trigger: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        trigger.await;
        tracing::info!(module = %module.name(), "Stop triggered");
        module.stop().await;
    })
}
