//! Periodic background job.
//!
//! Runs a job on a fixed interval from start until stop, the way a health
//! monitor ticks. The first run happens immediately on start.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::lifecycle::shutdown::{Shutdown, ShutdownSignal};
use crate::lifecycle::supervisor::{BackgroundTask, BoxError};

type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub struct PeriodicTask {
    name: String,
    period: Duration,
    job: Job,
    shutdown: Shutdown,
    runs: Arc<AtomicU64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    pub fn new<F, Fut>(name: impl Into<String>, period: Duration, job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            period,
            job: Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(job()) }),
            shutdown: Shutdown::new(),
            runs: Arc::new(AtomicU64::new(0)),
            handle: Mutex::new(None),
        }
    }

    /// Completed job runs since creation.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .map(|handle| handle.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn run(name: String, period: Duration, job: Job, runs: Arc<AtomicU64>, mut shutdown: ShutdownSignal) {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    job().await;
                    runs.fetch_add(1, Ordering::Relaxed);
                }
                _ = shutdown.recv() => {
                    tracing::debug!(task = %name, "Periodic task received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl BackgroundTask for PeriodicTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), BoxError> {
        let mut slot = self
            .handle
            .lock()
            .map_err(|_| format!("periodic task {} state is poisoned", self.name))?;
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(format!("periodic task {} is already running", self.name).into());
        }

        if self.period.is_zero() {
            return Err(format!("periodic task {} has a zero period", self.name).into());
        }

        self.shutdown.reset();
        *slot = Some(tokio::spawn(Self::run(
            self.name.clone(),
            self.period,
            Arc::clone(&self.job),
            Arc::clone(&self.runs),
            self.shutdown.subscribe(),
        )));
        Ok(())
    }

    async fn stop(&self) -> Result<(), BoxError> {
        self.shutdown.trigger();
        let handle = self
            .handle
            .lock()
            .map_err(|_| format!("periodic task {} state is poisoned", self.name))?
            .take();

        if let Some(handle) = handle {
            handle.await?;
        }
        Ok(())
    }
}
