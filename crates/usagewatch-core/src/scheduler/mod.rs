//! Periodic monitoring lifecycle and tick handling.


pub mod connectivity;
pub mod host;
pub mod registry;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

pub use connectivity::{ConnectivityProbe, TcpConnectivityProbe};
pub use host::{HostScheduler, PeriodicRequest, RetryPolicy, TickWorker, TokioHostScheduler};
pub use registry::{ScheduleHandle, ScheduleRegistry};

use crate::{
    error::{PipelineError, ScheduleError},
    models::{DeliveryOutcome, UsageSummary},
    notify::Notifier,
    pipeline::{PipelineRun, UsagePipeline},
    source::PermissionOracle,
};

/// Unique name of the periodic usage upload
pub const UNIQUE_WORK_NAME: &str = "usage-monitor";

/// Signal returned to the host scheduler after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    Success,
    /// Try again later under the host's backoff policy
    Retry,
    /// Retrying cannot help
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Unregistered,
    Registered,
    /// A tick is executing
    Running,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Scheduler {
    pipeline: UsagePipeline,
    permissions: Arc<dyn PermissionOracle>,
    notifier: Arc<dyn Notifier>,
    host: Arc<dyn HostScheduler>,
    registry: Arc<ScheduleRegistry>,
    ticks_in_flight: AtomicUsize,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        pipeline: UsagePipeline,
        permissions: Arc<dyn PermissionOracle>,
        notifier: Arc<dyn Notifier>,
        host: Arc<dyn HostScheduler>,
        registry: Arc<ScheduleRegistry>,
    ) -> Self {
        Self {
            pipeline,
            permissions,
            notifier,
            host,
            registry,
            ticks_in_flight: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        if self.ticks_in_flight.load(Ordering::SeqCst) > 0 {
            SchedulerState::Running
        } else if self.registry.get(UNIQUE_WORK_NAME).is_some() {
            SchedulerState::Registered
        } else {
            SchedulerState::Unregistered
        }
    }

    /// The currently installed registration, if any
    #[must_use]
    pub fn handle(&self) -> Option<ScheduleHandle> {
        self.registry.get(UNIQUE_WORK_NAME)
    }

    /// Install periodic monitoring, replacing any earlier registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the host scheduler rejects the request; any
    /// previous registration then stays in place.
    pub fn register_periodic(
        self: &Arc<Self>,
        request: &PeriodicRequest,
    ) -> Result<ScheduleHandle, ScheduleError> {
        request.validate()?;

        let worker: Arc<dyn TickWorker> = self.clone();
        let (handle, replaced) = self.registry.install_with(UNIQUE_WORK_NAME, || {
            self.host
                .enqueue_unique_periodic(UNIQUE_WORK_NAME, request, worker)
        })?;

        if let Some(previous) = replaced {
            log::info!(
                "Periodic monitoring re-registered ({} replaces {})",
                handle.id,
                previous.id
            );
        } else {
            log::info!("Periodic monitoring registered ({})", handle.id);
        }
        Ok(handle)
    }

    /// Remove periodic monitoring. Returns the registration that was active.
    pub fn cancel(&self) -> Option<ScheduleHandle> {
        let removed = self.registry.remove_with(UNIQUE_WORK_NAME, || {
            self.host.cancel_unique(UNIQUE_WORK_NAME);
        });
        if removed.is_some() {
            log::info!("Periodic monitoring cancelled");
        }
        removed
    }

    /// Run one periodic tick and tell the host what to do next.
    pub async fn on_tick(&self) -> TickResult {
        let _in_flight = InFlight::enter(&self.ticks_in_flight);
        log::info!("Tick started");

        if !self.permissions.has_usage_access().await {
            log::error!("Usage access not granted, tick fails without retry");
            return TickResult::Failure;
        }

        let result = match self.pipeline.execute(Utc::now()).await {
            Ok(run) => self.interpret(&run),
            Err(PipelineError::PermissionDenied) => {
                log::error!("Usage access revoked during tick, not retrying");
                TickResult::Failure
            }
            Err(e) => {
                log::error!("Tick failed: {e}");
                TickResult::Retry
            }
        };

        log::info!("Tick finished: {result:?}");
        result
    }

    fn interpret(&self, run: &PipelineRun) -> TickResult {
        match &run.outcome {
            DeliveryOutcome::Success { .. } => {
                match run.message() {
                    Ok(Some(message)) => self.notifier.notify(&message),
                    Ok(None) => {}
                    Err(e) => log::warn!("Ignoring collector response: {e}"),
                }
                TickResult::Success
            }
            DeliveryOutcome::TransientFailure { reason } => {
                log::warn!("Delivery failed, requesting retry: {reason}");
                TickResult::Retry
            }
            DeliveryOutcome::FatalFailure { reason } => {
                log::error!("Delivery failed permanently: {reason}");
                TickResult::Failure
            }
        }
    }

    /// Run the pipeline immediately for a user, outside the periodic schedule.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::PermissionDenied` when usage access is missing,
    /// or another `PipelineError` if usage cannot be read or encoded.
    pub async fn run_once(&self) -> Result<PipelineRun, PipelineError> {
        if !self.permissions.has_usage_access().await {
            return Err(PipelineError::PermissionDenied);
        }
        self.pipeline.execute(Utc::now()).await
    }

    /// Current summary without delivering it.
    ///
    /// # Errors
    ///
    /// Same as [`Scheduler::run_once`].
    pub async fn preview(&self) -> Result<UsageSummary, PipelineError> {
        if !self.permissions.has_usage_access().await {
            return Err(PipelineError::PermissionDenied);
        }
        self.pipeline.summarize(Utc::now()).await
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.pipeline.endpoint()
    }
}

#[async_trait]
impl TickWorker for Scheduler {
    async fn on_tick(&self) -> TickResult {
        Scheduler::on_tick(self).await
    }
}
