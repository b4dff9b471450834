//! Host scheduler substrate: runs periodic work on the tokio runtime.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{runtime::Handle, task::JoinHandle, time::Instant};

use super::{
    connectivity::ConnectivityProbe,
    registry::ScheduleHandle,
    TickResult,
};
use crate::error::ScheduleError;

/// Work invoked on every periodic tick
#[async_trait]
pub trait TickWorker: Send + Sync {
    async fn on_tick(&self) -> TickResult;
}

/// Parameters of a periodic registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicRequest {
    pub interval: Duration,
    /// Ticks may fire anywhere in the last `flex` of each interval
    pub flex: Duration,
    /// Defer ticks until the network is reachable
    pub requires_network: bool,
}

impl Default for PeriodicRequest {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            flex: Duration::from_secs(5 * 60),
            requires_network: true,
        }
    }
}

impl PeriodicRequest {
    /// # Errors
    ///
    /// Returns an error if the interval is zero or shorter than the flex window.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.interval.is_zero() {
            return Err(ScheduleError::InvalidRequest(
                "interval must be positive".to_string(),
            ));
        }
        if self.flex > self.interval {
            return Err(ScheduleError::InvalidRequest(format!(
                "flex {:?} exceeds interval {:?}",
                self.flex, self.interval
            )));
        }
        Ok(())
    }

    /// Delay from the start of a period to the opening of its flex window
    #[must_use]
    pub fn lead(&self) -> Duration {
        self.interval.saturating_sub(self.flex)
    }
}

/// Something that can run named periodic work
pub trait HostScheduler: Send + Sync {
    /// Start periodic work under `name`, discarding any work already registered under it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or the host cannot accept work.
    fn enqueue_unique_periodic(
        &self,
        name: &str,
        request: &PeriodicRequest,
        worker: Arc<dyn TickWorker>,
    ) -> Result<ScheduleHandle, ScheduleError>;

    /// Stop the work registered under `name`. Returns whether anything was registered.
    fn cancel_unique(&self, name: &str) -> bool;
}

/// Bounded exponential backoff applied when a tick asks for a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Tick attempts per period, the first one included
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(5 * 60 * 60),
            max_attempts: 10,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (starting at 1)
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

struct TaskContext {
    name: String,
    request: PeriodicRequest,
    worker: Arc<dyn TickWorker>,
    probe: Arc<dyn ConnectivityProbe>,
    retry: RetryPolicy,
    poll: Duration,
}

/// [`HostScheduler`] backed by one tokio task per registration
pub struct TokioHostScheduler {
    runtime: Handle,
    probe: Arc<dyn ConnectivityProbe>,
    retry: RetryPolicy,
    poll: Duration,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioHostScheduler {
    /// Create a scheduler on the current tokio runtime.
    ///
    /// `poll` is how often connectivity is re-checked while a tick is deferred.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn new(
        probe: Arc<dyn ConnectivityProbe>,
        retry: RetryPolicy,
        poll: Duration,
    ) -> Result<Self, ScheduleError> {
        let runtime =
            Handle::try_current().map_err(|e| ScheduleError::HostUnavailable(e.to_string()))?;
        Ok(Self {
            runtime,
            probe,
            retry,
            poll,
            tasks: Mutex::new(HashMap::new()),
        })
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live registrations
    #[must_use]
    pub fn active(&self) -> usize {
        self.tasks()
            .values()
            .filter(|task| !task.is_finished())
            .count()
    }
}

impl HostScheduler for TokioHostScheduler {
    fn enqueue_unique_periodic(
        &self,
        name: &str,
        request: &PeriodicRequest,
        worker: Arc<dyn TickWorker>,
    ) -> Result<ScheduleHandle, ScheduleError> {
        request.validate()?;

        let context = TaskContext {
            name: name.to_string(),
            request: request.clone(),
            worker,
            probe: self.probe.clone(),
            retry: self.retry,
            poll: self.poll,
        };

        let mut tasks = self.tasks();
        if let Some(previous) = tasks.remove(name) {
            previous.abort();
            log::info!("Replaced periodic work '{name}'");
        }
        tasks.insert(name.to_string(), self.runtime.spawn(run_periodic(context)));

        log::info!(
            "Registered periodic work '{name}' every {:?} (flex {:?})",
            request.interval,
            request.flex
        );
        Ok(ScheduleHandle::new(name, request.interval, request.flex))
    }

    fn cancel_unique(&self, name: &str) -> bool {
        match self.tasks().remove(name) {
            Some(task) => {
                task.abort();
                log::info!("Cancelled periodic work '{name}'");
                true
            }
            None => false,
        }
    }
}

impl Drop for TokioHostScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks().drain() {
            task.abort();
        }
    }
}

async fn run_periodic(context: TaskContext) {
    loop {
        let period_start = Instant::now();
        tokio::time::sleep(context.request.lead()).await;
        run_period(&context).await;
        // A deferred or slow period starts the next one immediately
        tokio::time::sleep_until(period_start + context.request.interval).await;
    }
}

async fn run_period(context: &TaskContext) {
    let mut attempt = 1;
    loop {
        if context.request.requires_network {
            wait_for_network(context).await;
        }

        match run_tick(context).await {
            TickResult::Success => {
                log::debug!("'{}' tick succeeded on attempt {attempt}", context.name);
                return;
            }
            TickResult::Failure => {
                log::warn!("'{}' tick failed permanently, not retrying", context.name);
                return;
            }
            TickResult::Retry if attempt >= context.retry.max_attempts => {
                log::error!(
                    "'{}' tick still failing after {attempt} attempts, waiting for next period",
                    context.name
                );
                return;
            }
            TickResult::Retry => {
                let delay = context.retry.backoff(attempt);
                log::info!(
                    "'{}' tick asked for retry, attempt {} in {delay:?}",
                    context.name,
                    attempt + 1
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Aborts the wrapped task when dropped
struct AbortOnDrop(JoinHandle<TickResult>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run one tick on its own task so a panicking worker asks for a retry
/// instead of ending the periodic work.
async fn run_tick(context: &TaskContext) -> TickResult {
    let worker = context.worker.clone();
    let mut tick = AbortOnDrop(tokio::spawn(async move { worker.on_tick().await }));

    match (&mut tick.0).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            log::error!("'{}' tick panicked, treating as retry", context.name);
            TickResult::Retry
        }
        Err(e) => {
            log::warn!("'{}' tick did not complete: {e}", context.name);
            TickResult::Retry
        }
    }
}

async fn wait_for_network(context: &TaskContext) {
    let mut logged = false;
    while !context.probe.is_connected().await {
        if !logged {
            log::info!(
                "'{}' tick deferred until the network is available",
                context.name
            );
            logged = true;
        }
        tokio::time::sleep(context.poll).await;
    }
}
