pub mod config;
pub mod monitor;
pub mod run;

use anyhow::{Context, Result};
use std::sync::Arc;
use usagewatch_core::{
    names::CatalogNameResolver,
    notify::Notifier,
    scheduler::{RetryPolicy, ScheduleRegistry, TcpConnectivityProbe, TokioHostScheduler},
    source::{LogAccessOracle, UsageLogSource},
    Config, DeliveryClient, Scheduler, UsagePipeline,
};

/// Prints collector messages to the terminal
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        println!("\n>> Message from collector: {message}\n");
    }
}

/// Wire the pipeline and scheduler from configuration.
pub fn build_scheduler(config: &Config) -> Result<Arc<Scheduler>> {
    let log_path = config.usage.log_path()?;
    let client = DeliveryClient::new(&config.collector.endpoint, config.collector.timeout())?;

    let pipeline = UsagePipeline::new(
        Arc::new(UsageLogSource::new(&log_path)),
        Arc::new(CatalogNameResolver::new(&config.names)),
        client,
        config.usage.lookback(),
    );

    let schedule = &config.schedule;
    let probe = TcpConnectivityProbe::for_endpoint(&config.collector.endpoint)?;
    let host = TokioHostScheduler::new(
        Arc::new(probe),
        RetryPolicy {
            initial_backoff: std::time::Duration::from_secs(schedule.initial_backoff_seconds),
            max_backoff: std::time::Duration::from_secs(schedule.max_backoff_seconds),
            max_attempts: schedule.max_attempts,
        },
        std::time::Duration::from_secs(schedule.connectivity_poll_seconds),
    )
    .context("Failed to start host scheduler")?;

    Ok(Arc::new(Scheduler::new(
        pipeline,
        Arc::new(LogAccessOracle::new(log_path)),
        Arc::new(ConsoleNotifier),
        Arc::new(host),
        ScheduleRegistry::global(),
    )))
}
