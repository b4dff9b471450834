/// Periodic monitoring in the foreground
use anyhow::Result;
use chrono::Local;
use std::sync::Arc;
use usagewatch_core::{Config, PeriodicRequest, Scheduler};

pub async fn handle_monitor(scheduler: Arc<Scheduler>, config: &Config, now: bool) -> Result<()> {
    let request = PeriodicRequest {
        interval: config.schedule.interval(),
        flex: config.schedule.flex(),
        requires_network: true,
    };

    let handle = scheduler.register_periodic(&request)?;
    let registered = handle.registered_at.with_timezone(&Local);
    println!(
        "Periodic monitoring scheduled every {} minutes (id {}, registered {}).",
        config.schedule.interval_minutes,
        handle.id,
        registered.format("%Y-%m-%d %H:%M:%S")
    );
    if let Ok(lead) = chrono::Duration::from_std(request.lead()) {
        println!(
            "First upload window opens around {}. Press Ctrl-C to stop.",
            (registered + lead).format("%H:%M:%S")
        );
    }

    if now {
        let result = scheduler.on_tick().await;
        log::info!("Initial tick: {result:?}");
    }

    tokio::signal::ctrl_c().await?;
    log::info!("Received Ctrl-C, shutting down...");

    if let Some(cancelled) = scheduler.cancel() {
        log::info!("Monitoring stopped (id {}).", cancelled.id);
    }
    Ok(())
}
