/// Manual run and summary preview commands
use anyhow::Result;
use tabled::{Table, Tabled};
use usagewatch_core::{
    models::format_duration, DeliveryOutcome, PipelineError, Scheduler, UsageSummary,
};

#[derive(Tabled)]
struct UsageRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Application")]
    name: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Foreground")]
    foreground: String,
}

fn print_summary(summary: &UsageSummary) {
    println!("\nTop Applications");
    println!("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}");

    if summary.is_empty() {
        println!("No foreground usage recorded.");
        return;
    }

    let rows: Vec<UsageRow> = summary
        .top_entries
        .iter()
        .enumerate()
        .map(|(index, entry)| UsageRow {
            rank: index + 1,
            name: entry.display_name.clone(),
            package: entry.application_id.clone(),
            foreground: format_duration(entry.foreground_seconds),
        })
        .collect();

    println!("{}", Table::new(rows));
    println!(
        "\nTotal screen time: {}",
        format_duration(summary.total_foreground_seconds)
    );
}

fn permission_hint(err: PipelineError) -> anyhow::Error {
    match err {
        PipelineError::PermissionDenied => anyhow::anyhow!(
            "Usage access is not granted. Make sure the activity recorder is running \
             and its usage log is readable."
        ),
        other => other.into(),
    }
}

/// Deliver the current summary immediately and show the collector's answer.
pub async fn handle_run_once(scheduler: &Scheduler) -> Result<()> {
    let run = scheduler.run_once().await.map_err(permission_hint)?;
    print_summary(&run.summary);

    println!("\nDelivery to {}", scheduler.endpoint());
    match &run.outcome {
        DeliveryOutcome::Success { status, body } => {
            println!("Server response: {status}");
            if !body.is_empty() {
                println!("{body}");
            }
            match run.message() {
                Ok(Some(message)) => println!("\n>> Message from collector: {message}"),
                Ok(None) => {}
                Err(e) => println!("\n(Could not read server response: {e})"),
            }
            Ok(())
        }
        DeliveryOutcome::TransientFailure { reason } | DeliveryOutcome::FatalFailure { reason } => {
            anyhow::bail!("Failed to send usage data: {reason}")
        }
    }
}

/// Show the current summary without sending it.
pub async fn handle_summary(scheduler: &Scheduler) -> Result<()> {
    let summary = scheduler.preview().await.map_err(permission_hint)?;
    print_summary(&summary);
    Ok(())
}
