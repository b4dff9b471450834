//! Source -> Aggregator -> Payload -> Delivery, shared by ticks and manual runs.

use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};

use crate::{
    aggregator::Aggregator,
    delivery::{extract_message, DeliveryClient},
    error::{PipelineError, ResponseError},
    models::{DeliveryOutcome, UsageSummary},
    names::NameResolver,
    payload,
    source::UsageSource,
};

/// What one pipeline invocation produced
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub summary: UsageSummary,
    pub outcome: DeliveryOutcome,
}

impl PipelineRun {
    /// Message the collector attached to a successful delivery, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if a success body is not a JSON object.
    pub fn message(&self) -> Result<Option<String>, ResponseError> {
        match &self.outcome {
            DeliveryOutcome::Success { body, .. } => extract_message(body),
            _ => Ok(None),
        }
    }
}

pub struct UsagePipeline {
    source: Arc<dyn UsageSource>,
    aggregator: Aggregator,
    client: DeliveryClient,
    window: Duration,
}

impl UsagePipeline {
    #[must_use]
    pub fn new(
        source: Arc<dyn UsageSource>,
        resolver: Arc<dyn NameResolver>,
        client: DeliveryClient,
        window: Duration,
    ) -> Self {
        Self {
            source,
            aggregator: Aggregator::new(resolver),
            client,
            window,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    /// Read and aggregate usage for the window ending at `window_end`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::PermissionDenied` if the source refuses access,
    /// or `PipelineError::Source` if reading fails otherwise.
    pub async fn summarize(&self, window_end: DateTime<Utc>) -> Result<UsageSummary, PipelineError> {
        let records = self.source.read(window_end, self.window).await?;
        Ok(self.aggregator.summarize(&records))
    }

    /// Summarize and deliver once.
    ///
    /// # Errors
    ///
    /// Returns an error if the usage cannot be read or encoded. Delivery
    /// problems are reported through [`PipelineRun::outcome`] instead.
    pub async fn execute(&self, window_end: DateTime<Utc>) -> Result<PipelineRun, PipelineError> {
        let summary = self.summarize(window_end).await?;
        log::info!(
            "Summarized {} applications, {}s total",
            summary.top_entries.len(),
            summary.total_foreground_seconds
        );

        let body = payload::build(&summary)?;
        let outcome = self.client.send(body).await;
        log::info!("Delivery to {}: {}", self.client.endpoint(), outcome.label());

        Ok(PipelineRun { summary, outcome })
    }
}
