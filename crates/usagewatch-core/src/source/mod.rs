//! Where foreground usage comes from, and whether we may read it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::{error::SourceError, models::UsageRecord};

pub mod usage_log;

pub use usage_log::{LogAccessOracle, UsageLogSource};

/// Lookback window used when none is configured
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Host-specific reader of per-application foreground time
#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Read foreground records for `[window_end - window_duration, window_end)`.
    ///
    /// Never yields zero-second records. Output order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::AccessDenied` when usage access has not been granted.
    async fn read(
        &self,
        window_end: DateTime<Utc>,
        window_duration: Duration,
    ) -> Result<Vec<UsageRecord>, SourceError>;
}

/// Answers whether the host has granted usage access
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    async fn has_usage_access(&self) -> bool;
}
