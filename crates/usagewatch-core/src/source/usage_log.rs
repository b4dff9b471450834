//! Usage source backed by a JSON-lines log of foreground intervals.
//!
//! A platform activity recorder appends one line per foreground interval:
//!
//! ```text
//! {"application_id":"com.whatsapp","start":"2026-10-18T08:00:00Z","end":"2026-10-18T08:12:30Z"}
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use super::{PermissionOracle, UsageSource};
use crate::{error::SourceError, models::UsageRecord};

#[derive(Debug, Deserialize)]
struct ForegroundInterval {
    application_id: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ForegroundInterval {
    /// Whole seconds of this interval that fall inside `[window_start, window_end)`
    fn seconds_within(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> u64 {
        let start = self.start.max(window_start);
        let end = self.end.min(window_end);
        if end <= start {
            return 0;
        }
        u64::try_from((end - start).num_milliseconds() / 1000).unwrap_or(0)
    }
}

pub struct UsageLogSource {
    path: PathBuf,
}

impl UsageLogSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(
        &self,
        contents: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Vec<UsageRecord> {
        let mut records = Vec::new();

        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let interval: ForegroundInterval = match serde_json::from_str(line) {
                Ok(interval) => interval,
                Err(e) => {
                    log::warn!(
                        "Skipping malformed usage line {} in {}: {e}",
                        index + 1,
                        self.path.display()
                    );
                    continue;
                }
            };

            let seconds = interval.seconds_within(window_start, window_end);
            if seconds > 0 {
                records.push(UsageRecord::new(interval.application_id, seconds));
            }
        }

        records
    }
}

#[async_trait]
impl UsageSource for UsageLogSource {
    async fn read(
        &self,
        window_end: DateTime<Utc>,
        window_duration: Duration,
    ) -> Result<Vec<UsageRecord>, SourceError> {
        let lookback = chrono::Duration::from_std(window_duration)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let window_start = window_end
            .checked_sub_signed(lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("Usage log {} does not exist yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(SourceError::AccessDenied);
            }
            Err(e) => return Err(SourceError::Io(e)),
        };

        let records = self.parse(&contents, window_start, window_end);
        log::debug!(
            "Read {} usage records from {} ({window_start} .. {window_end})",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

/// Usage access is granted when the usage log exists and is readable
pub struct LogAccessOracle {
    path: PathBuf,
}

impl LogAccessOracle {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PermissionOracle for LogAccessOracle {
    async fn has_usage_access(&self) -> bool {
        tokio::fs::File::open(&self.path).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DEFAULT_WINDOW;
    use chrono::TimeZone;
    use std::io::Write;

    fn window_end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn write_log(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[tokio::test]
    async fn test_reads_intervals_inside_window() {
        let file = write_log(&[
            r#"{"application_id":"com.a","start":"2026-10-19T10:00:00Z","end":"2026-10-19T11:00:00Z"}"#,
            r#"{"application_id":"com.b","start":"2026-10-19T11:00:00Z","end":"2026-10-19T11:02:00Z"}"#,
            r#"{"application_id":"com.a","start":"2026-10-19T11:10:00Z","end":"2026-10-19T11:11:40Z"}"#,
        ]);

        let source = UsageLogSource::new(file.path());
        let records = source.read(window_end(), DEFAULT_WINDOW).await.unwrap();

        assert_eq!(
            records,
            vec![
                UsageRecord::new("com.a", 3600),
                UsageRecord::new("com.b", 120),
                UsageRecord::new("com.a", 100),
            ]
        );
    }

    #[tokio::test]
    async fn test_clips_intervals_to_window() {
        let file = write_log(&[
            // Starts before the 24h window, 30 minutes inside it
            r#"{"application_id":"com.a","start":"2026-10-18T11:00:00Z","end":"2026-10-18T12:30:00Z"}"#,
            // Runs past the window end
            r#"{"application_id":"com.b","start":"2026-10-19T11:59:00Z","end":"2026-10-19T12:10:00Z"}"#,
            // Entirely outside
            r#"{"application_id":"com.c","start":"2026-10-17T09:00:00Z","end":"2026-10-17T10:00:00Z"}"#,
        ]);

        let source = UsageLogSource::new(file.path());
        let records = source.read(window_end(), DEFAULT_WINDOW).await.unwrap();

        assert_eq!(
            records,
            vec![UsageRecord::new("com.a", 1800), UsageRecord::new("com.b", 60)]
        );
    }

    #[tokio::test]
    async fn test_never_emits_zero_second_records() {
        let file = write_log(&[
            r#"{"application_id":"com.a","start":"2026-10-19T10:00:00Z","end":"2026-10-19T10:00:00.900Z"}"#,
            r#"{"application_id":"com.b","start":"2026-10-19T10:00:00Z","end":"2026-10-19T09:00:00Z"}"#,
        ]);

        let source = UsageLogSource::new(file.path());
        let records = source.read(window_end(), DEFAULT_WINDOW).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_skips_malformed_lines() {
        let file = write_log(&[
            "not json",
            "",
            r#"{"application_id":"com.a"}"#,
            r#"{"application_id":"com.b","start":"2026-10-19T10:00:00Z","end":"2026-10-19T10:00:05Z"}"#,
        ]);

        let source = UsageLogSource::new(file.path());
        let records = source.read(window_end(), DEFAULT_WINDOW).await.unwrap();
        assert_eq!(records, vec![UsageRecord::new("com.b", 5)]);
    }

    #[tokio::test]
    async fn test_missing_log_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let source = UsageLogSource::new(dir.path().join("usage.jsonl"));
        let records = source.read(window_end(), DEFAULT_WINDOW).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_oracle_requires_readable_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.jsonl");
        let oracle = LogAccessOracle::new(&path);
        assert!(!oracle.has_usage_access().await);

        std::fs::write(&path, "").unwrap();
        assert!(oracle.has_usage_access().await);
    }
}
