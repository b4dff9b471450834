//! Folds raw usage records into a ranked summary.

use std::{collections::HashMap, sync::Arc};

use crate::{
    models::{UsageEntry, UsageRecord, UsageSummary, TOP_N},
    names::NameResolver,
};

pub struct Aggregator {
    resolver: Arc<dyn NameResolver>,
}

impl Aggregator {
    #[must_use]
    pub fn new(resolver: Arc<dyn NameResolver>) -> Self {
        Self { resolver }
    }

    /// Group records by application, rank by summed seconds and keep the top entries.
    ///
    /// The total always covers every application, not just the ones kept.
    /// Equal totals keep the order in which the application was first seen.
    #[must_use]
    pub fn summarize(&self, records: &[UsageRecord]) -> UsageSummary {
        let mut order: Vec<&str> = Vec::new();
        let mut per_app: HashMap<&str, u64> = HashMap::new();

        for record in records {
            let id = record.application_id.as_str();
            let seconds = per_app.entry(id).or_insert_with(|| {
                order.push(id);
                0
            });
            *seconds = seconds.saturating_add(record.foreground_seconds);
        }

        let mut grouped: Vec<(&str, u64)> = order
            .into_iter()
            .map(|id| (id, per_app.get(id).copied().unwrap_or(0)))
            .collect();

        let total_foreground_seconds = grouped
            .iter()
            .fold(0u64, |acc, (_, seconds)| acc.saturating_add(*seconds));

        // Stable sort keeps first-seen order among ties
        grouped.sort_by(|a, b| b.1.cmp(&a.1));
        grouped.truncate(TOP_N);

        let top_entries = grouped
            .into_iter()
            .map(|(id, seconds)| UsageEntry {
                application_id: id.to_string(),
                display_name: self.display_name(id),
                foreground_seconds: seconds,
            })
            .collect();

        UsageSummary {
            total_foreground_seconds,
            top_entries,
        }
    }

    fn display_name(&self, application_id: &str) -> String {
        match self.resolver.resolve_display_name(application_id) {
            Ok(name) => name,
            Err(e) => {
                log::debug!("{e}, falling back to the application id");
                application_id.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NameResolutionError;

    /// Resolves every id to an upper-cased name except the ones listed as unknown
    struct FakeResolver {
        unknown: Vec<&'static str>,
    }

    impl NameResolver for FakeResolver {
        fn resolve_display_name(&self, application_id: &str) -> Result<String, NameResolutionError> {
            if self.unknown.iter().any(|id| *id == application_id) {
                Err(NameResolutionError::Unresolvable(application_id.to_string()))
            } else {
                Ok(application_id.to_uppercase())
            }
        }
    }

    fn aggregator(unknown: Vec<&'static str>) -> Aggregator {
        Aggregator::new(Arc::new(FakeResolver { unknown }))
    }

    fn entry(id: &str, seconds: u64) -> (String, u64) {
        (id.to_string(), seconds)
    }

    fn ranked(summary: &UsageSummary) -> Vec<(String, u64)> {
        summary
            .top_entries
            .iter()
            .map(|e| (e.application_id.clone(), e.foreground_seconds))
            .collect()
    }

    #[test]
    fn test_groups_and_ranks_records() {
        let records = vec![
            UsageRecord::new("com.a", 3700),
            UsageRecord::new("com.b", 120),
            UsageRecord::new("com.a", 100),
        ];

        let summary = aggregator(vec![]).summarize(&records);

        assert_eq!(summary.total_foreground_seconds, 3920);
        assert_eq!(
            ranked(&summary),
            vec![entry("com.a", 3800), entry("com.b", 120)]
        );
        assert_eq!(summary.top_entries[0].display_name, "COM.A");
    }

    #[test]
    fn test_empty_records() {
        let summary = aggregator(vec![]).summarize(&[]);
        assert_eq!(summary.total_foreground_seconds, 0);
        assert!(summary.top_entries.is_empty());
    }

    #[test]
    fn test_unresolvable_name_falls_back_to_id() {
        let records = vec![
            UsageRecord::new("com.unknown", 50),
            UsageRecord::new("com.known", 40),
        ];

        let summary = aggregator(vec!["com.unknown"]).summarize(&records);

        assert_eq!(summary.top_entries[0].display_name, "com.unknown");
        assert_eq!(summary.top_entries[1].display_name, "COM.KNOWN");
    }

    #[test]
    fn test_total_is_not_truncated() {
        let records: Vec<UsageRecord> = (1..=15)
            .map(|i| UsageRecord::new(format!("app.{i}"), i * 10))
            .collect();
        let expected_total: u64 = records.iter().map(|r| r.foreground_seconds).sum();

        let summary = aggregator(vec![]).summarize(&records);

        assert_eq!(summary.total_foreground_seconds, expected_total);
        assert_eq!(summary.top_entries.len(), TOP_N);
        assert_eq!(summary.top_entries[0].application_id, "app.15");
        assert_eq!(summary.top_entries[9].application_id, "app.6");
    }

    #[test]
    fn test_fewer_than_ten_applications() {
        let records = vec![
            UsageRecord::new("com.a", 1),
            UsageRecord::new("com.b", 2),
            UsageRecord::new("com.a", 3),
        ];
        let summary = aggregator(vec![]).summarize(&records);
        assert_eq!(summary.top_entries.len(), 2);
    }

    #[test]
    fn test_sorted_descending_with_many_groups() {
        // Deterministic pseudo-random spread of ids and durations
        let records: Vec<UsageRecord> = (0u64..200)
            .map(|i| UsageRecord::new(format!("app.{}", (i * 7) % 23), (i * 37) % 101 + 1))
            .collect();

        let summary = aggregator(vec![]).summarize(&records);

        assert_eq!(summary.top_entries.len(), TOP_N);
        for pair in summary.top_entries.windows(2) {
            assert!(pair[0].foreground_seconds >= pair[1].foreground_seconds);
        }

        for top in &summary.top_entries {
            let expected: u64 = records
                .iter()
                .filter(|r| r.application_id == top.application_id)
                .map(|r| r.foreground_seconds)
                .sum();
            assert_eq!(top.foreground_seconds, expected);
        }

        let total: u64 = records.iter().map(|r| r.foreground_seconds).sum();
        assert_eq!(summary.total_foreground_seconds, total);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let records = vec![
            UsageRecord::new("com.c", 60),
            UsageRecord::new("com.a", 60),
            UsageRecord::new("com.b", 90),
        ];

        let summary = aggregator(vec![]).summarize(&records);

        assert_eq!(
            ranked(&summary),
            vec![entry("com.b", 90), entry("com.c", 60), entry("com.a", 60)]
        );
    }
}
