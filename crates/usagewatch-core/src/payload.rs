//! Wire format sent to the collector.

use serde::{Deserialize, Serialize};

use crate::models::{UsageEntry, UsageSummary};

/// Request body of `POST /receive_usage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsagePayload {
    pub total_screen_time_s: u64,
    pub usage_data: Vec<PayloadEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadEntry {
    pub package: String,
    pub app_name: String,
    pub foreground_time_s: u64,
}

impl From<&UsageSummary> for UsagePayload {
    fn from(summary: &UsageSummary) -> Self {
        Self {
            total_screen_time_s: summary.total_foreground_seconds,
            usage_data: summary
                .top_entries
                .iter()
                .map(|entry| PayloadEntry {
                    package: entry.application_id.clone(),
                    app_name: entry.display_name.clone(),
                    foreground_time_s: entry.foreground_seconds,
                })
                .collect(),
        }
    }
}

impl From<UsagePayload> for UsageSummary {
    fn from(payload: UsagePayload) -> Self {
        Self {
            total_foreground_seconds: payload.total_screen_time_s,
            top_entries: payload
                .usage_data
                .into_iter()
                .map(|entry| UsageEntry {
                    application_id: entry.package,
                    display_name: entry.app_name,
                    foreground_seconds: entry.foreground_time_s,
                })
                .collect(),
        }
    }
}

/// Encode a summary as the collector's JSON body, keeping entry order.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails, which plain data cannot trigger.
pub fn build(summary: &UsageSummary) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&UsagePayload::from(summary))
}

/// Decode a body produced by [`build`].
///
/// # Errors
///
/// Returns an error if the bytes are not a valid payload.
pub fn parse(bytes: &[u8]) -> Result<UsagePayload, serde_json::Error> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary() -> UsageSummary {
        UsageSummary {
            total_foreground_seconds: 3920,
            top_entries: vec![
                UsageEntry {
                    application_id: "com.a".to_string(),
                    display_name: "App A".to_string(),
                    foreground_seconds: 3800,
                },
                UsageEntry {
                    application_id: "com.b".to_string(),
                    display_name: "com.b".to_string(),
                    foreground_seconds: 120,
                },
            ],
        }
    }

    #[test]
    fn test_wire_field_names() {
        let bytes = build(&summary()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            value,
            json!({
                "total_screen_time_s": 3920,
                "usage_data": [
                    {"package": "com.a", "app_name": "App A", "foreground_time_s": 3800},
                    {"package": "com.b", "app_name": "com.b", "foreground_time_s": 120}
                ]
            })
        );
    }

    #[test]
    fn test_round_trip_preserves_total_and_order() {
        let original = summary();
        let parsed: UsageSummary = parse(&build(&original).unwrap()).unwrap().into();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_empty_summary_payload() {
        let bytes = build(&UsageSummary::default()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"total_screen_time_s": 0, "usage_data": []}));
    }
}
