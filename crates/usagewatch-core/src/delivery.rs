//! HTTP delivery of usage payloads to the collector.

use anyhow::{Context, Result};
use reqwest::{header, Client};
use std::time::Duration;

use crate::{error::ResponseError, models::DeliveryOutcome};

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Sends payloads to a single collector endpoint.
///
/// Every call to [`DeliveryClient::send`] makes exactly one request; retrying
/// is left to the scheduler.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: Client,
    endpoint: String,
}

impl DeliveryClient {
    /// Create a client for `endpoint`.
    ///
    /// `timeout` bounds the whole request; `None` keeps the HTTP client default.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `payload` and classify the result.
    ///
    /// 2xx is a success; any other status and any network error are transient.
    pub async fn send(&self, payload: Vec<u8>) -> DeliveryOutcome {
        let response = match self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, CONTENT_TYPE_JSON)
            .body(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let kind = if e.is_timeout() {
                    "timed out"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "request failed"
                };
                log::warn!("Delivery to {} {kind}: {e}", self.endpoint);
                return DeliveryOutcome::TransientFailure {
                    reason: format!("{kind}: {e}"),
                };
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Could not read collector response body: {e}");
                String::new()
            }
        };
        log::info!("Collector responded with {status}");

        if status.is_success() {
            DeliveryOutcome::Success {
                status: status.as_u16(),
                body,
            }
        } else {
            DeliveryOutcome::TransientFailure {
                reason: format!("collector returned {status}: {body}"),
            }
        }
    }
}

/// Pull the optional user-facing `message` out of a collector response body.
///
/// Blank messages are treated as absent.
///
/// # Errors
///
/// Returns an error if the body is not a JSON object.
pub fn extract_message(body: &str) -> Result<Option<String>, ResponseError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let object = value.as_object().ok_or(ResponseError::NotAnObject)?;

    Ok(object
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToString::to_string))
}
