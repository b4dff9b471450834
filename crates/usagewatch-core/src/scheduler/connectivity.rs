use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::error::ScheduleError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Network gate consulted before each tick
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_connected(&self) -> bool;
}

/// Online when a TCP connection to the collector can be opened
#[derive(Debug, Clone)]
pub struct TcpConnectivityProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpConnectivityProbe {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: PROBE_TIMEOUT,
        }
    }

    /// Probe the host and port of the collector endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint has no host or known port.
    pub fn for_endpoint(endpoint: &str) -> Result<Self, ScheduleError> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| ScheduleError::InvalidRequest(format!("bad endpoint {endpoint}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| ScheduleError::InvalidRequest(format!("no host in {endpoint}")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ScheduleError::InvalidRequest(format!("no port for {endpoint}")))?;
        Ok(Self::new(host, port))
    }
}

#[async_trait]
impl ConnectivityProbe for TcpConnectivityProbe {
    async fn is_connected(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        matches!(tokio::time::timeout(self.timeout, connect).await, Ok(Ok(_)))
    }
}
