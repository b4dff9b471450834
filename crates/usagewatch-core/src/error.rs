//! Error types shared across the pipeline.

use thiserror::Error;

/// Failures reading usage from the host
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("usage access has not been granted")]
    AccessDenied,

    #[error("failed to read usage log: {0}")]
    Io(#[from] std::io::Error),
}

/// The name resolver has no display name for an application
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NameResolutionError {
    #[error("no display name for {0}")]
    Unresolvable(String),
}

/// Failures that abort a pipeline run before a delivery outcome exists
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("usage access permission is missing")]
    PermissionDenied,

    #[error(transparent)]
    Source(SourceError),

    #[error("failed to encode payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::AccessDenied => Self::PermissionDenied,
            other => Self::Source(other),
        }
    }
}

/// The collector's response body could not be interpreted
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("response body is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response body is not a JSON object")]
    NotAnObject,
}

/// Failures registering periodic work with the host scheduler
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("invalid schedule: {0}")]
    InvalidRequest(String),

    #[error("host scheduler unavailable: {0}")]
    HostUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_maps_to_permission_denied() {
        let err: PipelineError = SourceError::AccessDenied.into();
        assert!(matches!(err, PipelineError::PermissionDenied));
    }

    #[test]
    fn test_io_error_stays_source_error() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let err: PipelineError = SourceError::from(io).into();
        assert!(matches!(err, PipelineError::Source(SourceError::Io(_))));
    }
}
