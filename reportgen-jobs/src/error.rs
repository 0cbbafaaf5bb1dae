use thiserror::Error;

use reportgen_core::{ConfigError, ErrorDetail, RequestError};
use reportgen_renderer::RenderError;

/// Failure talking to a remote collaborator.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The service answered with a structured refusal.
    #[error("rejected by report service: {0}")]
    Rejected(ErrorDetail),

    /// Network-level failure: connect, timeout, 5xx without a payload.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered, but not in a shape we understand.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ServiceError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ServiceError::Transport(_))
    }
}

impl From<ConfigError> for ServiceError {
    fn from(err: ConfigError) -> Self {
        ServiceError::Protocol(err.to_string())
    }
}

/// Error surface of [`OrchestratorHandle`](crate::OrchestratorHandle) and the
/// report pipeline.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// `submit` outside `Idle`.
    #[error("a job is already {phase}; reset before submitting again")]
    NotIdle { phase: &'static str },

    /// A submission or job is in flight.
    #[error("a report is being generated")]
    Busy,

    #[error("report was rejected: {0}")]
    Rejected(ErrorDetail),

    #[error("report failed: {0}")]
    Failed(ErrorDetail),

    #[error("report was cancelled")]
    Cancelled,

    #[error("orchestrator is no longer running")]
    ActorGone,

    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("preview session has stopped")]
    Closed,
}
