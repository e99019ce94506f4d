use std::fmt;

use campus_core::{JobKind, TaskId, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A submission endpoint answered.
    Submitted {
        kind: JobKind,
        result: Result<TaskId, ApiError>,
    },
    /// One poll tick finished, successfully or not.
    TaskStatus {
        task_id: TaskId,
        result: Result<TaskStatus, ApiError>,
    },
    /// The session stopped after its attempt limit without a terminal state.
    PollingExhausted { task_id: TaskId, attempts: u32 },
}

/// The single failure channel of the API client. `message` is always
/// human-readable; `kind` is for logging only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// HTTP status of a server-reported failure.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ApiErrorKind::HttpStatus(code) => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    Io,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::InvalidRequest => write!(f, "invalid request"),
            ApiErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Network => write!(f, "network error"),
            ApiErrorKind::Decode => write!(f, "unexpected response"),
            ApiErrorKind::Io => write!(f, "io error"),
        }
    }
}
