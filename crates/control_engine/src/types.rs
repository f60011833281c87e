use std::fmt;
use std::path::PathBuf;

use control_core::{Epoch, HealthReport, RemoteFailure, StatusReport, TaskHandle};
use serde::Deserialize;

/// Everything the engine reports back to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    HealthChecked {
        probe: u64,
        result: Result<HealthReport, BackendError>,
    },
    DriverInitialized(Result<String, BackendError>),
    Submitted {
        epoch: Epoch,
        result: Result<TaskHandle, BackendError>,
    },
    StatusPolled {
        epoch: Epoch,
        result: Result<StatusReport, BackendError>,
    },
    Downloaded {
        file_name: String,
        result: Result<PathBuf, BackendError>,
    },
}

/// An output file listed by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteFile {
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    /// Creation time in seconds since the Unix epoch.
    #[serde(default)]
    pub created: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        self.kind == FailureKind::Rejected
    }
}

impl From<BackendError> for RemoteFailure {
    fn from(err: BackendError) -> Self {
        if err.is_rejection() {
            RemoteFailure::Rejected(err.message)
        } else {
            RemoteFailure::Transport(err.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// The backend answered `success: false`.
    Rejected,
    Decode,
    TooLarge { max_bytes: u64 },
    Write,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Rejected => write!(f, "rejected"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::TooLarge { max_bytes } => {
                write!(f, "response larger than {max_bytes} bytes")
            }
            FailureKind::Write => write!(f, "write error"),
        }
    }
}
