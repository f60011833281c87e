use thiserror::Error;

/// A submission the caller must refuse before any request leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionViolation {
    #[error("a task is already running")]
    TaskActive,
    #[error("driver not initialized")]
    DriverNotReady,
    #[error("keyword is required")]
    EmptyKeyword,
    #[error("pages must be between 1 and 50, got {0}")]
    PagesOutOfRange(u32),
    #[error("shop id is required")]
    EmptyShopId,
    #[error("include active items, sold-out items, or both")]
    NoItemStateSelected,
    #[error("a CSV file is required")]
    MissingFile,
    #[error("max reviews must be between 1 and 10000, got {0}")]
    MaxReviewsOutOfRange(u32),
}

/// A request the backend refused or that never reached it.
///
/// `Display` is the text shown in the operator log: the backend's own message
/// for rejections, `Error: ...` for transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteFailure {
    #[error("{0}")]
    Rejected(String),
    #[error("Error: {0}")]
    Transport(String),
}

/// Failure of a task submission.
pub type SubmissionError = RemoteFailure;
