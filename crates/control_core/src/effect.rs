use crate::{Epoch, TaskHandle, TaskRequest};

/// Side effects requested by `update`; the host executes them against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    InitializeDriver,
    Submit { epoch: Epoch, request: TaskRequest },
    StartPolling { epoch: Epoch, handle: TaskHandle },
    /// Stop the poll timer if it belongs to `epoch` or an older submission.
    StopPolling { epoch: Epoch },
    Download { file_name: String },
}
