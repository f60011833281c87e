use crate::{Epoch, HealthReport, RemoteFailure, StatusReport, SubmissionError, TaskHandle, TaskRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Outcome of one health probe. `probe` grows by one per health tick.
    HealthChecked {
        probe: u64,
        result: Result<HealthReport, String>,
    },
    /// Operator asked the backend to start its browser driver.
    InitializeDriverClicked,
    /// Backend answered the driver initialization request.
    DriverInitialized(Result<String, RemoteFailure>),
    /// Operator submitted a task.
    SubmitRequested(TaskRequest),
    /// Backend answered the submission issued for `epoch`.
    SubmitFinished {
        epoch: Epoch,
        result: Result<TaskHandle, SubmissionError>,
    },
    /// A poll for the task started under `epoch` returned a status.
    StatusPolled { epoch: Epoch, report: StatusReport },
    /// A poll for the task started under `epoch` failed in transport.
    StatusPollFailed { epoch: Epoch },
    /// Operator abandoned the running task.
    CancelRequested,
    /// Operator asked for the result artifact.
    DownloadRequested,
}
