use crate::{ConnectionState, LogEntry, PreconditionViolation, TaskHandle, TaskKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub display_name: String,
    pub output_file: String,
    pub details: Vec<(String, String)>,
}

/// Read-only snapshot handed to renderers and subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub connection: ConnectionState,
    pub running: bool,
    pub active_kind: Option<TaskKind>,
    pub task_handle: Option<TaskHandle>,
    pub logs: Vec<LogEntry>,
    pub result: Option<ResultView>,
    pub last_rejection: Option<PreconditionViolation>,
    /// Consecutive transport failures while polling the current task.
    pub poll_failures: u32,
}
