use std::fmt;

use crate::view_model::{AppViewModel, ResultView};
use crate::{
    LogAggregator, LogEntry, PreconditionViolation, ResultArtifact, ResultStore, TaskKind,
    TaskRequest,
};

/// Submission counter. Every submission or cancellation moves to a new epoch, and
/// responses tagged with any other epoch are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(u64);

impl Epoch {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque task id issued by the backend on a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle(String);

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub connected: bool,
    pub driver_initialized: bool,
}

/// Body of a successful health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub driver_initialized: bool,
}

/// Where the single task slot stands. Anything but `Idle` counts as running.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskPhase {
    #[default]
    Idle,
    Submitting {
        epoch: Epoch,
        kind: TaskKind,
    },
    Polling {
        epoch: Epoch,
        kind: TaskKind,
        handle: TaskHandle,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    connection: ConnectionState,
    last_probe: Option<u64>,
    epoch: Epoch,
    phase: TaskPhase,
    logs: LogAggregator,
    result: ResultStore,
    last_rejection: Option<PreconditionViolation>,
    poll_failures: u32,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn phase(&self) -> &TaskPhase {
        &self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase != TaskPhase::Idle
    }

    pub fn logs(&self) -> &LogAggregator {
        &self.logs
    }

    pub fn result(&self) -> &ResultStore {
        &self.result
    }

    pub fn view(&self) -> AppViewModel {
        let (active_kind, task_handle) = match &self.phase {
            TaskPhase::Idle => (None, None),
            TaskPhase::Submitting { kind, .. } => (Some(*kind), None),
            TaskPhase::Polling { kind, handle, .. } => (Some(*kind), Some(handle.clone())),
        };
        AppViewModel {
            connection: self.connection,
            running: self.is_running(),
            active_kind,
            task_handle,
            logs: self.logs.entries().to_vec(),
            result: self.result.get().map(|artifact| ResultView {
                display_name: artifact.display_name().to_string(),
                output_file: artifact.output_file.clone(),
                details: artifact.details.clone(),
            }),
            last_rejection: self.last_rejection.clone(),
            poll_failures: self.poll_failures,
        }
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Applies a probe outcome unless a newer probe was already applied.
    pub(crate) fn apply_health(&mut self, probe: u64, report: Option<HealthReport>) -> bool {
        if self.last_probe.is_some_and(|last| probe <= last) {
            return false;
        }
        self.last_probe = Some(probe);
        let next = match report {
            Some(report) => ConnectionState {
                connected: true,
                driver_initialized: report.driver_initialized,
            },
            // Transport failure keeps the last known driver flag.
            None => ConnectionState {
                connected: false,
                ..self.connection
            },
        };
        if next != self.connection {
            self.connection = next;
            self.mark_dirty();
        }
        true
    }

    pub(crate) fn mark_driver_initialized(&mut self) {
        if !self.connection.driver_initialized {
            self.connection.driver_initialized = true;
            self.mark_dirty();
        }
    }

    pub(crate) fn check_submission(&self, request: &TaskRequest) -> Result<(), PreconditionViolation> {
        if self.is_running() {
            return Err(PreconditionViolation::TaskActive);
        }
        if request.kind().requires_driver() && !self.connection.driver_initialized {
            return Err(PreconditionViolation::DriverNotReady);
        }
        request.validate()
    }

    pub(crate) fn reject(&mut self, violation: PreconditionViolation) {
        self.last_rejection = Some(violation);
        self.mark_dirty();
    }

    /// Opens a new run: fresh epoch, empty log and result, running.
    pub(crate) fn begin_submission(&mut self, kind: TaskKind) -> Epoch {
        self.epoch = self.epoch.next();
        self.logs.clear();
        self.result.clear();
        self.last_rejection = None;
        self.poll_failures = 0;
        self.phase = TaskPhase::Submitting {
            epoch: self.epoch,
            kind,
        };
        self.mark_dirty();
        self.epoch
    }

    pub(crate) fn submitting_kind(&self, epoch: Epoch) -> Option<TaskKind> {
        match &self.phase {
            TaskPhase::Submitting { epoch: current, kind } if *current == epoch => Some(*kind),
            _ => None,
        }
    }

    pub(crate) fn is_polling(&self, epoch: Epoch) -> bool {
        matches!(&self.phase, TaskPhase::Polling { epoch: current, .. } if *current == epoch)
    }

    pub(crate) fn begin_polling(&mut self, epoch: Epoch, kind: TaskKind, handle: TaskHandle) {
        self.phase = TaskPhase::Polling {
            epoch,
            kind,
            handle,
        };
        self.mark_dirty();
    }

    /// Leaves the running state; the log and result stay readable.
    pub(crate) fn finish(&mut self) {
        self.phase = TaskPhase::Idle;
        self.mark_dirty();
    }

    /// Abandons the run and moves to a new epoch so late answers are discarded.
    pub(crate) fn cancel(&mut self) -> Epoch {
        let abandoned = self.epoch;
        self.epoch = self.epoch.next();
        self.finish();
        abandoned
    }

    pub(crate) fn push_log(&mut self, entry: LogEntry) {
        if self.logs.append(entry) {
            self.mark_dirty();
        }
    }

    pub(crate) fn merge_logs(&mut self, entries: Vec<LogEntry>) {
        if self.logs.append_all(entries) > 0 {
            self.mark_dirty();
        }
    }

    pub(crate) fn store_result(&mut self, artifact: ResultArtifact) {
        self.result.set(artifact);
        self.mark_dirty();
    }

    pub(crate) fn record_poll_failure(&mut self) {
        self.poll_failures = self.poll_failures.saturating_add(1);
        self.mark_dirty();
    }

    pub(crate) fn reset_poll_failures(&mut self) {
        if self.poll_failures != 0 {
            self.poll_failures = 0;
            self.mark_dirty();
        }
    }
}
