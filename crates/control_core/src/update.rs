use chrono::NaiveTime;

use crate::{
    AppState, Effect, Epoch, LogEntry, Msg, StatusReport, SubmissionError, TaskHandle,
    TaskRequest, TaskStatus,
};

/// Log line appended when a task reaches `completed`.
pub const COMPLETED_MESSAGE: &str = "Task completed successfully!";

/// Pure update function: applies a message to state and returns any effects.
///
/// `now` stamps log entries created by the client itself.
pub fn update(mut state: AppState, msg: Msg, now: NaiveTime) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::HealthChecked { probe, result } => {
            state.apply_health(probe, result.ok());
            Vec::new()
        }
        Msg::InitializeDriverClicked => {
            state.push_log(LogEntry::info("Initializing driver...", now));
            vec![Effect::InitializeDriver]
        }
        Msg::DriverInitialized(Ok(message)) => {
            state.mark_driver_initialized();
            state.push_log(LogEntry::success(message, now));
            Vec::new()
        }
        Msg::DriverInitialized(Err(failure)) => {
            state.push_log(LogEntry::error(failure.to_string(), now));
            Vec::new()
        }
        Msg::SubmitRequested(request) => submit(&mut state, request),
        Msg::SubmitFinished { epoch, result } => submit_finished(&mut state, epoch, result, now),
        Msg::StatusPolled { epoch, report } => status_polled(&mut state, epoch, report, now),
        Msg::StatusPollFailed { epoch } => {
            if state.is_polling(epoch) {
                state.record_poll_failure();
            }
            Vec::new()
        }
        Msg::CancelRequested => {
            if state.is_running() {
                let abandoned = state.cancel();
                state.push_log(LogEntry::info("Task cancelled.", now));
                vec![Effect::StopPolling { epoch: abandoned }]
            } else {
                Vec::new()
            }
        }
        Msg::DownloadRequested => state.result().download().into_iter().collect(),
    };

    (state, effects)
}

fn submit(state: &mut AppState, request: TaskRequest) -> Vec<Effect> {
    if let Err(violation) = state.check_submission(&request) {
        state.reject(violation);
        return Vec::new();
    }
    let previous = state.epoch();
    let epoch = state.begin_submission(request.kind());
    // The stop goes out first so no earlier timer outlives the new submission.
    vec![
        Effect::StopPolling { epoch: previous },
        Effect::Submit { epoch, request },
    ]
}

fn submit_finished(
    state: &mut AppState,
    epoch: Epoch,
    result: Result<TaskHandle, SubmissionError>,
    now: NaiveTime,
) -> Vec<Effect> {
    let Some(kind) = state.submitting_kind(epoch) else {
        return Vec::new();
    };
    match result {
        Ok(handle) => {
            state.begin_polling(epoch, kind, handle.clone());
            state.push_log(LogEntry::info(
                format!("{} task started...", kind.label()),
                now,
            ));
            vec![Effect::StartPolling { epoch, handle }]
        }
        Err(failure) => {
            state.finish();
            state.push_log(LogEntry::error(failure.to_string(), now));
            Vec::new()
        }
    }
}

fn status_polled(
    state: &mut AppState,
    epoch: Epoch,
    report: StatusReport,
    now: NaiveTime,
) -> Vec<Effect> {
    if !state.is_polling(epoch) {
        return Vec::new();
    }
    state.reset_poll_failures();
    state.merge_logs(report.logs);
    match report.status {
        TaskStatus::Pending | TaskStatus::Running => Vec::new(),
        TaskStatus::Completed => {
            if let Some(artifact) = report.result {
                state.store_result(artifact);
            }
            state.push_log(LogEntry::success(COMPLETED_MESSAGE, now));
            state.finish();
            vec![Effect::StopPolling { epoch }]
        }
        TaskStatus::Error => {
            let message = report.error.as_deref().unwrap_or("unknown error");
            state.push_log(LogEntry::error(format!("Error: {message}"), now));
            state.finish();
            vec![Effect::StopPolling { epoch }]
        }
    }
}
