use std::collections::VecDeque;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use control_core::{Epoch, HealthReport, StatusReport, TaskHandle, TaskRequest, TaskStatus};
use control_engine::{
    Backend, BackendError, ChannelEventSink, ClientSettings, EngineEvent, EngineHandle,
    FailureKind, RemoteFile,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

/// In-memory backend. Status replies start with `failing_polls` transport
/// errors, then follow a script, then stay `Running`.
#[derive(Default)]
struct ScriptedBackend {
    failing_probes: AtomicUsize,
    failing_polls: AtomicUsize,
    status_delay: Duration,
    statuses: Mutex<VecDeque<TaskStatus>>,
    status_calls: AtomicUsize,
}

impl ScriptedBackend {
    fn with_statuses(statuses: &[TaskStatus]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            ..Self::default()
        }
    }

    fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Backend for ScriptedBackend {
    async fn health(&self) -> Result<HealthReport, BackendError> {
        let failing = self
            .failing_probes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BackendError::new(FailureKind::Network, "connection refused"));
        }
        Ok(HealthReport {
            driver_initialized: true,
        })
    }

    async fn initialize_driver(&self) -> Result<String, BackendError> {
        Ok("Driver initialized.".to_string())
    }

    async fn submit(&self, request: &TaskRequest) -> Result<TaskHandle, BackendError> {
        Ok(TaskHandle::new(format!("{}-1", request.kind().label())))
    }

    async fn task_status(&self, _handle: &TaskHandle) -> Result<StatusReport, BackendError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        let failing = self
            .failing_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BackendError::new(FailureKind::Network, "connection reset"));
        }
        let status = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(TaskStatus::Running);
        Ok(StatusReport::new(status))
    }

    async fn download(&self, file_name: &str) -> Result<Vec<u8>, BackendError> {
        Ok(format!("contents of {file_name}").into_bytes())
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, BackendError> {
        Ok(Vec::new())
    }

    async fn close_driver(&self) -> Result<String, BackendError> {
        Ok("Driver closed".to_string())
    }
}

fn quiet_settings() -> ClientSettings {
    ClientSettings {
        health_interval: Duration::from_secs(3600),
        poll_interval: Duration::from_millis(20),
        ..ClientSettings::default()
    }
}

fn start(
    backend: Arc<ScriptedBackend>,
    settings: ClientSettings,
) -> (EngineHandle, mpsc::Receiver<EngineEvent>) {
    control_logging::initialize_for_tests();
    let (tx, rx) = mpsc::channel();
    let sink = Arc::new(ChannelEventSink::new(tx));
    let engine = EngineHandle::with_backend(backend, settings, sink).unwrap();
    (engine, rx)
}

/// Waits for the next poll outcome, skipping health probes.
fn next_poll(
    rx: &mpsc::Receiver<EngineEvent>,
    within: Duration,
) -> Option<(Epoch, Result<TaskStatus, FailureKind>)> {
    let deadline = Instant::now() + within;
    loop {
        let left = deadline.checked_duration_since(Instant::now())?;
        if let EngineEvent::StatusPolled { epoch, result } = rx.recv_timeout(left).ok()? {
            return Some((epoch, result.map(|r| r.status).map_err(|e| e.kind)));
        }
    }
}

fn next_status(rx: &mpsc::Receiver<EngineEvent>, within: Duration) -> Option<(Epoch, TaskStatus)> {
    next_poll(rx, within).map(|(epoch, result)| (epoch, result.unwrap()))
}

#[test]
fn health_monitor_keeps_probing_through_failures() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.failing_probes.store(2, Ordering::SeqCst);
    let settings = ClientSettings {
        health_interval: Duration::from_millis(20),
        ..quiet_settings()
    };
    let (_engine, rx) = start(backend, settings);

    let mut outcomes = Vec::new();
    while outcomes.len() < 3 {
        if let EngineEvent::HealthChecked { probe, result } = rx.recv_timeout(WAIT).unwrap() {
            outcomes.push((probe, result.is_ok()));
        }
    }
    outcomes.sort();
    assert_eq!(outcomes, vec![(1, false), (2, false), (3, true)]);
}

#[test]
fn poller_stops_after_terminal_status() {
    let backend = Arc::new(ScriptedBackend::with_statuses(&[
        TaskStatus::Running,
        TaskStatus::Completed,
    ]));
    let (engine, rx) = start(backend.clone(), quiet_settings());

    let epoch = Epoch::new(1);
    engine.start_polling(epoch, TaskHandle::new("t-1"));
    assert_eq!(next_status(&rx, WAIT), Some((epoch, TaskStatus::Running)));
    assert_eq!(next_status(&rx, WAIT), Some((epoch, TaskStatus::Completed)));

    assert_eq!(next_status(&rx, Duration::from_millis(150)), None);
    assert_eq!(backend.status_calls(), 2);
}

#[test]
fn stop_polling_silences_the_timer() {
    let backend = Arc::new(ScriptedBackend::default());
    let (engine, rx) = start(backend.clone(), quiet_settings());

    let epoch = Epoch::new(4);
    engine.start_polling(epoch, TaskHandle::new("t-4"));
    assert_eq!(next_status(&rx, WAIT), Some((epoch, TaskStatus::Running)));
    engine.stop_polling(epoch);

    // Let the stop land, then nothing may arrive.
    thread::sleep(Duration::from_millis(50));
    while rx.try_recv().is_ok() {}
    let calls = backend.status_calls();
    assert_eq!(next_status(&rx, Duration::from_millis(150)), None);
    assert_eq!(backend.status_calls(), calls);
}

#[test]
fn response_in_flight_at_stop_is_discarded() {
    let backend = Arc::new(ScriptedBackend {
        status_delay: Duration::from_millis(300),
        ..ScriptedBackend::with_statuses(&[TaskStatus::Completed])
    });
    let (engine, rx) = start(backend.clone(), quiet_settings());

    let epoch = Epoch::new(3);
    engine.start_polling(epoch, TaskHandle::new("slow"));
    let deadline = Instant::now() + WAIT;
    while backend.status_calls() == 0 {
        assert!(Instant::now() < deadline, "status request never issued");
        thread::sleep(Duration::from_millis(5));
    }
    engine.stop_polling(epoch);

    assert_eq!(next_poll(&rx, Duration::from_millis(600)), None);
    assert_eq!(backend.status_calls(), 1);
}

#[test]
fn transport_failures_do_not_stop_polling() {
    let backend = Arc::new(ScriptedBackend::with_statuses(&[TaskStatus::Completed]));
    backend.failing_polls.store(3, Ordering::SeqCst);
    let (engine, rx) = start(backend.clone(), quiet_settings());

    let epoch = Epoch::new(6);
    engine.start_polling(epoch, TaskHandle::new("flaky"));
    let outcomes: Vec<_> = (0..4)
        .map(|_| next_poll(&rx, WAIT).unwrap())
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (epoch, Err(FailureKind::Network)),
            (epoch, Err(FailureKind::Network)),
            (epoch, Err(FailureKind::Network)),
            (epoch, Ok(TaskStatus::Completed)),
        ]
    );

    assert_eq!(next_poll(&rx, Duration::from_millis(150)), None);
    assert_eq!(backend.status_calls(), 4);
}

#[test]
fn new_task_replaces_the_previous_timer() {
    let backend = Arc::new(ScriptedBackend::default());
    let settings = ClientSettings {
        poll_interval: Duration::from_millis(40),
        ..quiet_settings()
    };
    let (engine, rx) = start(backend, settings);

    let first = Epoch::new(1);
    let second = Epoch::new(2);
    engine.start_polling(first, TaskHandle::new("old"));
    engine.start_polling(second, TaskHandle::new("new"));
    // Stopping an older epoch leaves the newer timer alone.
    engine.stop_polling(first);

    for _ in 0..3 {
        assert_eq!(next_status(&rx, WAIT), Some((second, TaskStatus::Running)));
    }
}

#[test]
fn submit_and_driver_init_report_back() {
    let backend = Arc::new(ScriptedBackend::default());
    let (engine, rx) = start(backend, quiet_settings());

    engine.initialize_driver();
    engine.submit(
        Epoch::new(7),
        TaskRequest::Search {
            keyword: "laptop".to_string(),
            pages: 2,
        },
    );

    let mut driver = None;
    let mut submitted = None;
    while driver.is_none() || submitted.is_none() {
        match rx.recv_timeout(WAIT).unwrap() {
            EngineEvent::DriverInitialized(result) => driver = Some(result),
            EngineEvent::Submitted { epoch, result } => submitted = Some((epoch, result)),
            _ => {}
        }
    }
    assert_eq!(driver, Some(Ok("Driver initialized.".to_string())));
    assert_eq!(
        submitted,
        Some((Epoch::new(7), Ok(TaskHandle::new("Search-1"))))
    );
}

#[test]
fn download_saves_into_download_dir() {
    let temp = TempDir::new().unwrap();
    let settings = ClientSettings {
        download_dir: temp.path().join("downloads"),
        ..quiet_settings()
    };
    let backend = Arc::new(ScriptedBackend::default());
    let (engine, rx) = start(backend, settings);

    engine.download("search_laptop.csv");
    let saved = loop {
        if let EngineEvent::Downloaded { file_name, result } = rx.recv_timeout(WAIT).unwrap() {
            assert_eq!(file_name, "search_laptop.csv");
            break result.unwrap();
        }
    };
    assert_eq!(saved, temp.path().join("downloads").join("search_laptop.csv"));
    assert_eq!(
        fs::read_to_string(saved).unwrap(),
        "contents of search_laptop.csv"
    );
}
