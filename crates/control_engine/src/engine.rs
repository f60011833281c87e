use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use control_core::{Epoch, TaskHandle, TaskRequest};
use control_logging::{control_debug, control_info};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::download::download_artifact;
use crate::{Backend, BackendError, ClientSettings, EngineEvent, HealthMonitor, ReqwestBackend, TaskPoller};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("backend configuration: {0}")]
    Backend(#[from] BackendError),
    #[error("failed to start engine: {0}")]
    Startup(#[from] std::io::Error),
}

/// Receives engine events on whatever thread produced them.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

enum EngineCommand {
    InitializeDriver,
    Submit { epoch: Epoch, request: TaskRequest },
    StartPolling { epoch: Epoch, handle: TaskHandle },
    StopPolling { epoch: Epoch },
    Download { file_name: String },
    Shutdown,
}

/// Runs backend IO on a private tokio runtime. The health monitor starts with the
/// handle; dropping the handle stops every timer.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        let backend = Arc::new(ReqwestBackend::new(&settings)?);
        Self::with_backend(backend, settings, sink)
    }

    pub fn with_backend(
        backend: Arc<dyn Backend>,
        settings: ClientSettings,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("control-engine-io")
            .enable_all()
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("control-engine".to_string())
            .spawn(move || run_engine(runtime, backend, settings, sink, cmd_rx))?;

        Ok(Self {
            cmd_tx,
            worker: Some(worker),
        })
    }

    pub fn initialize_driver(&self) {
        let _ = self.cmd_tx.send(EngineCommand::InitializeDriver);
    }

    pub fn submit(&self, epoch: Epoch, request: TaskRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { epoch, request });
    }

    pub fn start_polling(&self, epoch: Epoch, handle: TaskHandle) {
        let _ = self.cmd_tx.send(EngineCommand::StartPolling { epoch, handle });
    }

    pub fn stop_polling(&self, epoch: Epoch) {
        let _ = self.cmd_tx.send(EngineCommand::StopPolling { epoch });
    }

    pub fn download(&self, file_name: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Download {
            file_name: file_name.into(),
        });
    }

    /// Stops both timers and waits for the engine thread to exit.
    pub fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_engine(
    runtime: tokio::runtime::Runtime,
    backend: Arc<dyn Backend>,
    settings: ClientSettings,
    sink: Arc<dyn EventSink>,
    cmd_rx: mpsc::Receiver<EngineCommand>,
) {
    let root = CancellationToken::new();
    let io = runtime.handle().clone();

    HealthMonitor::new(backend.clone(), settings.health_interval, sink.clone())
        .spawn(&io, root.child_token());
    let mut poller = TaskPoller::new(backend.clone(), settings.poll_interval, sink.clone());

    while let Ok(command) = cmd_rx.recv() {
        match command {
            EngineCommand::Shutdown => break,
            EngineCommand::StartPolling { epoch, handle } => {
                poller.start(&io, &root, epoch, handle);
            }
            EngineCommand::StopPolling { epoch } => poller.stop_through(epoch),
            EngineCommand::InitializeDriver => {
                let backend = backend.clone();
                let sink = sink.clone();
                io.spawn(async move {
                    let result = backend.initialize_driver().await;
                    sink.emit(EngineEvent::DriverInitialized(result));
                });
            }
            EngineCommand::Submit { epoch, request } => {
                control_info!("Submitting {} task ({})", request.kind(), epoch);
                let backend = backend.clone();
                let sink = sink.clone();
                io.spawn(async move {
                    let result = backend.submit(&request).await;
                    sink.emit(EngineEvent::Submitted { epoch, result });
                });
            }
            EngineCommand::Download { file_name } => {
                let backend = backend.clone();
                let sink = sink.clone();
                let dir = settings.download_dir.clone();
                io.spawn(async move {
                    let result = download_artifact(backend.as_ref(), &dir, &file_name).await;
                    sink.emit(EngineEvent::Downloaded { file_name, result });
                });
            }
        }
    }

    control_debug!("Engine shutting down");
    poller.stop();
    root.cancel();
    runtime.shutdown_timeout(Duration::from_millis(500));
}
