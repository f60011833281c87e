use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use control_core::{FileUpload, Msg, Store, TaskRequest, TaskStatus};
use control_engine::{
    Backend, ChannelEventSink, ClientSettings, EngineEvent, EngineHandle, ReqwestBackend,
};
use control_logging::{control_debug, control_info, level_for};

use super::cli::{Cli, Command, RunOptions};
use super::config::{self, Overrides, DEFAULT_CONFIG_FILE};
use super::effects::{map_event, EffectRunner};
use super::logging::{self, LogDestination};
use super::render::TerminalRenderer;

const FIRST_PROBE_WAIT: Duration = Duration::from_secs(15);
/// Longest silence tolerated from the engine while a task runs.
const EVENT_WAIT: Duration = Duration::from_secs(300);

pub fn run_app() -> Result<ExitCode> {
    let cli = Cli::parse();

    let destination = if cli.log_file {
        LogDestination::Both
    } else {
        LogDestination::Terminal
    };
    logging::initialize(destination, level_for(cli.verbose));

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let settings = config::load(&config_path).into_settings(Overrides {
        base_url: cli.base_url.clone(),
        download_dir: cli.download_dir.clone(),
    });
    control_debug!("Backend address {}", settings.base_url);

    match cli.command {
        Command::Search {
            keyword,
            pages,
            run,
        } => run_task(settings, TaskRequest::Search { keyword, pages }, run),
        Command::Shop {
            shop_id,
            no_active,
            no_soldout,
            run,
        } => run_task(
            settings,
            TaskRequest::Shop {
                shop_id,
                include_active: !no_active,
                include_sold_out: !no_soldout,
            },
            run,
        ),
        Command::Reviews {
            file,
            max_reviews,
            run,
        } => run_task(
            settings,
            TaskRequest::Reviews {
                file: read_upload(&file)?,
                max_reviews,
            },
            run,
        ),
        Command::Analyze { file, run } => run_task(
            settings,
            TaskRequest::Analyze {
                file: read_upload(&file)?,
            },
            run,
        ),
        Command::InitDriver => init_driver(settings),
        Command::Status => status(settings),
        Command::Watch => watch(settings),
        Command::Files => list_files(settings),
        Command::CloseDriver => close_driver(settings),
    }
}

fn read_upload(path: &Path) -> Result<FileUpload> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(FileUpload::new(file_name, bytes))
}

/// The core store wired to a running engine, rendering to the terminal.
struct Session {
    store: Store,
    runner: EffectRunner,
    events: mpsc::Receiver<EngineEvent>,
    completed: bool,
}

impl Session {
    fn start(settings: ClientSettings) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let engine = EngineHandle::new(settings, Arc::new(ChannelEventSink::new(tx)))?;

        let mut store = Store::new();
        let mut renderer = TerminalRenderer::default();
        store.subscribe(move |view| {
            for line in renderer.render(view) {
                println!("{line}");
            }
        });

        Ok(Self {
            store,
            runner: EffectRunner::new(engine),
            events: rx,
            completed: false,
        })
    }

    fn dispatch(&mut self, msg: Msg) {
        let effects = self.store.dispatch(msg);
        self.runner.enqueue(effects);
    }

    /// Receives one engine event, feeds it to the core and hands it back.
    fn next_event(&mut self, timeout: Duration) -> Result<EngineEvent> {
        let event = match self.events.recv_timeout(timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => bail!("no answer from the backend in {timeout:?}"),
            Err(RecvTimeoutError::Disconnected) => bail!("engine stopped unexpectedly"),
        };

        if let EngineEvent::StatusPolled {
            epoch,
            result: Ok(report),
        } = &event
        {
            let state = self.store.state();
            if report.status == TaskStatus::Completed
                && *epoch == state.epoch()
                && state.is_running()
            {
                self.completed = true;
            }
        }

        if let Some(msg) = map_event(event.clone()) {
            self.dispatch(msg);
        }
        Ok(event)
    }

    /// Waits for the first health probe; returns whether the backend answered.
    fn wait_for_backend(&mut self) -> Result<bool> {
        loop {
            if let EngineEvent::HealthChecked { .. } = self.next_event(FIRST_PROBE_WAIT)? {
                return Ok(self.store.state().connection().connected);
            }
        }
    }

    fn initialize_driver(&mut self) -> Result<bool> {
        self.dispatch(Msg::InitializeDriverClicked);
        loop {
            if let EngineEvent::DriverInitialized(_) = self.next_event(EVENT_WAIT)? {
                return Ok(self.store.state().connection().driver_initialized);
            }
        }
    }

    fn download_result(&mut self) -> Result<ExitCode> {
        let effects = self.store.dispatch(Msg::DownloadRequested);
        if effects.is_empty() {
            eprintln!("The task produced no result file");
            return Ok(ExitCode::FAILURE);
        }
        self.runner.enqueue(effects);

        loop {
            if let EngineEvent::Downloaded { file_name, result } = self.next_event(EVENT_WAIT)? {
                return match result {
                    Ok(path) => {
                        println!("Saved {file_name} to {}", path.display());
                        Ok(ExitCode::SUCCESS)
                    }
                    Err(err) => {
                        eprintln!("Download of {file_name} failed: {err}");
                        Ok(ExitCode::FAILURE)
                    }
                };
            }
        }
    }
}

fn connect(settings: ClientSettings) -> Result<Option<Session>> {
    let base_url = settings.base_url.clone();
    let mut session = Session::start(settings)?;
    if session.wait_for_backend()? {
        Ok(Some(session))
    } else {
        eprintln!("Backend at {base_url} is not reachable");
        Ok(None)
    }
}

fn run_task(settings: ClientSettings, request: TaskRequest, options: RunOptions) -> Result<ExitCode> {
    let Some(mut session) = connect(settings)? else {
        return Ok(ExitCode::FAILURE);
    };

    let needs_driver = request.kind().requires_driver()
        && !session.store.state().connection().driver_initialized;
    if options.init_driver && needs_driver && !session.initialize_driver()? {
        return Ok(ExitCode::FAILURE);
    }

    control_info!("Requesting {} task", request.kind());
    session.dispatch(Msg::SubmitRequested(request));
    // Nothing is running after a rejected request; the renderer has shown why.
    while session.store.state().is_running() {
        session.next_event(EVENT_WAIT)?;
    }

    if !session.completed {
        return Ok(ExitCode::FAILURE);
    }
    if options.download {
        return session.download_result();
    }
    Ok(ExitCode::SUCCESS)
}

fn init_driver(settings: ClientSettings) -> Result<ExitCode> {
    let Some(mut session) = connect(settings)? else {
        return Ok(ExitCode::FAILURE);
    };
    if session.initialize_driver()? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn status(settings: ClientSettings) -> Result<ExitCode> {
    match connect(settings)? {
        Some(_) => Ok(ExitCode::SUCCESS),
        None => Ok(ExitCode::FAILURE),
    }
}

fn watch(settings: ClientSettings) -> Result<ExitCode> {
    let mut session = Session::start(settings)?;
    loop {
        session.next_event(EVENT_WAIT)?;
    }
}

fn list_files(settings: ClientSettings) -> Result<ExitCode> {
    let backend = ReqwestBackend::new(&settings)?;
    let files = block_on(backend.list_files())??;
    if files.is_empty() {
        println!("No result files on the backend");
    }
    for file in files {
        println!(
            "{:<48} {:>10}  {}",
            file.filename,
            file.size,
            format_created(file.created)
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn close_driver(settings: ClientSettings) -> Result<ExitCode> {
    let backend = ReqwestBackend::new(&settings)?;
    let message = block_on(backend.close_driver())??;
    println!("{message}");
    Ok(ExitCode::SUCCESS)
}

/// Runs a single backend call outside the engine.
fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

fn format_created(created: f64) -> String {
    chrono::DateTime::from_timestamp(created.trunc() as i64, 0)
        .map(|utc| {
            utc.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_default()
}
