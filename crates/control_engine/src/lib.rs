//! Scrape-control engine: backend IO and the health and poll timers.
mod client;
mod download;
mod engine;
mod filename;
mod health;
mod poller;
mod types;
mod wire;

pub use client::{Backend, ClientSettings, ReqwestBackend, DEFAULT_BASE_URL};
pub use download::{download_artifact, save_artifact};
pub use engine::{ChannelEventSink, EngineError, EngineHandle, EventSink};
pub use filename::local_file_name;
pub use health::HealthMonitor;
pub use poller::TaskPoller;
pub use types::{BackendError, EngineEvent, FailureKind, RemoteFile};
