//! Scrape-control core: pure task-lifecycle state machine and view-model helpers.
mod effect;
mod error;
mod logs;
mod msg;
mod request;
mod result;
mod state;
mod status;
mod store;
mod update;
mod view_model;

pub use effect::Effect;
pub use error::{PreconditionViolation, RemoteFailure, SubmissionError};
pub use logs::{LogAggregator, LogEntry, LogKind};
pub use msg::Msg;
pub use request::{FileUpload, TaskKind, TaskRequest, MAX_REVIEWS_LIMIT, MAX_SEARCH_PAGES};
pub use result::{ResultArtifact, ResultStore};
pub use state::{AppState, ConnectionState, Epoch, HealthReport, TaskHandle, TaskPhase};
pub use status::{StatusReport, TaskStatus};
pub use store::{Clock, Store, Subscriber};
pub use update::{update, COMPLETED_MESSAGE};
pub use view_model::{AppViewModel, ResultView};
