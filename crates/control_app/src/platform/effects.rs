use control_core::{Effect, Msg, RemoteFailure};
use control_engine::{EngineEvent, EngineHandle};
use control_logging::control_debug;

/// Executes core effects on the engine.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::InitializeDriver => self.engine.initialize_driver(),
                Effect::Submit { epoch, request } => self.engine.submit(epoch, request),
                Effect::StartPolling { epoch, handle } => self.engine.start_polling(epoch, handle),
                Effect::StopPolling { epoch } => {
                    control_debug!("Stop polling through {}", epoch);
                    self.engine.stop_polling(epoch);
                }
                Effect::Download { file_name } => self.engine.download(file_name),
            }
        }
    }
}

/// Translates an engine event into the message the core expects.
///
/// Download outcomes stay with the host and map to `None`.
pub fn map_event(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::HealthChecked { probe, result } => Some(Msg::HealthChecked {
            probe,
            result: result.map_err(|err| err.to_string()),
        }),
        EngineEvent::DriverInitialized(result) => {
            Some(Msg::DriverInitialized(result.map_err(RemoteFailure::from)))
        }
        EngineEvent::Submitted { epoch, result } => Some(Msg::SubmitFinished {
            epoch,
            result: result.map_err(RemoteFailure::from),
        }),
        EngineEvent::StatusPolled {
            epoch,
            result: Ok(report),
        } => Some(Msg::StatusPolled { epoch, report }),
        EngineEvent::StatusPolled { epoch, result: Err(_) } => {
            Some(Msg::StatusPollFailed { epoch })
        }
        EngineEvent::Downloaded { .. } => None,
    }
}
