use std::sync::Arc;
use std::time::Duration;

use control_logging::{control_debug, control_warn};
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{Backend, EngineEvent, EventSink};

/// Probes backend readiness once at start and then on a fixed period, forever.
///
/// A failed probe only shows up as an `Err` in its event; the next tick is the retry.
pub struct HealthMonitor {
    backend: Arc<dyn Backend>,
    interval: Duration,
    sink: Arc<dyn EventSink>,
}

impl HealthMonitor {
    pub fn new(backend: Arc<dyn Backend>, interval: Duration, sink: Arc<dyn EventSink>) -> Self {
        Self {
            backend,
            interval: interval.max(Duration::from_millis(1)),
            sink,
        }
    }

    /// Starts the probe schedule on `runtime`; it runs until `token` is cancelled.
    pub fn spawn(self, runtime: &Handle, token: CancellationToken) {
        runtime.spawn(self.run(token));
    }

    async fn run(self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut probe: u64 = 0;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            probe += 1;
            // Each probe runs on its own so a hung request never delays the schedule.
            let backend = self.backend.clone();
            let sink = self.sink.clone();
            let token = token.clone();
            tokio::spawn(async move {
                let result = tokio::select! {
                    _ = token.cancelled() => return,
                    result = backend.health() => result,
                };
                if let Err(err) = &result {
                    control_warn!("Health probe {} failed: {}", probe, err);
                }
                sink.emit(EngineEvent::HealthChecked { probe, result });
            });
        }
        control_debug!("Health monitor stopped after {} probes", probe);
    }
}
