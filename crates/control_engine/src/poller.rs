use std::sync::Arc;
use std::time::Duration;

use control_core::{Epoch, TaskHandle};
use control_logging::{control_debug, control_info, control_warn};
use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{Backend, EngineEvent, EventSink};

/// Owns the single poll timer. Starting a new task stops the previous timer first.
pub struct TaskPoller {
    backend: Arc<dyn Backend>,
    interval: Duration,
    sink: Arc<dyn EventSink>,
    slot: Option<(Epoch, CancellationToken)>,
}

impl TaskPoller {
    pub fn new(backend: Arc<dyn Backend>, interval: Duration, sink: Arc<dyn EventSink>) -> Self {
        Self {
            backend,
            interval: interval.max(Duration::from_millis(1)),
            sink,
            slot: None,
        }
    }

    /// Polls `handle` every interval until a terminal status, `stop`, or `parent` cancellation.
    pub fn start(
        &mut self,
        runtime: &Handle,
        parent: &CancellationToken,
        epoch: Epoch,
        handle: TaskHandle,
    ) {
        self.stop();
        let token = parent.child_token();
        control_info!("Polling task {} ({})", handle, epoch);
        runtime.spawn(poll_loop(
            self.backend.clone(),
            self.sink.clone(),
            self.interval,
            epoch,
            handle,
            token.clone(),
        ));
        self.slot = Some((epoch, token));
    }

    pub fn stop(&mut self) {
        if let Some((epoch, token)) = self.slot.take() {
            if !token.is_cancelled() {
                control_debug!("Stopping poll timer {}", epoch);
            }
            token.cancel();
        }
    }

    /// Stops the timer when it belongs to `epoch` or an earlier submission.
    pub fn stop_through(&mut self, epoch: Epoch) {
        if matches!(&self.slot, Some((current, _)) if *current <= epoch) {
            self.stop();
        }
    }
}

async fn poll_loop(
    backend: Arc<dyn Backend>,
    sink: Arc<dyn EventSink>,
    interval: Duration,
    epoch: Epoch,
    handle: TaskHandle,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let result = tokio::select! {
            _ = token.cancelled() => break,
            result = backend.task_status(&handle) => result,
        };
        // A stop that raced the response wins; the response is dropped.
        if token.is_cancelled() {
            control_debug!("Discarding status for stopped task {} ({})", handle, epoch);
            break;
        }
        let terminal = match &result {
            Ok(report) => report.status.is_terminal(),
            Err(err) => {
                control_warn!("Status poll for task {} failed: {}", handle, err);
                false
            }
        };
        sink.emit(EngineEvent::StatusPolled { epoch, result });
        if terminal {
            control_info!("Task {} reached a terminal status", handle);
            token.cancel();
            break;
        }
    }
}
