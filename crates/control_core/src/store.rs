use chrono::NaiveTime;

use crate::{update, AppState, AppViewModel, Effect, Msg};

/// Time source for client-side log stamps.
pub type Clock = fn() -> NaiveTime;

/// Observer notified with a fresh snapshot after every state change.
pub type Subscriber = Box<dyn FnMut(&AppViewModel) + Send>;

/// Owns the current `AppState` and publishes changes to subscribers.
pub struct Store {
    state: AppState,
    clock: Clock,
    subscribers: Vec<Subscriber>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_clock(local_time)
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            state: AppState::new(),
            clock,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&AppViewModel) + Send + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    /// Runs one message through `update` and returns the effects to execute.
    pub fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg, (self.clock)());
        if state.consume_dirty() {
            let view = state.view();
            for subscriber in &mut self.subscribers {
                subscriber(&view);
            }
        }
        self.state = state;
        effects
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn local_time() -> NaiveTime {
    chrono::Local::now().time()
}
