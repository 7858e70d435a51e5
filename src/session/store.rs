use super::state::{reduce, SessionAction, SessionState};
use crate::events::{EnrollmentEvent, EventBus};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Shared container around [`SessionState`].
///
/// Handed to views and controllers as `Arc<SessionStore>`; every mutation
/// goes through [`SessionStore::dispatch`] so change events stay in order
/// with state updates.
pub struct SessionStore {
    id: Uuid,
    state: RwLock<SessionState>,
    event_bus: Arc<EventBus>,
}

impl SessionStore {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self::with_state(SessionState::default(), event_bus)
    }

    pub fn with_state(state: SessionState, event_bus: Arc<EventBus>) -> Self {
        let id = Uuid::new_v4();
        debug!("Created session store {}", id);
        Self {
            id,
            state: RwLock::new(state),
            event_bus,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Read a slice of state without cloning all of it
    pub fn select<T, F>(&self, selector: F) -> T
    where
        F: FnOnce(&SessionState) -> T,
    {
        selector(&self.state.read())
    }

    /// Apply an action and return the resulting state
    pub fn dispatch(&self, action: SessionAction) -> SessionState {
        let name = action.name();
        let is_reset = matches!(action, SessionAction::Reset | SessionAction::ResetAll);

        let (before, after) = {
            let mut guard = self.state.write();
            let before = guard.current_step;
            let next = reduce(guard.clone(), action);
            *guard = next.clone();
            (before, next)
        };

        debug!("Session {} applied '{}'", self.id, name);
        let now = Utc::now();
        let _ = self.event_bus.publish(EnrollmentEvent::StateChanged {
            action: name.to_string(),
            step: after.current_step,
            timestamp: now,
        });
        if before != after.current_step {
            let _ = self.event_bus.publish(EnrollmentEvent::StepChanged {
                from: before,
                to: after.current_step,
                timestamp: now,
            });
        }
        if is_reset {
            let _ = self.event_bus.publish(EnrollmentEvent::SessionReset { timestamp: now });
        }

        after
    }
}
