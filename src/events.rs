use crate::error::EventBusError;
use crate::steps::Step;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events emitted by an enrollment session.
///
/// Front ends subscribe to these to render notifications; nothing in the
/// library depends on anyone listening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EnrollmentEvent {
    /// A store action was applied
    StateChanged {
        action: String,
        step: Step,
        timestamp: DateTime<Utc>,
    },
    /// The wizard moved to another step
    StepChanged {
        from: Step,
        to: Step,
        timestamp: DateTime<Utc>,
    },
    /// The backend acknowledged a step's data
    StepSubmitted {
        step: Step,
        timestamp: DateTime<Utc>,
    },
    /// A step submission failed and may be retried
    SubmissionFailed {
        step: Step,
        kind: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Activity configuration replaced; `fallback` marks the built-in default
    ActivityConfigLoaded {
        fallback: bool,
        timestamp: DateTime<Utc>,
    },
    /// The review step was accepted
    EnrollmentCompleted {
        relation_no: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// Session captures were cleared
    SessionReset { timestamp: DateTime<Utc> },
    /// A camera stream was opened
    MediaAcquired { device: String, timestamp: DateTime<Utc> },
    /// A camera stream was stopped
    MediaReleased { device: String, timestamp: DateTime<Utc> },
}

impl EnrollmentEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            EnrollmentEvent::StateChanged { timestamp, .. }
            | EnrollmentEvent::StepChanged { timestamp, .. }
            | EnrollmentEvent::StepSubmitted { timestamp, .. }
            | EnrollmentEvent::SubmissionFailed { timestamp, .. }
            | EnrollmentEvent::ActivityConfigLoaded { timestamp, .. }
            | EnrollmentEvent::EnrollmentCompleted { timestamp, .. }
            | EnrollmentEvent::SessionReset { timestamp }
            | EnrollmentEvent::MediaAcquired { timestamp, .. }
            | EnrollmentEvent::MediaReleased { timestamp, .. } => *timestamp,
        }
    }

    /// Human-readable description, suitable for a notification line
    pub fn description(&self) -> String {
        match self {
            EnrollmentEvent::StateChanged { action, step, .. } => {
                format!("Applied '{}' on step {}", action, step)
            }
            EnrollmentEvent::StepChanged { from, to, .. } => {
                format!("Moved from {} to {}", from, to)
            }
            EnrollmentEvent::StepSubmitted { step, .. } => format!("{} submitted", step),
            EnrollmentEvent::SubmissionFailed {
                step, kind, message, ..
            } => format!("{} failed ({}): {}", step, kind, message),
            EnrollmentEvent::ActivityConfigLoaded { fallback, .. } => {
                if *fallback {
                    "Using default activity configuration".to_string()
                } else {
                    "Activity configuration loaded".to_string()
                }
            }
            EnrollmentEvent::EnrollmentCompleted { relation_no, .. } => format!(
                "Enrollment completed for {}",
                relation_no.as_deref().unwrap_or("unknown relation")
            ),
            EnrollmentEvent::SessionReset { .. } => "Session reset".to_string(),
            EnrollmentEvent::MediaAcquired { device, .. } => {
                format!("Media stream opened on {}", device)
            }
            EnrollmentEvent::MediaReleased { device, .. } => {
                format!("Media stream released on {}", device)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            EnrollmentEvent::StateChanged { .. } => "state_changed",
            EnrollmentEvent::StepChanged { .. } => "step_changed",
            EnrollmentEvent::StepSubmitted { .. } => "step_submitted",
            EnrollmentEvent::SubmissionFailed { .. } => "submission_failed",
            EnrollmentEvent::ActivityConfigLoaded { .. } => "activity_config_loaded",
            EnrollmentEvent::EnrollmentCompleted { .. } => "enrollment_completed",
            EnrollmentEvent::SessionReset { .. } => "session_reset",
            EnrollmentEvent::MediaAcquired { .. } => "media_acquired",
            EnrollmentEvent::MediaReleased { .. } => "media_released",
        }
    }
}

/// Broadcast bus for session events
pub struct EventBus {
    sender: broadcast::Sender<EnrollmentEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: true,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EnrollmentEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns the number of receivers reached.
    ///
    /// Publishing with no subscribers is not an error for the session, so
    /// callers usually discard the result.
    pub fn publish(&self, event: EnrollmentEvent) -> Result<usize, EventBusError> {
        match &event {
            EnrollmentEvent::SubmissionFailed {
                step, kind, message, ..
            } => {
                error!("Submission of {} failed ({}): {}", step, kind, message);
            }
            EnrollmentEvent::ActivityConfigLoaded { fallback: true, .. } => {
                warn!("Activity configuration unavailable, using defaults");
            }
            EnrollmentEvent::EnrollmentCompleted { .. } | EnrollmentEvent::StepSubmitted { .. } => {
                info!("{}", event.description());
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    All,
    EventTypes(Vec<&'static str>),
    Custom(fn(&EnrollmentEvent) -> bool),
}

impl EventFilter {
    pub fn matches(&self, event: &EnrollmentEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Receiver that skips events not matching its filter
pub struct EventReceiver {
    receiver: broadcast::Receiver<EnrollmentEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<EnrollmentEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<EnrollmentEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Drain the next matching event without waiting
    pub fn try_recv(&mut self) -> Result<Option<EnrollmentEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
