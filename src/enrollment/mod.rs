//! Submit-then-advance driver for an enrollment session.


use crate::activity::ActivityConfig;
use crate::api::{FingerprintScanner, ImageKind, ImagingBackend, SaveDataForm, SubmitOutcome};
use crate::error::{ApiError, ValidationError};
use crate::events::{EnrollmentEvent, EventBus};
use crate::image::DataUrl;
use crate::session::{Section, SessionAction, SessionState, SessionStore, Thumb};
use crate::steps::Step;
use crate::views;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("A submission is already in progress")]
    AlreadySubmitting,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{step} was not accepted: {}", .outcome.describe())]
    Failed { step: Step, outcome: SubmitOutcome },
}

impl SubmitError {
    /// Transport or format failure behind a failed submission, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SubmitError::Failed { outcome, .. } => outcome.error.as_ref(),
            _ => None,
        }
    }
}

/// Clears the submitting flag on every exit path
struct SubmittingFlag<'a>(&'a AtomicBool);

impl Drop for SubmittingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct EnrollmentController<B: ImagingBackend> {
    store: Arc<SessionStore>,
    backend: Arc<B>,
    event_bus: Arc<EventBus>,
    submitting: AtomicBool,
}

impl<B: ImagingBackend> EnrollmentController<B> {
    pub fn new(store: Arc<SessionStore>, backend: Arc<B>) -> Self {
        let event_bus = store.event_bus();
        Self {
            store,
            backend,
            event_bus,
            submitting: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Fetch the activity configuration, substituting the all-enabled
    /// default when the backend cannot be reached or answers garbage.
    pub async fn load_activities(&self) -> ActivityConfig {
        let (config, fallback) = match self.backend.fetch_activities().await {
            Ok(config) => (config, false),
            Err(e) => {
                warn!(kind = e.kind(), "Using default activity configuration: {}", e);
                (ActivityConfig::default(), true)
            }
        };

        let state = self.store.dispatch(SessionAction::SetActivityConfig(config));
        let _ = self.event_bus.publish(EnrollmentEvent::ActivityConfigLoaded {
            fallback,
            timestamp: Utc::now(),
        });
        info!(
            "Activity configuration loaded, steps: {:?}",
            state.visible_steps().iter().map(Step::id).collect::<Vec<_>>()
        );
        state.activity
    }

    /// Persist a new activity configuration and apply it to the session
    pub async fn save_activities(&self, config: ActivityConfig) -> SubmitOutcome {
        let config = config.normalized();
        let outcome = self.backend.save_activities(&config).await;
        if outcome.success {
            self.store.dispatch(SessionAction::SetActivityConfig(config));
        }
        outcome
    }

    /// Validate the current step, send it, and advance on acknowledgment.
    ///
    /// Nothing is sent when validation fails. A rejected or failed request
    /// leaves the session untouched so the step can be retried.
    pub async fn submit_current_step(&self) -> Result<SubmitOutcome, SubmitError> {
        if self.submitting.swap(true, Ordering::AcqRel) {
            debug!("Ignoring submit while another is in flight");
            return Err(SubmitError::AlreadySubmitting);
        }
        let _flag = SubmittingFlag(&self.submitting);

        let state = self.store.snapshot();
        let step = state.current_step;
        let revision = state.revision;
        views::validate_step(&state, step)?;

        info!("Submitting step {}", step);
        let outcome = self.send_step(&state, step).await?;

        if !outcome.success {
            let kind = outcome
                .error
                .as_ref()
                .map(|e| e.kind())
                .unwrap_or("rejected");
            error!(kind, "Step {} submission failed: {}", step, outcome.describe());
            let _ = self.event_bus.publish(EnrollmentEvent::SubmissionFailed {
                step,
                kind: kind.to_string(),
                message: outcome.describe(),
                timestamp: Utc::now(),
            });
            return Err(SubmitError::Failed { step, outcome });
        }

        // The session moved on or its captures changed while the request was in flight
        if self
            .store
            .select(|s| s.revision != revision || s.current_step != step || s.is_completed)
        {
            debug!("Discarding result for step {}, session has moved on", step);
            return Ok(outcome);
        }

        match Section::for_step(step) {
            Some(section) => {
                self.store.dispatch(SessionAction::MarkSubmitted(section));
                self.store.dispatch(SessionAction::Advance);
            }
            None => {
                let state = self.store.dispatch(SessionAction::MarkCompleted);
                let _ = self.event_bus.publish(EnrollmentEvent::EnrollmentCompleted {
                    relation_no: state.relation_no,
                    timestamp: Utc::now(),
                });
                info!("Enrollment completed");
            }
        }
        let _ = self.event_bus.publish(EnrollmentEvent::StepSubmitted {
            step,
            timestamp: Utc::now(),
        });

        Ok(outcome)
    }

    async fn send_step(
        &self,
        state: &SessionState,
        step: Step,
    ) -> Result<SubmitOutcome, SubmitError> {
        let relation_no = state
            .relation_no
            .as_deref()
            .ok_or(ValidationError::MissingRelation)?;

        let outcome = match step {
            Step::PhotoSignature => {
                let photo = state.photo.as_ref().ok_or(ValidationError::MissingPhoto)?;
                let signature = state
                    .signature
                    .as_ref()
                    .ok_or(ValidationError::MissingSignature)?;

                let photo_outcome = self
                    .backend
                    .capture_browse(relation_no, ImageKind::Photo, photo)
                    .await;
                if !photo_outcome.success {
                    return Ok(photo_outcome);
                }
                let signature_outcome = self
                    .backend
                    .capture_browse(relation_no, ImageKind::Signature, signature)
                    .await;
                photo_outcome.and(signature_outcome)
            }
            Step::Identification => {
                self.backend
                    .submit_identification(relation_no, &state.identification)
                    .await
            }
            Step::Fingerprint => {
                self.backend
                    .submit_fingerprints(relation_no, &state.fingerprints)
                    .await
            }
            Step::Review => {
                let form =
                    SaveDataForm::from_state(state).ok_or(ValidationError::MissingRelation)?;
                self.backend.save_data(&form).await
            }
        };
        Ok(outcome)
    }

    /// Scan one thumb and store it in the session
    pub async fn capture_fingerprint(
        &self,
        scanner: &dyn FingerprintScanner,
        thumb: Thumb,
    ) -> Result<DataUrl, ApiError> {
        let image = scanner.capture(thumb).await.map_err(|e| {
            warn!(kind = e.kind(), "Thumbprint {} capture failed: {}", thumb.device_value(), e);
            e
        })?;
        self.store.dispatch(SessionAction::SetThumbprint {
            thumb,
            image: Some(image.clone()),
        });
        Ok(image)
    }
}
