//! Step sequencing for the enrollment wizard.
//!
//! `compute_visible_steps` is the only place that decides which steps exist
//! for a given activity configuration; everything else derives from it.

use crate::activity::ActivityConfig;
use crate::session::SessionState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical wizard step
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Step {
    PhotoSignature = 1,
    Identification = 2,
    Fingerprint = 3,
    Review = 4,
}

impl Step {
    pub const ALL: [Step; 4] = [
        Step::PhotoSignature,
        Step::Identification,
        Step::Fingerprint,
        Step::Review,
    ];

    pub fn id(&self) -> u8 {
        *self as u8
    }

    pub fn from_id(id: u8) -> Option<Step> {
        Step::ALL.into_iter().find(|step| step.id() == id)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::PhotoSignature => "Photo & Signature",
            Step::Identification => "Identification",
            Step::Fingerprint => "Fingerprint",
            Step::Review => "Review & Submit",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.id(), self.title())
    }
}

/// Ordered visible steps: photo first, review last, optional steps between
pub fn compute_visible_steps(config: &ActivityConfig) -> Vec<Step> {
    let mut steps = vec![Step::PhotoSignature];
    if config.identification {
        steps.push(Step::Identification);
    }
    if config.fingerprint {
        steps.push(Step::Fingerprint);
    }
    steps.push(Step::Review);
    steps
}

pub fn is_visible(config: &ActivityConfig, step: Step) -> bool {
    compute_visible_steps(config).contains(&step)
}

/// Number of capture steps, not counting review
pub fn total_configurable_steps(config: &ActivityConfig) -> usize {
    compute_visible_steps(config).len() - 1
}

/// Next visible step after `current`, or `None` when `current` is last
pub fn next_step(config: &ActivityConfig, current: Step) -> Option<Step> {
    compute_visible_steps(config)
        .into_iter()
        .find(|step| *step > current)
}

pub fn previous_step(config: &ActivityConfig, current: Step) -> Option<Step> {
    compute_visible_steps(config)
        .into_iter()
        .rev()
        .find(|step| *step < current)
}

/// Bring a step that may have become hidden back onto the visible list.
///
/// Hidden steps move forward to the next visible one; review is always
/// visible so this never fails.
pub fn clamp_to_visible(config: &ActivityConfig, step: Step) -> Step {
    if is_visible(config, step) {
        step
    } else {
        next_step(config, step).unwrap_or(Step::Review)
    }
}

/// Whether the submission flag backing `step` is set
pub fn is_step_completed(state: &SessionState, step: Step) -> bool {
    match step {
        Step::PhotoSignature => state.submissions.photo_signature,
        Step::Identification => state.submissions.identification,
        Step::Fingerprint => state.submissions.fingerprint,
        Step::Review => state.is_completed,
    }
}

/// Completed steps, derived from submission flags and restricted to visible ones
pub fn completed_steps(state: &SessionState) -> Vec<Step> {
    compute_visible_steps(&state.activity)
        .into_iter()
        .filter(|step| is_step_completed(state, *step))
        .collect()
}

/// First visible step whose data has not been acknowledged yet
pub fn first_incomplete_step(state: &SessionState) -> Option<Step> {
    compute_visible_steps(&state.activity)
        .into_iter()
        .find(|step| !is_step_completed(state, *step))
}

/// A step may be jumped to if it is already done or it is the frontier
pub fn can_navigate_to(state: &SessionState, target: Step) -> bool {
    if !is_visible(&state.activity, target) {
        return false;
    }
    if is_step_completed(state, target) {
        return true;
    }
    first_incomplete_step(state) == Some(target)
}

/// Share of visible capture steps already submitted, 0..=100
pub fn progress_percent(state: &SessionState) -> u8 {
    if state.is_completed {
        return 100;
    }
    let total = total_configurable_steps(&state.activity);
    if total == 0 {
        return 0;
    }
    let done = completed_steps(state)
        .into_iter()
        .filter(|step| *step != Step::Review)
        .count();
    ((done * 100) / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{reduce, Section, SessionAction};

    fn all_configs() -> Vec<ActivityConfig> {
        let mut configs = Vec::new();
        for identification in [false, true] {
            for fingerprint in [false, true] {
                configs.push(ActivityConfig {
                    image: true,
                    identification,
                    fingerprint,
                });
            }
        }
        configs
    }

    #[test]
    fn test_photo_first_and_review_last() {
        for config in all_configs() {
            let steps = compute_visible_steps(&config);
            assert_eq!(steps.first(), Some(&Step::PhotoSignature));
            assert_eq!(steps.last(), Some(&Step::Review));
        }
    }

    #[test]
    fn test_identification_hidden_when_disabled() {
        for config in all_configs().into_iter().filter(|c| !c.identification) {
            assert!(!compute_visible_steps(&config).contains(&Step::Identification));
        }
    }

    #[test]
    fn test_skips_disabled_identification() {
        let config = ActivityConfig {
            image: true,
            identification: false,
            fingerprint: true,
        };
        assert_eq!(
            compute_visible_steps(&config),
            vec![Step::PhotoSignature, Step::Fingerprint, Step::Review]
        );
        assert_eq!(next_step(&config, Step::PhotoSignature), Some(Step::Fingerprint));
        assert_eq!(previous_step(&config, Step::Fingerprint), Some(Step::PhotoSignature));
        assert_eq!(total_configurable_steps(&config), 2);
    }

    #[test]
    fn test_next_step_at_end_is_none() {
        for config in all_configs() {
            assert_eq!(next_step(&config, Step::Review), None);
            assert_eq!(previous_step(&config, Step::PhotoSignature), None);
        }
    }

    #[test]
    fn test_clamp_hidden_step_moves_forward() {
        let config = ActivityConfig {
            image: true,
            identification: false,
            fingerprint: false,
        };
        assert_eq!(clamp_to_visible(&config, Step::Identification), Step::Review);
        assert_eq!(clamp_to_visible(&config, Step::PhotoSignature), Step::PhotoSignature);
    }

    #[test]
    fn test_completed_steps_subset_of_visible() {
        for config in all_configs() {
            let mut state = SessionState::default();
            state = reduce(state, SessionAction::SetActivityConfig(ActivityConfig::default()));
            for section in [Section::PhotoSignature, Section::Identification, Section::Fingerprint] {
                state = reduce(state, SessionAction::MarkSubmitted(section));
            }
            state = reduce(state, SessionAction::SetActivityConfig(config));

            let visible = compute_visible_steps(&config);
            for step in completed_steps(&state) {
                assert!(visible.contains(&step));
            }
        }
    }

    #[test]
    fn test_navigation_gating() {
        let mut state = SessionState::default();
        assert!(can_navigate_to(&state, Step::PhotoSignature));
        assert!(!can_navigate_to(&state, Step::Identification));
        assert!(!can_navigate_to(&state, Step::Review));

        state = reduce(state, SessionAction::MarkSubmitted(Section::PhotoSignature));
        assert!(can_navigate_to(&state, Step::PhotoSignature));
        assert!(can_navigate_to(&state, Step::Identification));
        assert!(!can_navigate_to(&state, Step::Fingerprint));
    }

    #[test]
    fn test_progress_percent() {
        let mut state = SessionState::default();
        assert_eq!(progress_percent(&state), 0);

        state = reduce(state, SessionAction::MarkSubmitted(Section::PhotoSignature));
        assert_eq!(progress_percent(&state), 33);

        state = reduce(state, SessionAction::MarkCompleted);
        assert_eq!(progress_percent(&state), 100);
    }

    #[test]
    fn test_step_ids() {
        for step in Step::ALL {
            assert_eq!(Step::from_id(step.id()), Some(step));
        }
        assert_eq!(Step::from_id(0), None);
        assert_eq!(Step::from_id(5), None);
    }
}
