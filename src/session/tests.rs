use super::*;
use crate::activity::ActivityConfig;
use crate::events::EventBus;
use crate::image::DataUrl;
use crate::steps::Step;
use std::sync::Arc;

fn image(payload: &str) -> DataUrl {
    DataUrl::from_payload(payload, "image/png")
}

fn captured_state() -> SessionState {
    let actions = vec![
        SessionAction::SetRelation(Some("REL001".to_string())),
        SessionAction::SetPhoto(Some(image("AAAA"))),
        SessionAction::SetSignature(Some(image("BBBB"))),
        SessionAction::AddDocument(Some(DocumentType::Passport)),
        SessionAction::SetDocumentSide {
            index: 0,
            side: DocumentSide::Front,
            image: Some(image("CCCC")),
        },
        SessionAction::SetThumbprint {
            thumb: Thumb::First,
            image: Some(image("DDDD")),
        },
        SessionAction::MarkSubmitted(Section::PhotoSignature),
        SessionAction::Advance,
    ];
    actions.into_iter().fold(SessionState::default(), reduce)
}

#[test]
fn test_initial_state() {
    let state = SessionState::default();
    assert_eq!(state.current_step, Step::PhotoSignature);
    assert!(state.completed_steps().is_empty());
    assert!(!state.is_completed);
    assert!(!state.activity_loaded);
}

#[test]
fn test_capture_fields_are_set_and_cleared() {
    let mut state = reduce(SessionState::default(), SessionAction::SetPhoto(Some(image("AAAA"))));
    assert!(state.photo.is_some());

    state = reduce(state, SessionAction::SetPhoto(None));
    assert!(state.photo.is_none());
}

#[test]
fn test_document_actions_ignore_bad_index() {
    let state = reduce(
        SessionState::default(),
        SessionAction::SetDocumentSide {
            index: 3,
            side: DocumentSide::Front,
            image: Some(image("AAAA")),
        },
    );
    assert!(state.identification.is_empty());

    let state = reduce(state, SessionAction::RemoveDocument(0));
    assert!(state.identification.is_empty());
}

#[test]
fn test_document_type_clear_drops_sides() {
    let mut state = reduce(
        SessionState::default(),
        SessionAction::AddDocument(Some(DocumentType::NationalId)),
    );
    for side in [DocumentSide::Front, DocumentSide::Back] {
        state = reduce(
            state,
            SessionAction::SetDocumentSide {
                index: 0,
                side,
                image: Some(image("AAAA")),
            },
        );
    }
    state = reduce(
        state,
        SessionAction::SetDocumentType {
            index: 0,
            doc_type: None,
        },
    );

    let doc = &state.identification[0];
    assert!(doc.doc_type.is_none());
    assert!(doc.front.is_none());
    assert!(doc.back.is_none());
}

#[test]
fn test_advance_follows_visible_steps() {
    let mut state = reduce(
        SessionState::default(),
        SessionAction::SetActivityConfig(ActivityConfig {
            image: true,
            identification: false,
            fingerprint: true,
        }),
    );
    state = reduce(state, SessionAction::Advance);
    assert_eq!(state.current_step, Step::Fingerprint);
    state = reduce(state, SessionAction::Advance);
    assert_eq!(state.current_step, Step::Review);
    state = reduce(state, SessionAction::Advance);
    assert_eq!(state.current_step, Step::Review);

    state = reduce(state, SessionAction::Back);
    assert_eq!(state.current_step, Step::Fingerprint);
}

#[test]
fn test_config_change_rehomes_hidden_current_step() {
    let mut state = reduce(SessionState::default(), SessionAction::Advance);
    assert_eq!(state.current_step, Step::Identification);

    state = reduce(
        state,
        SessionAction::SetActivityConfig(ActivityConfig {
            image: true,
            identification: false,
            fingerprint: true,
        }),
    );
    assert_eq!(state.current_step, Step::Fingerprint);
    assert!(state.visible_steps().contains(&state.current_step));
}

#[test]
fn test_go_to_step_rejects_skipping_ahead() {
    let state = reduce(SessionState::default(), SessionAction::GoToStep(Step::Review));
    assert_eq!(state.current_step, Step::PhotoSignature);

    let state = reduce(state, SessionAction::MarkSubmitted(Section::PhotoSignature));
    let state = reduce(state, SessionAction::GoToStep(Step::Identification));
    assert_eq!(state.current_step, Step::Identification);

    let state = reduce(state, SessionAction::GoToStep(Step::PhotoSignature));
    assert_eq!(state.current_step, Step::PhotoSignature);
}

#[test]
fn test_reset_preserves_activity_config() {
    let config = ActivityConfig {
        image: true,
        identification: false,
        fingerprint: true,
    };
    let state = reduce(captured_state(), SessionAction::SetActivityConfig(config));
    let state = reduce(state, SessionAction::Reset);

    assert_eq!(state.activity, config);
    assert!(state.activity_loaded);
    assert_eq!(
        state,
        SessionState {
            activity: config,
            activity_loaded: true,
            revision: state.revision,
            ..SessionState::default()
        }
    );
}

#[test]
fn test_reset_all_drops_activity_config() {
    let before = reduce(
        captured_state(),
        SessionAction::SetActivityConfig(ActivityConfig {
            image: true,
            identification: false,
            fingerprint: false,
        }),
    );
    let state = reduce(before.clone(), SessionAction::ResetAll);
    assert!(state.revision > before.revision);
    assert_eq!(
        state,
        SessionState {
            revision: state.revision,
            ..SessionState::default()
        }
    );
}

#[test]
fn test_revision_tracks_capture_changes() {
    let state = SessionState::default();
    let state = reduce(state, SessionAction::SetPhoto(Some(image("AAAA"))));
    assert_eq!(state.revision, 1);

    let state = reduce(state, SessionAction::MarkSubmitted(Section::PhotoSignature));
    let state = reduce(state, SessionAction::Advance);
    let state = reduce(state, SessionAction::Back);
    assert_eq!(state.revision, 1);

    let state = reduce(state, SessionAction::Reset);
    assert_eq!(state.revision, 2);
    let state = reduce(state, SessionAction::SetRelation(Some("REL9".to_string())));
    assert_eq!(state.revision, 3);
}

#[test]
fn test_store_dispatch_publishes_events() {
    let event_bus = Arc::new(EventBus::new(16));
    let mut receiver = event_bus.subscribe();
    let store = SessionStore::new(Arc::clone(&event_bus));

    store.dispatch(SessionAction::MarkSubmitted(Section::PhotoSignature));
    let state = store.dispatch(SessionAction::Advance);
    assert_eq!(state.current_step, Step::Identification);
    assert_eq!(store.select(|s| s.current_step), Step::Identification);

    let mut types = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        types.push(event.event_type());
    }
    assert_eq!(types, vec!["state_changed", "state_changed", "step_changed"]);
}

#[test]
fn test_store_reset_event() {
    let event_bus = Arc::new(EventBus::new(16));
    let mut receiver = event_bus.subscribe();
    let store = SessionStore::with_state(captured_state(), Arc::clone(&event_bus));

    store.dispatch(SessionAction::Reset);
    assert_eq!(store.snapshot().current_step, Step::PhotoSignature);

    let mut types = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        types.push(event.event_type());
    }
    assert!(types.contains(&"session_reset"));
}
