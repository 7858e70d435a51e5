use super::identification::{DocumentSide, DocumentType, IdentificationDocument};
use crate::activity::ActivityConfig;
use crate::image::DataUrl;
use crate::steps::{self, Step};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Whether the session creates a new record or amends an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnrollmentMode {
    #[default]
    Add,
    Amend,
}

impl EnrollmentMode {
    /// Value of the `action` field expected by `savedata`
    pub fn as_form_value(&self) -> &'static str {
        match self {
            EnrollmentMode::Add => "add",
            EnrollmentMode::Amend => "AMEND",
        }
    }
}

/// Fingerprint scanner slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Thumb {
    First,
    Second,
}

impl Thumb {
    /// Value of the device `thumbprint` form field
    pub fn device_value(&self) -> &'static str {
        match self {
            Thumb::First => "1",
            Thumb::Second => "2",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprints {
    pub thumbprint1: Option<DataUrl>,
    pub thumbprint2: Option<DataUrl>,
}

impl Fingerprints {
    pub fn get(&self, thumb: Thumb) -> Option<&DataUrl> {
        match thumb {
            Thumb::First => self.thumbprint1.as_ref(),
            Thumb::Second => self.thumbprint2.as_ref(),
        }
    }

    pub fn any(&self) -> bool {
        self.thumbprint1.is_some() || self.thumbprint2.is_some()
    }
}

/// Backend-acknowledged capture sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    PhotoSignature,
    Identification,
    Fingerprint,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::PhotoSignature => "photo_signature",
            Section::Identification => "identification",
            Section::Fingerprint => "fingerprint",
        }
    }

    pub fn for_step(step: Step) -> Option<Section> {
        match step {
            Step::PhotoSignature => Some(Section::PhotoSignature),
            Step::Identification => Some(Section::Identification),
            Step::Fingerprint => Some(Section::Fingerprint),
            Step::Review => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submissions {
    pub photo_signature: bool,
    pub identification: bool,
    pub fingerprint: bool,
}

impl Submissions {
    pub fn is_submitted(&self, section: Section) -> bool {
        match section {
            Section::PhotoSignature => self.photo_signature,
            Section::Identification => self.identification,
            Section::Fingerprint => self.fingerprint,
        }
    }
}

/// Everything captured during one enrollment session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub current_step: Step,
    pub relation_no: Option<String>,
    pub batch_no: Option<String>,
    pub mode: EnrollmentMode,
    pub photo: Option<DataUrl>,
    pub signature: Option<DataUrl>,
    pub identification: Vec<IdentificationDocument>,
    pub fingerprints: Fingerprints,
    pub submissions: Submissions,
    pub is_completed: bool,
    pub activity: ActivityConfig,
    pub activity_loaded: bool,
    /// Bumped whenever captured data or the session identity changes
    pub revision: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_step: Step::PhotoSignature,
            relation_no: None,
            batch_no: None,
            mode: EnrollmentMode::default(),
            photo: None,
            signature: None,
            identification: Vec::new(),
            fingerprints: Fingerprints::default(),
            submissions: Submissions::default(),
            is_completed: false,
            activity: ActivityConfig::default(),
            activity_loaded: false,
            revision: 0,
        }
    }
}

impl SessionState {
    pub fn visible_steps(&self) -> Vec<Step> {
        steps::compute_visible_steps(&self.activity)
    }

    pub fn completed_steps(&self) -> Vec<Step> {
        steps::completed_steps(self)
    }
}

/// Mutations accepted by [`reduce`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    SetRelation(Option<String>),
    SetBatch(Option<String>),
    SetMode(EnrollmentMode),
    SetPhoto(Option<DataUrl>),
    SetSignature(Option<DataUrl>),
    AddDocument(Option<DocumentType>),
    RemoveDocument(usize),
    SetDocumentType {
        index: usize,
        doc_type: Option<DocumentType>,
    },
    SetDocumentSide {
        index: usize,
        side: DocumentSide,
        image: Option<DataUrl>,
    },
    SetThumbprint {
        thumb: Thumb,
        image: Option<DataUrl>,
    },
    MarkSubmitted(Section),
    MarkCompleted,
    GoToStep(Step),
    Advance,
    Back,
    SetActivityConfig(ActivityConfig),
    /// Clear captures and progress, keep the fetched activity configuration
    Reset,
    /// Clear everything including the activity configuration
    ResetAll,
}

impl SessionAction {
    pub fn name(&self) -> &'static str {
        match self {
            SessionAction::SetRelation(_) => "set_relation",
            SessionAction::SetBatch(_) => "set_batch",
            SessionAction::SetMode(_) => "set_mode",
            SessionAction::SetPhoto(_) => "set_photo",
            SessionAction::SetSignature(_) => "set_signature",
            SessionAction::AddDocument(_) => "add_document",
            SessionAction::RemoveDocument(_) => "remove_document",
            SessionAction::SetDocumentType { .. } => "set_document_type",
            SessionAction::SetDocumentSide { .. } => "set_document_side",
            SessionAction::SetThumbprint { .. } => "set_thumbprint",
            SessionAction::MarkSubmitted(_) => "mark_submitted",
            SessionAction::MarkCompleted => "mark_completed",
            SessionAction::GoToStep(_) => "go_to_step",
            SessionAction::Advance => "advance",
            SessionAction::Back => "back",
            SessionAction::SetActivityConfig(_) => "set_activity_config",
            SessionAction::Reset => "reset",
            SessionAction::ResetAll => "reset_all",
        }
    }

    /// Whether the action replaces data a pending submission may have sent
    pub fn changes_captures(&self) -> bool {
        !matches!(
            self,
            SessionAction::MarkSubmitted(_)
                | SessionAction::MarkCompleted
                | SessionAction::GoToStep(_)
                | SessionAction::Advance
                | SessionAction::Back
                | SessionAction::SetActivityConfig(_)
        )
    }
}

/// Pure state transition. Performs no validation beyond keeping
/// `current_step` on the visible list; out-of-range indexes are ignored.
pub fn reduce(mut state: SessionState, action: SessionAction) -> SessionState {
    let revision = state.revision;
    let changes_captures = action.changes_captures();
    match action {
        SessionAction::SetRelation(relation) => state.relation_no = relation,
        SessionAction::SetBatch(batch) => state.batch_no = batch,
        SessionAction::SetMode(mode) => state.mode = mode,
        SessionAction::SetPhoto(photo) => state.photo = photo,
        SessionAction::SetSignature(signature) => state.signature = signature,
        SessionAction::AddDocument(doc_type) => {
            let mut doc = IdentificationDocument::default();
            doc.set_type(doc_type);
            state.identification.push(doc);
        }
        SessionAction::RemoveDocument(index) => {
            if index < state.identification.len() {
                state.identification.remove(index);
            }
        }
        SessionAction::SetDocumentType { index, doc_type } => {
            if let Some(doc) = state.identification.get_mut(index) {
                doc.set_type(doc_type);
            }
        }
        SessionAction::SetDocumentSide { index, side, image } => {
            if let Some(doc) = state.identification.get_mut(index) {
                doc.set_side(side, image);
            }
        }
        SessionAction::SetThumbprint { thumb, image } => match thumb {
            Thumb::First => state.fingerprints.thumbprint1 = image,
            Thumb::Second => state.fingerprints.thumbprint2 = image,
        },
        SessionAction::MarkSubmitted(section) => match section {
            Section::PhotoSignature => state.submissions.photo_signature = true,
            Section::Identification => state.submissions.identification = true,
            Section::Fingerprint => state.submissions.fingerprint = true,
        },
        SessionAction::MarkCompleted => state.is_completed = true,
        SessionAction::GoToStep(step) => {
            if steps::can_navigate_to(&state, step) {
                state.current_step = step;
            } else {
                debug!("Ignoring navigation to unavailable step {}", step);
            }
        }
        SessionAction::Advance => {
            if let Some(next) = steps::next_step(&state.activity, state.current_step) {
                state.current_step = next;
            }
        }
        SessionAction::Back => {
            if let Some(previous) = steps::previous_step(&state.activity, state.current_step) {
                state.current_step = previous;
            }
        }
        SessionAction::SetActivityConfig(config) => {
            state.activity = config.normalized();
            state.activity_loaded = true;
            state.current_step = steps::clamp_to_visible(&state.activity, state.current_step);
        }
        SessionAction::Reset => {
            state = SessionState {
                activity: state.activity,
                activity_loaded: state.activity_loaded,
                ..SessionState::default()
            };
        }
        SessionAction::ResetAll => state = SessionState::default(),
    }
    if changes_captures {
        state.revision = revision.wrapping_add(1);
    }
    state
}
