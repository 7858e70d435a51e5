//! View models for each wizard step.
//!
//! A view is a pure function of session state: it says what the step shows,
//! which required fields are still missing, and whether the forward control
//! is enabled. Views never touch the activity configuration.

use crate::error::ValidationError;
use crate::session::{DocumentSide, Section, SessionState, Thumb};
use crate::steps::{self, Step};
use serde::Serialize;
use std::fmt;

/// A required input the user has not provided yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MissingField {
    Photo,
    Signature,
    Document,
    DocumentType { index: usize },
    DocumentSide { index: usize, side: DocumentSide },
    Thumbprint,
    Section(Section),
}

impl MissingField {
    pub fn to_validation_error(&self) -> ValidationError {
        match self {
            MissingField::Photo => ValidationError::MissingPhoto,
            MissingField::Signature => ValidationError::MissingSignature,
            MissingField::Document => ValidationError::MissingDocument,
            MissingField::DocumentType { index } => {
                ValidationError::MissingDocumentType { index: *index }
            }
            MissingField::DocumentSide { index, side } => ValidationError::MissingDocumentSide {
                index: *index,
                side: side.as_str(),
            },
            MissingField::Thumbprint => ValidationError::MissingThumbprint,
            MissingField::Section(section) => ValidationError::SectionPending {
                section: section.as_str(),
            },
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_validation_error())
    }
}

/// Rendered state of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step: Step,
    pub title: &'static str,
    pub position: usize,
    pub total: usize,
    pub fields: Vec<FieldStatus>,
    pub missing: Vec<MissingField>,
    pub submitted: bool,
    pub can_submit: bool,
}

/// One captured field and whether it has data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldStatus {
    pub label: String,
    pub present: bool,
}

impl FieldStatus {
    fn new<S: Into<String>>(label: S, present: bool) -> Self {
        Self {
            label: label.into(),
            present,
        }
    }
}

/// Sidebar entry for the progress display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidebarItem {
    pub step: Step,
    pub title: &'static str,
    pub current: bool,
    pub completed: bool,
    pub reachable: bool,
}

pub fn missing_fields(state: &SessionState, step: Step) -> Vec<MissingField> {
    let mut missing = Vec::new();
    match step {
        Step::PhotoSignature => {
            if state.photo.is_none() {
                missing.push(MissingField::Photo);
            }
            if state.signature.is_none() {
                missing.push(MissingField::Signature);
            }
        }
        Step::Identification => {
            if state.identification.is_empty() {
                missing.push(MissingField::Document);
            }
            for (index, doc) in state.identification.iter().enumerate() {
                match doc.doc_type {
                    None => missing.push(MissingField::DocumentType { index }),
                    Some(doc_type) => {
                        if doc.front.is_none() {
                            missing.push(MissingField::DocumentSide {
                                index,
                                side: DocumentSide::Front,
                            });
                        }
                        if doc_type.requires_both() && doc.back.is_none() {
                            missing.push(MissingField::DocumentSide {
                                index,
                                side: DocumentSide::Back,
                            });
                        }
                    }
                }
            }
        }
        Step::Fingerprint => {
            if !state.fingerprints.any() {
                missing.push(MissingField::Thumbprint);
            }
        }
        Step::Review => {
            for step in state.visible_steps() {
                if let Some(section) = Section::for_step(step) {
                    if !state.submissions.is_submitted(section) {
                        missing.push(MissingField::Section(section));
                    }
                }
            }
        }
    }
    missing
}

fn field_statuses(state: &SessionState, step: Step) -> Vec<FieldStatus> {
    match step {
        Step::PhotoSignature => vec![
            FieldStatus::new("Photo", state.photo.is_some()),
            FieldStatus::new("Signature", state.signature.is_some()),
        ],
        Step::Identification => state
            .identification
            .iter()
            .enumerate()
            .flat_map(|(index, doc)| {
                let name = doc
                    .doc_type
                    .map(|t| t.label().to_string())
                    .unwrap_or_else(|| "Document".to_string());
                let mut fields = vec![FieldStatus::new(
                    format!("{} #{} front", name, index + 1),
                    doc.front.is_some(),
                )];
                if doc.doc_type.map(|t| t.requires_both()).unwrap_or(false) {
                    fields.push(FieldStatus::new(
                        format!("{} #{} back", name, index + 1),
                        doc.back.is_some(),
                    ));
                }
                fields
            })
            .collect(),
        Step::Fingerprint => vec![
            FieldStatus::new("Thumbprint 1", state.fingerprints.get(Thumb::First).is_some()),
            FieldStatus::new("Thumbprint 2", state.fingerprints.get(Thumb::Second).is_some()),
        ],
        Step::Review => state
            .visible_steps()
            .into_iter()
            .filter_map(|step| {
                Section::for_step(step).map(|section| {
                    FieldStatus::new(step.title(), state.submissions.is_submitted(section))
                })
            })
            .collect(),
    }
}

/// Build the view model for `step`
pub fn render_step(state: &SessionState, step: Step) -> StepView {
    let visible = state.visible_steps();
    let position = visible.iter().position(|s| *s == step).map(|p| p + 1).unwrap_or(0);
    let missing = missing_fields(state, step);
    let submitted = steps::is_step_completed(state, step);
    let can_submit = missing.is_empty() && !(step == Step::Review && state.is_completed);

    StepView {
        step,
        title: step.title(),
        position,
        total: visible.len(),
        fields: field_statuses(state, step),
        missing,
        submitted,
        can_submit,
    }
}

pub fn render_current(state: &SessionState) -> StepView {
    render_step(state, state.current_step)
}

pub fn sidebar(state: &SessionState) -> Vec<SidebarItem> {
    state
        .visible_steps()
        .into_iter()
        .map(|step| SidebarItem {
            step,
            title: step.title(),
            current: step == state.current_step,
            completed: steps::is_step_completed(state, step),
            reachable: steps::can_navigate_to(state, step),
        })
        .collect()
}

/// Gate for the forward control: first missing field as an error
pub fn validate_step(state: &SessionState, step: Step) -> Result<(), ValidationError> {
    if step == Step::Review && state.is_completed {
        return Err(ValidationError::AlreadyCompleted);
    }
    match missing_fields(state, step).first() {
        Some(field) => Err(field.to_validation_error()),
        None => Ok(()),
    }
}
