use crate::error::ValidationError;
use crate::image::DataUrl;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    NationalId,
    Passport,
    VoterId,
    DriversLicense,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::NationalId,
        DocumentType::Passport,
        DocumentType::VoterId,
        DocumentType::DriversLicense,
    ];

    /// Card-style documents carry data on both faces
    pub fn requires_both(&self) -> bool {
        matches!(self, DocumentType::NationalId | DocumentType::DriversLicense)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::NationalId => "national_id",
            DocumentType::Passport => "passport",
            DocumentType::VoterId => "voter_id",
            DocumentType::DriversLicense => "drivers_license",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::NationalId => "National ID",
            DocumentType::Passport => "Passport",
            DocumentType::VoterId => "Voter ID",
            DocumentType::DriversLicense => "Driver's License",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        DocumentType::ALL
            .into_iter()
            .find(|doc| doc.as_str() == normalized)
            .ok_or_else(|| format!("unknown document type '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSide {
    Front,
    Back,
}

impl DocumentSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentSide::Front => "front",
            DocumentSide::Back => "back",
        }
    }
}

/// One captured identification document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationDocument {
    pub doc_type: Option<DocumentType>,
    pub front: Option<DataUrl>,
    pub back: Option<DataUrl>,
}

impl IdentificationDocument {
    pub fn new(doc_type: DocumentType) -> Self {
        Self {
            doc_type: Some(doc_type),
            front: None,
            back: None,
        }
    }

    /// Change the type. Clearing it drops both sides; a type without a back
    /// face drops any stale back image.
    pub fn set_type(&mut self, doc_type: Option<DocumentType>) {
        match doc_type {
            None => {
                self.front = None;
                self.back = None;
            }
            Some(t) if !t.requires_both() => {
                self.back = None;
            }
            Some(_) => {}
        }
        self.doc_type = doc_type;
    }

    pub fn set_side(&mut self, side: DocumentSide, image: Option<DataUrl>) {
        match side {
            DocumentSide::Front => self.front = image,
            DocumentSide::Back => self.back = image,
        }
    }

    pub fn side(&self, side: DocumentSide) -> Option<&DataUrl> {
        match side {
            DocumentSide::Front => self.front.as_ref(),
            DocumentSide::Back => self.back.as_ref(),
        }
    }

    /// Check type and required sides; `index` is only used for reporting
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        let doc_type = self
            .doc_type
            .ok_or(ValidationError::MissingDocumentType { index })?;
        if self.front.is_none() {
            return Err(ValidationError::MissingDocumentSide {
                index,
                side: DocumentSide::Front.as_str(),
            });
        }
        if doc_type.requires_both() && self.back.is_none() {
            return Err(ValidationError::MissingDocumentSide {
                index,
                side: DocumentSide::Back.as_str(),
            });
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.validate(0).is_ok()
    }
}
