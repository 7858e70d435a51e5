use crate::session::{
    DocumentType, EnrollmentMode, Fingerprints, IdentificationDocument, SessionState,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Value of the `a` field on `capture_browse`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Photo = 1,
    Signature = 2,
}

impl ImageKind {
    pub fn form_value(&self) -> &'static str {
        match self {
            ImageKind::Photo => "1",
            ImageKind::Signature => "2",
        }
    }
}

/// Body of `capture_id_details-{relation}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentificationPayload {
    pub documents: Vec<DocumentPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentPayload {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub sides: SidesPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidesPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
}

impl IdentificationPayload {
    /// Documents without a type are skipped; images are sent as raw base64
    pub fn from_documents(documents: &[IdentificationDocument]) -> Self {
        let documents = documents
            .iter()
            .filter_map(|doc| {
                doc.doc_type.map(|doc_type| DocumentPayload {
                    doc_type,
                    sides: SidesPayload {
                        front: doc.front.as_ref().map(|img| img.payload().to_string()),
                        back: doc.back.as_ref().map(|img| img.payload().to_string()),
                    },
                })
            })
            .collect();
        Self { documents }
    }
}

/// Body of `capture_fingerprint-{relation}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FingerprintPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbprint1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbprint2: Option<String>,
}

impl From<&Fingerprints> for FingerprintPayload {
    fn from(prints: &Fingerprints) -> Self {
        Self {
            thumbprint1: prints.thumbprint1.as_ref().map(|img| img.payload().to_string()),
            thumbprint2: prints.thumbprint2.as_ref().map(|img| img.payload().to_string()),
        }
    }
}

/// Multipart fields of `savedata`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDataForm {
    pub pix: String,
    pub sigchange: String,
    pub relationid: String,
    pub batchno: String,
    pub action: EnrollmentMode,
}

impl SaveDataForm {
    /// Build from session state; `None` when there is no relation number
    pub fn from_state(state: &SessionState) -> Option<Self> {
        let relationid = state.relation_no.clone()?;
        Some(Self {
            pix: state
                .photo
                .as_ref()
                .map(|img| img.payload().to_string())
                .unwrap_or_default(),
            sigchange: state
                .signature
                .as_ref()
                .map(|img| img.payload().to_string())
                .unwrap_or_default(),
            relationid,
            batchno: state.batch_no.clone().unwrap_or_default(),
            action: state.mode,
        })
    }

    pub fn fields(&self) -> [(&'static str, String); 5] {
        [
            ("pix", self.pix.clone()),
            ("sigchange", self.sigchange.clone()),
            ("relationid", self.relationid.clone()),
            ("batchno", self.batchno.clone()),
            ("action", self.action.as_form_value().to_string()),
        ]
    }
}

/// Images held for a relation, split by approval state
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageBundle {
    #[serde(default, deserialize_with = "deserialize_image_set")]
    pub approved: ImageSet,
    #[serde(default, deserialize_with = "deserialize_image_set")]
    pub unapproved: ImageSet,
}

impl ImageBundle {
    pub fn is_empty(&self) -> bool {
        self.approved.is_empty() && self.unapproved.is_empty()
    }
}

/// Loose key/value view over one image record
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ImageSet {
    pub fields: Map<String, Value>,
}

impl ImageSet {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.get_str(key))
            .filter(|value| !value.is_empty())
    }

    pub fn photo(&self) -> Option<&str> {
        self.first_of(&["photo", "pix", "image"])
    }

    pub fn signature(&self) -> Option<&str> {
        self.first_of(&["signature", "sig", "sigchange"])
    }

    pub fn batch(&self) -> Option<&str> {
        self.first_of(&["batch", "batchno", "batch_no"])
    }
}

/// PHP serializes an empty map as `[]`; treat that and `null` as empty
fn deserialize_image_set<'de, D>(deserializer: D) -> Result<ImageSet, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Object(fields) => Ok(ImageSet { fields }),
        Value::Null => Ok(ImageSet::default()),
        Value::Array(items) if items.is_empty() => Ok(ImageSet::default()),
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Object(fields)) => Ok(ImageSet { fields }),
            _ => Err(D::Error::custom("image list must contain objects")),
        },
        other => Err(D::Error::custom(format!("unexpected image set {}", other))),
    }
}

/// Identifiers embedded in approve/reject paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub relation_no: String,
    pub batch: String,
    pub cust_no: String,
    pub actor: String,
    pub hostname: String,
    pub terminal_ip: String,
}

impl ApprovalRequest {
    /// `{prefix}-{relationno}-{batch}-{custno}-{actor}-{hostname}-{terminalIp}`
    pub fn path_segment(&self, prefix: &str) -> String {
        format!(
            "{}-{}-{}-{}-{}-{}-{}",
            prefix,
            self.relation_no,
            self.batch,
            self.cust_no,
            self.actor,
            self.hostname,
            self.terminal_ip
        )
    }
}

/// Read-only enquiry record; the backend shape varies so fields stay loose
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct EnquiryBundle {
    pub fields: Map<String, Value>,
}

impl EnquiryBundle {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Scalar fields as sorted `(key, text)` pairs for display
    pub fn display_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .fields
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((key.clone(), text))
            })
            .collect();
        pairs.sort();
        pairs
    }
}
