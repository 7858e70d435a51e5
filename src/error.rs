use thiserror::Error;

#[derive(Error, Debug)]
pub enum BioCaptureError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Media device error: {0}")]
    Media(#[from] MediaError),

    #[error("Route error: {0}")]
    Route(#[from] RouteError),
}

/// Failures talking to the imaging backend or the fingerprint device.
///
/// These never cross the controller boundary as `Err`; they are folded into
/// outcome values so the caller decides whether to notify and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {details}")]
    Network { details: String },

    #[error("Server responded with status {status}: {body}")]
    Protocol { status: u16, body: String },

    #[error("Unrecognized response format: {details}")]
    Format { details: String },
}

impl ApiError {
    pub fn network<S: Into<String>>(details: S) -> Self {
        Self::Network {
            details: details.into(),
        }
    }

    pub fn format<S: Into<String>>(details: S) -> Self {
        Self::Format {
            details: details.into(),
        }
    }

    /// Short label used in logs and events
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Network { .. } => "network",
            ApiError::Protocol { .. } => "protocol",
            ApiError::Format { .. } => "format",
        }
    }
}

/// A required capture field is missing; raised before any request is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Photo is required")]
    MissingPhoto,

    #[error("Signature is required")]
    MissingSignature,

    #[error("At least one identification document is required")]
    MissingDocument,

    #[error("Document {index} has no type selected")]
    MissingDocumentType { index: usize },

    #[error("Document {index} is missing its {side} side")]
    MissingDocumentSide { index: usize, side: &'static str },

    #[error("At least one thumbprint is required")]
    MissingThumbprint,

    #[error("Section '{section}' must be submitted before review")]
    SectionPending { section: &'static str },

    #[error("Enrollment has already been completed")]
    AlreadyCompleted,

    #[error("No relation number is set for this session")]
    MissingRelation,

    #[error("Photo and signature capture cannot be disabled")]
    ImageMandatory,

    #[error("Invalid image data: {details}")]
    InvalidImage { details: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Failed to open media device: {details}")]
    DeviceOpen { details: String },

    #[error("No active media stream")]
    NotCapturing,

    #[error("Failed to grab frame: {details}")]
    Snapshot { details: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Route segment '{segment}' is not of the form action-id")]
    Malformed { segment: String },

    #[error("Unknown route action '{action}'")]
    UnknownAction { action: String },
}

pub type Result<T> = std::result::Result<T, BioCaptureError>;

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}
