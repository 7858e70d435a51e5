mod client;
mod fingerprint;
mod response;
#[cfg(test)]
mod tests;
mod types;

pub use client::{ImagingBackend, ImagingClient};
pub use fingerprint::{parse_capture_body, FingerprintDevice, FingerprintScanner};
pub use response::{
    interpret_body, is_empty_array_placeholder, normalize_decision, normalize_submit,
    Acknowledgement, LookupOutcome, LookupStatus, SubmitOutcome,
};
pub use types::{
    ApprovalRequest, DocumentPayload, EnquiryBundle, FingerprintPayload, IdentificationPayload,
    ImageBundle, ImageKind, ImageSet, SaveDataForm, SidesPayload,
};
