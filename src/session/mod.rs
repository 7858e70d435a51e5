mod identification;
mod state;
mod store;
#[cfg(test)]
mod tests;

pub use identification::{DocumentSide, DocumentType, IdentificationDocument};
pub use state::{
    reduce, EnrollmentMode, Fingerprints, Section, SessionAction, SessionState, Submissions,
    Thumb,
};
pub use store::SessionStore;
