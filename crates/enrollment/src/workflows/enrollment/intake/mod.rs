//! Reference backend for the three persistence endpoints plus the progress read-back.

pub mod repository;
pub mod router;
pub mod service;

pub use repository::{
    DraftProgressView, DraftRecord, DraftRepository, InMemoryDraftRepository, Placement,
    RepositoryError, StoredDocument,
};
pub use router::enrollment_router;
pub use service::{EnrollmentIntakeService, IntakeError, SaveOutcome, SubmitOutcome};
