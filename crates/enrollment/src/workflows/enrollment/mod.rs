//! Eligibility-driven, eight-step enrollment: the step table, validation, document handling,
//! draft persistence, the wizard state machine, and a reference intake backend.

pub mod blueprint;
pub mod catalog;
pub mod documents;
pub mod domain;
pub mod intake;
pub mod persistence;
pub mod validation;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use blueprint::{EnrollmentBlueprint, StepSpec};
pub use documents::{DocumentEncoder, EncodedDocuments, FileSource, SlotError, UploadedFile};
pub use domain::{
    field, fields_from_json, ApplicationDraft, DocumentSlot, DraftError, DraftId, DraftStatus,
    FieldMap, FieldValue, PersonType, StepNumber,
};
pub use intake::{
    enrollment_router, DraftRepository, EnrollmentIntakeService, InMemoryDraftRepository,
};
pub use persistence::{
    HttpProgressBackend, PersistenceError, ProgressBackend, ProgressClient, SaveAck, SubmitAck,
};
pub use validation::{ValidationEngine, ValidationResult, GENERAL};
pub use wizard::{EnrollmentWizard, Transition, WizardError, WizardState};
