use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use super::super::catalog;
use super::super::documents::{DocumentEncoder, SlotError};
use super::super::domain::{
    field, ApplicationDraft, DocumentSlot, DraftId, FieldMap, FieldValue, StepNumber,
};
use super::super::validation::{ValidationEngine, ValidationResult};
use super::repository::{DraftRecord, DraftRepository, Placement, RepositoryError, StoredDocument};
use crate::config::EligibilityConfig;

/// Server side of the enrollment flow: identity checks, idempotent partial saves, and the
/// final re-validation before an application is accepted.
pub struct EnrollmentIntakeService<R> {
    repository: Arc<R>,
    engine: Arc<ValidationEngine>,
    encoder: DocumentEncoder,
}

static DRAFT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_draft_id() -> DraftId {
    let id = DRAFT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DraftId(format!("draft-{id:06}"))
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub record: DraftRecord,
    /// False when the save repeated what was already stored.
    pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub record: DraftRecord,
    pub placement: Placement,
}

impl<R> EnrollmentIntakeService<R>
where
    R: DraftRepository + 'static,
{
    pub fn new(repository: Arc<R>, eligibility: EligibilityConfig) -> Self {
        Self {
            repository,
            engine: Arc::new(ValidationEngine::new(eligibility)),
            encoder: DocumentEncoder::new(),
        }
    }

    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    /// Accept the first step and hand out a draft id.
    pub fn register_initial(
        &self,
        mut fields: FieldMap,
        today: NaiveDate,
    ) -> Result<DraftRecord, IntakeError> {
        let now = Utc::now();
        fields
            .entry(field::CONVOCATORIA.to_string())
            .or_insert_with(|| FieldValue::Text(self.engine.eligibility().convocatoria.clone()));

        let draft = ApplicationDraft::from_fields(fields.clone(), now);
        let mut errors = self.engine.validate(StepNumber::FIRST, &draft, today);
        errors.retain_transmitted();
        if !errors.is_valid() {
            tracing::info!(errors = errors.len(), "initial registration rejected");
            return Err(IntakeError::Validation(errors));
        }

        let record = DraftRecord::new(next_draft_id(), stored_fields(fields), now);
        let stored = self.repository.insert(record)?;
        tracing::info!(draft_id = %stored.draft_id, "draft registered");
        Ok(stored)
    }

    /// Merge a step's answers into the draft. Replays of an identical save change nothing,
    /// and the recorded step never moves backwards.
    pub fn save_partial(
        &self,
        draft_id: &DraftId,
        step: StepNumber,
        fields: FieldMap,
    ) -> Result<SaveOutcome, IntakeError> {
        let mut record = self.fetch_open(draft_id)?;

        let mut merged = record.fields.clone();
        merged.extend(stored_fields(fields));
        let step_reached = record.step_reached.max(step);

        if merged == record.fields && step_reached == record.step_reached {
            tracing::debug!(draft_id = %draft_id, step = step.get(), "partial save replayed");
            return Ok(SaveOutcome {
                record,
                changed: false,
            });
        }

        record.fields = merged;
        record.step_reached = step_reached;
        record.updated_at = Utc::now();
        self.repository.update(record.clone())?;
        tracing::info!(draft_id = %draft_id, step = step.get(), "partial progress stored");
        Ok(SaveOutcome {
            record,
            changed: true,
        })
    }

    /// Final submission: decode the documents, re-run every step's checks at `today`, and
    /// record the placement. A draft that was already submitted is reported as such.
    pub fn submit(
        &self,
        draft_id: &DraftId,
        fields: FieldMap,
        today: NaiveDate,
    ) -> Result<SubmitOutcome, IntakeError> {
        let mut record = self.fetch_open(draft_id)?;
        let now = Utc::now();

        let documents = self.encoder.decode(&fields)?;
        let mut answers = record.fields.clone();
        answers.extend(fields.into_iter().filter(|(name, _)| !is_document_field(name)));

        let mut draft = ApplicationDraft::from_fields(answers.clone(), now);
        for (slot, file) in &documents {
            draft.attach(*slot, file.clone(), now)?;
        }

        let mut errors = ValidationResult::new();
        let mut first_invalid = None;
        for step in StepNumber::all() {
            let mut step_errors = self.engine.validate(step, &draft, today);
            step_errors.retain_transmitted();
            if !step_errors.is_valid() && first_invalid.is_none() {
                first_invalid = Some(step);
            }
            errors.merge(step_errors);
        }
        if let Some(step) = first_invalid {
            tracing::info!(
                draft_id = %draft_id,
                step = step.get(),
                errors = errors.len(),
                "submission incomplete"
            );
            return Err(IntakeError::Incomplete { step, errors });
        }

        let quota = record
            .municipio()
            .or_else(|| draft.text(field::MUNICIPIO))
            .and_then(catalog::find_municipality)
            .map(|municipality| municipality.quota)
            .unwrap_or(0);

        record.fields = stored_fields(answers);
        record.documents = documents
            .iter()
            .map(|(slot, file)| (*slot, StoredDocument::from(file)))
            .collect();
        record.step_reached = StepNumber::LAST;
        record.updated_at = now;
        record.submitted_at = Some(now);

        let record = self.repository.complete(record, quota)?;
        let placement = record.placement.unwrap_or(Placement::ListaEspera);
        tracing::info!(
            draft_id = %draft_id,
            placement = placement.label(),
            documents = record.documents.len(),
            "application submitted"
        );
        Ok(SubmitOutcome { record, placement })
    }

    pub fn progress(&self, draft_id: &DraftId) -> Result<DraftRecord, IntakeError> {
        self.repository
            .fetch(draft_id)?
            .ok_or(IntakeError::NotFound)
    }

    /// Drafts nobody has touched since `cutoff`. Nothing is deleted.
    pub fn stale_drafts(&self, cutoff: DateTime<Utc>) -> Result<Vec<DraftRecord>, IntakeError> {
        Ok(self.repository.stale(cutoff)?)
    }

    fn fetch_open(&self, draft_id: &DraftId) -> Result<DraftRecord, IntakeError> {
        let record = self.progress(draft_id)?;
        if record.is_submitted() {
            return Err(IntakeError::AlreadySubmitted);
        }
        Ok(record)
    }
}

fn is_document_field(name: &str) -> bool {
    DocumentSlot::ALL
        .iter()
        .any(|slot| slot.field_name() == name || slot.name_field() == name)
}

/// Answers as they are kept on record: no credentials, no document payloads.
fn stored_fields(fields: FieldMap) -> FieldMap {
    fields
        .into_iter()
        .filter(|(name, _)| {
            name != field::PASSWORD && name != field::CONFIRM_PASSWORD && !is_document_field(name)
        })
        .collect()
}

pub const DUPLICATE_EMAIL: &str = "El correo electrónico ya está registrado";
pub const DUPLICATE_DOCUMENT: &str = "El número de documento ya está registrado";

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("{}", .0.summary().unwrap_or("Datos inválidos"))]
    Validation(ValidationResult),
    #[error("La inscripción está incompleta en el paso {step}: {}", .errors.summary().unwrap_or("faltan datos"))]
    Incomplete {
        step: StepNumber,
        errors: ValidationResult,
    },
    #[error("{0}")]
    DuplicateIdentity(&'static str),
    #[error("El formulario ya ha sido enviado y no se puede modificar")]
    AlreadySubmitted,
    #[error("Usuario no encontrado")]
    NotFound,
    #[error(transparent)]
    Document(#[from] SlotError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for IntakeError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateEmail => IntakeError::DuplicateIdentity(DUPLICATE_EMAIL),
            RepositoryError::DuplicateDocument => {
                IntakeError::DuplicateIdentity(DUPLICATE_DOCUMENT)
            }
            RepositoryError::AlreadySubmitted => IntakeError::AlreadySubmitted,
            RepositoryError::NotFound => IntakeError::NotFound,
            other => IntakeError::Repository(other),
        }
    }
}

impl From<super::super::domain::DraftError> for IntakeError {
    fn from(_: super::super::domain::DraftError) -> Self {
        IntakeError::AlreadySubmitted
    }
}
