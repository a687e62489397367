use chrono::{NaiveDate, Utc};
use serde::Serialize;

use super::documents::{DocumentEncoder, SlotError, UploadedFile};
use super::domain::{ApplicationDraft, DocumentSlot, DraftError, FieldValue, StepNumber};
use super::persistence::{PersistenceError, ProgressBackend, ProgressClient, SubmitAck};
use super::validation::{ValidationEngine, ValidationResult};
use crate::config::EligibilityConfig;

pub const COMPLETED_MESSAGE: &str = "El formulario ya ha sido enviado y no se puede modificar";

/// Where the applicant is in the step machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum WizardState {
    Step(StepNumber),
    Submitting,
    Completed,
    /// A persistence call failed; the applicant still sees this step and may retry.
    Error(StepNumber),
}

impl WizardState {
    pub fn visible_step(&self) -> Option<StepNumber> {
        match self {
            WizardState::Step(step) | WizardState::Error(step) => Some(*step),
            WizardState::Submitting => Some(StepNumber::LAST),
            WizardState::Completed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WizardState::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advanced(StepNumber),
    Submitted { already_completed: bool },
    Retreated(StepNumber),
    /// Backward navigation from the first step.
    Stayed(StepNumber),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("hay {} campo(s) con errores", .0.len())]
    ClientValidation(ValidationResult),
    #[error("{0}")]
    ServerValidation(String),
    #[error("{0}")]
    Connectivity(String),
    #[error("{0}")]
    Conflict(String),
}

impl From<DraftError> for WizardError {
    fn from(err: DraftError) -> Self {
        match err {
            DraftError::Completed => WizardError::Conflict(COMPLETED_MESSAGE.to_string()),
            DraftError::InvalidStep(_) => WizardError::Conflict(err.to_string()),
        }
    }
}

/// Drives one applicant's draft through the eight steps: validation first, then persistence,
/// then the state change. Every method takes `&mut self`, so calls for a draft never overlap.
pub struct EnrollmentWizard<B> {
    draft: ApplicationDraft,
    state: WizardState,
    errors: ValidationResult,
    engine: ValidationEngine,
    encoder: DocumentEncoder,
    client: ProgressClient<B>,
}

impl<B: ProgressBackend> EnrollmentWizard<B> {
    pub fn new(client: ProgressClient<B>, eligibility: EligibilityConfig) -> Self {
        Self::resume(ApplicationDraft::new(Utc::now()), client, eligibility)
    }

    /// Continue a draft from where it was left, e.g. after a restart.
    pub fn resume(
        draft: ApplicationDraft,
        client: ProgressClient<B>,
        eligibility: EligibilityConfig,
    ) -> Self {
        let state = if draft.is_completed() {
            WizardState::Completed
        } else {
            WizardState::Step(draft.current_step())
        };
        Self {
            draft,
            state,
            errors: ValidationResult::new(),
            engine: ValidationEngine::new(eligibility),
            encoder: DocumentEncoder::new(),
            client,
        }
    }

    pub fn with_encoder(mut self, encoder: DocumentEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn draft(&self) -> &ApplicationDraft {
        &self.draft
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn errors(&self) -> &ValidationResult {
        &self.errors
    }

    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    pub fn client(&self) -> &ProgressClient<B> {
        &self.client
    }

    pub fn set_field(
        &mut self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), WizardError> {
        self.ensure_open()?;
        self.draft.set_field(name, value, Utc::now())?;
        self.errors.remove(name);
        Ok(())
    }

    pub fn clear_field(&mut self, name: &str) -> Result<(), WizardError> {
        self.ensure_open()?;
        self.draft.clear_field(name, Utc::now())?;
        Ok(())
    }

    /// Check the file against the slot's constraints and attach it. A rejected file leaves
    /// the slot as it was and records the reason under the slot's field.
    pub fn attach_document(
        &mut self,
        slot: DocumentSlot,
        file: UploadedFile,
    ) -> Result<(), WizardError> {
        self.ensure_open()?;
        match self.encoder.accept(slot, file) {
            Ok(file) => {
                self.draft.attach(slot, file, Utc::now())?;
                self.errors.remove(slot.field_name());
                Ok(())
            }
            Err(err) => {
                tracing::debug!(slot = %slot, error = %err, "document rejected");
                let mut rejection = ValidationResult::new();
                rejection.set(slot.field_name(), err.to_string());
                self.errors.set(slot.field_name(), err.to_string());
                Err(WizardError::ClientValidation(rejection))
            }
        }
    }

    pub fn remove_document(
        &mut self,
        slot: DocumentSlot,
    ) -> Result<Option<UploadedFile>, WizardError> {
        self.ensure_open()?;
        Ok(self.draft.detach(slot, Utc::now())?)
    }

    /// Step back without persisting. Values are kept and errors cleared.
    pub fn previous(&mut self) -> Result<Transition, WizardError> {
        self.ensure_open()?;
        self.errors.clear();
        if self.draft.current_step().is_first() {
            self.state = WizardState::Step(StepNumber::FIRST);
            return Ok(Transition::Stayed(StepNumber::FIRST));
        }
        let step = self.draft.step_back()?;
        self.state = WizardState::Step(step);
        tracing::debug!(step = step.get(), "moved back");
        Ok(Transition::Retreated(step))
    }

    /// Validate the visible step and, when it passes, persist and move forward. On the last
    /// step this encodes the documents and submits the application.
    pub async fn next(&mut self, today: NaiveDate) -> Result<Transition, WizardError> {
        let step = match self.state {
            WizardState::Completed => {
                return Err(WizardError::Conflict(COMPLETED_MESSAGE.to_string()))
            }
            // A submission whose future was dropped midway is retried from the last step.
            WizardState::Submitting => StepNumber::LAST,
            WizardState::Step(step) | WizardState::Error(step) => step,
        };

        let result = self.engine.validate(step, &self.draft, today);
        if !result.is_valid() {
            tracing::debug!(step = step.get(), errors = result.len(), "step failed validation");
            self.state = WizardState::Step(step);
            self.errors = result.clone();
            return Err(WizardError::ClientValidation(result));
        }
        self.errors.clear();

        if step.is_last() {
            // Earlier answers may have been edited after their step was confirmed.
            if let (Some(invalid), errors) = self.engine.validate_all(&self.draft, today) {
                tracing::debug!(
                    step = invalid.get(),
                    errors = errors.len(),
                    "earlier step no longer valid; submission held back"
                );
                self.draft.return_to(invalid)?;
                self.state = WizardState::Step(invalid);
                self.errors = errors.clone();
                return Err(WizardError::ClientValidation(errors));
            }
            return self.submit().await;
        }

        let fields = self.draft.wire_fields();
        let outcome = match self.draft.draft_id().cloned() {
            None => self
                .client
                .create_draft(&fields)
                .await
                .map(|draft_id| self.draft.assign_id(draft_id)),
            Some(draft_id) => self
                .client
                .save_partial(&draft_id, step, &fields)
                .await
                .map(|_| ()),
        };

        match outcome {
            Ok(()) => {
                let next = self.draft.advance(Utc::now())?;
                self.state = WizardState::Step(next);
                tracing::info!(
                    draft_id = ?self.draft.draft_id().map(|id| id.0.as_str()),
                    step = next.get(),
                    "advanced"
                );
                Ok(Transition::Advanced(next))
            }
            Err(err) => Err(self.fail(step, err)),
        }
    }

    async fn submit(&mut self) -> Result<Transition, WizardError> {
        let step = StepNumber::LAST;
        let Some(draft_id) = self.draft.draft_id().cloned() else {
            let message = "Debe completar el registro inicial antes de enviar la inscripción";
            self.state = WizardState::Error(step);
            self.errors.set_general(message);
            return Err(WizardError::ServerValidation(message.to_string()));
        };

        self.state = WizardState::Submitting;
        let encoded = match self.encoder.encode_documents(&self.draft).await {
            Ok(encoded) => encoded,
            Err(err) => return Err(self.reject_document(step, err)),
        };

        let mut fields = self.draft.wire_fields();
        let document_count = encoded.len();
        encoded.into_fields(&mut fields);

        match self.client.submit_complete(&draft_id, &fields).await {
            Ok(ack) => {
                self.draft.mark_completed(Utc::now())?;
                self.state = WizardState::Completed;
                tracing::info!(
                    draft_id = %draft_id,
                    documents = document_count,
                    "enrollment completed"
                );
                Ok(Transition::Submitted {
                    already_completed: ack == SubmitAck::AlreadyCompleted,
                })
            }
            Err(err) => Err(self.fail(step, err)),
        }
    }

    fn reject_document(&mut self, step: StepNumber, err: SlotError) -> WizardError {
        tracing::warn!(step = step.get(), error = %err, "document could not be encoded");
        self.state = WizardState::Error(step);
        if let Some(field) = err.field() {
            self.errors.set(field, err.to_string());
        }
        self.errors.set_general(err.to_string());
        WizardError::ClientValidation(self.errors.clone())
    }

    fn fail(&mut self, step: StepNumber, err: PersistenceError) -> WizardError {
        tracing::warn!(
            step = step.get(),
            retryable = err.is_retryable(),
            error = %err,
            "persistence call failed"
        );
        self.state = WizardState::Error(step);
        self.errors.set_general(err.to_string());
        match err {
            PersistenceError::Validation(message) | PersistenceError::Conflict(message) => {
                WizardError::ServerValidation(message)
            }
            PersistenceError::AlreadyCompleted(message) => WizardError::Conflict(message),
            PersistenceError::Connectivity(message) => WizardError::Connectivity(message),
            timeout @ PersistenceError::Timeout(_) => {
                WizardError::Connectivity(timeout.to_string())
            }
        }
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        match self.state {
            WizardState::Completed => Err(WizardError::Conflict(COMPLETED_MESSAGE.to_string())),
            _ => Ok(()),
        }
    }
}
