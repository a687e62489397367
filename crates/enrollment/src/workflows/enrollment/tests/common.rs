use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::config::EligibilityConfig;
use crate::workflows::enrollment::documents::UploadedFile;
use crate::workflows::enrollment::domain::{
    field, ApplicationDraft, DocumentSlot, DraftId, FieldMap, FieldValue, StepNumber,
};
use crate::workflows::enrollment::intake::{EnrollmentIntakeService, InMemoryDraftRepository};
use crate::workflows::enrollment::persistence::{PersistenceError, ProgressBackend, ProgressClient};
use crate::workflows::enrollment::wizard::EnrollmentWizard;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn step(value: u8) -> StepNumber {
    StepNumber::new(value).expect("valid step")
}

/// Complete first-step answers for a 25-year-old natural person from Pasto.
pub(super) fn general_answers(
    email: &str,
    document_number: &str,
) -> Vec<(&'static str, FieldValue)> {
    vec![
        (field::NOMBRE, "Ana".into()),
        (field::APELLIDO, "Pérez".into()),
        (field::EMAIL, email.into()),
        (field::TIPO_DOCUMENTO, "cedula".into()),
        (field::NUMERO_DOCUMENTO, document_number.into()),
        (field::FECHA_NACIMIENTO, "2000-05-10".into()),
        (field::SEXO, "femenino".into()),
        (field::ESTADO_CIVIL, "soltero".into()),
        (field::TELEFONO, "3001234567".into()),
        (field::DIRECCION, "Calle 18 # 25-30".into()),
        (field::MUNICIPIO, "Pasto".into()),
        (field::EMPRENDIMIENTO_NOMBRE, "Café de Origen".into()),
        (field::EMPRENDIMIENTO_SECTOR, "agroindustria".into()),
        (field::TIPO_PERSONA, "natural".into()),
        (field::PASSWORD, "clave2025".into()),
        (field::CONFIRM_PASSWORD, "clave2025".into()),
    ]
}

/// Answers for steps 6 to 8: formalized, no state financing, every declaration accepted.
pub(super) fn later_answers() -> Vec<(&'static str, FieldValue)> {
    vec![
        (field::EMPRENDIMIENTO_FORMALIZADO, true.into()),
        (field::FINANCIADO_ESTADO, false.into()),
        (field::DECLARA_VERAZ, true.into()),
        (field::DECLARA_NO_BENEFICIARIO, true.into()),
        (field::ACEPTA_TERMINOS, true.into()),
    ]
}

/// Every document a formalized natural person must attach.
pub(super) fn required_documents() -> Vec<(DocumentSlot, UploadedFile)> {
    [
        DocumentSlot::DocTerminos,
        DocumentSlot::DocUsoImagen,
        DocumentSlot::DocVecindad,
        DocumentSlot::Rut,
        DocumentSlot::Cedula,
        DocumentSlot::AntecedentesFiscales,
        DocumentSlot::AntecedentesDisciplinarios,
        DocumentSlot::AntecedentesJudiciales,
        DocumentSlot::Redam,
        DocumentSlot::InhabilidadesSexuales,
        DocumentSlot::DeclaracionCapacidadLegal,
        DocumentSlot::MatriculaMercantil,
        DocumentSlot::Facturas6Meses,
    ]
    .into_iter()
    .map(|slot| (slot, pdf(&format!("{}.pdf", slot.field_name()))))
    .chain(std::iter::once((
        DocumentSlot::DocPlanNegocio,
        xlsx("plan_negocio.xlsx"),
    )))
    .collect()
}

pub(super) fn pdf(name: &str) -> UploadedFile {
    UploadedFile::from_bytes(name, None, b"%PDF-1.4 enrollment".to_vec())
}

pub(super) fn xlsx(name: &str) -> UploadedFile {
    UploadedFile::from_bytes(name, None, b"PK\x03\x04 plan".to_vec())
}

pub(super) fn draft_with(answers: &[(&'static str, FieldValue)]) -> ApplicationDraft {
    let now = Utc::now();
    let mut draft = ApplicationDraft::new(now);
    for (name, value) in answers {
        draft
            .set_field(*name, value.clone(), now)
            .expect("mutable draft");
    }
    draft
}

pub(super) fn complete_draft() -> ApplicationDraft {
    let now = Utc::now();
    let mut draft = draft_with(&general_answers("ana.perez@correo.co", "1085123456"));
    for (name, value) in later_answers() {
        draft.set_field(name, value, now).expect("mutable draft");
    }
    for (slot, file) in required_documents() {
        draft.attach(slot, file, now).expect("mutable draft");
    }
    draft
}

pub(super) fn fill<B: ProgressBackend>(
    wizard: &mut EnrollmentWizard<B>,
    answers: Vec<(&'static str, FieldValue)>,
) {
    for (name, value) in answers {
        wizard.set_field(name, value).expect("wizard accepts answers");
    }
}

pub(super) fn attach_all<B: ProgressBackend>(wizard: &mut EnrollmentWizard<B>) {
    for (slot, file) in required_documents() {
        wizard
            .attach_document(slot, file)
            .expect("document accepted");
    }
}

pub(super) fn fields(answers: Vec<(&'static str, FieldValue)>) -> FieldMap {
    answers
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

pub(super) fn json_object(answers: Vec<(&'static str, FieldValue)>) -> Map<String, Value> {
    answers
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                FieldValue::Flag(flag) => Value::Bool(flag),
                FieldValue::Text(text) => Value::String(text),
            };
            (name.to_string(), value)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Call {
    Create(FieldMap),
    Save(DraftId, StepNumber, FieldMap),
    Submit(DraftId, FieldMap),
}

/// Backend double that records every call and answers from per-operation scripts.
/// An empty script means success.
#[derive(Default)]
pub(super) struct ScriptedBackend {
    calls: Mutex<Vec<Call>>,
    create: Mutex<VecDeque<Result<DraftId, PersistenceError>>>,
    save: Mutex<VecDeque<Result<(), PersistenceError>>>,
    submit: Mutex<VecDeque<Result<(), PersistenceError>>>,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub(super) fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(super) fn fail_create(&self, err: PersistenceError) {
        self.create.lock().expect("script lock").push_back(Err(err));
    }

    pub(super) fn fail_save(&self, err: PersistenceError) {
        self.save.lock().expect("script lock").push_back(Err(err));
    }

    pub(super) fn fail_submit(&self, err: PersistenceError) {
        self.submit.lock().expect("script lock").push_back(Err(err));
    }

    pub(super) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl ProgressBackend for ScriptedBackend {
    async fn create_draft(&self, fields: &FieldMap) -> Result<DraftId, PersistenceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.record(Call::Create(fields.clone()));
        self.create
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(DraftId("draft-000042".to_string())))
    }

    async fn save_partial(
        &self,
        draft_id: &DraftId,
        step: StepNumber,
        fields: &FieldMap,
    ) -> Result<(), PersistenceError> {
        self.record(Call::Save(draft_id.clone(), step, fields.clone()));
        self.save
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn submit_complete(
        &self,
        draft_id: &DraftId,
        fields: &FieldMap,
    ) -> Result<(), PersistenceError> {
        self.record(Call::Submit(draft_id.clone(), fields.clone()));
        self.submit
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

pub(super) fn scripted_wizard() -> (EnrollmentWizard<Arc<ScriptedBackend>>, Arc<ScriptedBackend>) {
    wizard_over(ScriptedBackend::default())
}

pub(super) fn wizard_over(
    backend: ScriptedBackend,
) -> (EnrollmentWizard<Arc<ScriptedBackend>>, Arc<ScriptedBackend>) {
    wizard_with_timeout(backend, Duration::from_secs(2))
}

pub(super) fn wizard_with_timeout(
    backend: ScriptedBackend,
    timeout: Duration,
) -> (EnrollmentWizard<Arc<ScriptedBackend>>, Arc<ScriptedBackend>) {
    let backend = Arc::new(backend);
    let client = ProgressClient::new(Arc::clone(&backend), timeout);
    let wizard = EnrollmentWizard::new(client, EligibilityConfig::default());
    (wizard, backend)
}

pub(super) type MemoryIntake = EnrollmentIntakeService<InMemoryDraftRepository>;

pub(super) fn intake_service() -> (Arc<MemoryIntake>, Arc<InMemoryDraftRepository>) {
    let repository = Arc::new(InMemoryDraftRepository::default());
    let service = Arc::new(EnrollmentIntakeService::new(
        Arc::clone(&repository),
        EligibilityConfig::default(),
    ));
    (service, repository)
}

/// Backend that calls the intake service in-process, so wizard and server rules meet
/// without a network in between.
pub(super) struct InProcessBackend {
    pub(super) service: Arc<MemoryIntake>,
    pub(super) today: NaiveDate,
}

fn rejected(err: crate::workflows::enrollment::intake::IntakeError) -> PersistenceError {
    use crate::workflows::enrollment::intake::IntakeError;

    match err {
        IntakeError::DuplicateIdentity(message) => PersistenceError::Conflict(message.to_string()),
        IntakeError::AlreadySubmitted => PersistenceError::AlreadyCompleted(err.to_string()),
        IntakeError::Repository(_) => PersistenceError::Connectivity(err.to_string()),
        other => PersistenceError::Validation(other.to_string()),
    }
}

#[async_trait]
impl ProgressBackend for InProcessBackend {
    async fn create_draft(&self, fields: &FieldMap) -> Result<DraftId, PersistenceError> {
        self.service
            .register_initial(fields.clone(), self.today)
            .map(|record| record.draft_id)
            .map_err(rejected)
    }

    async fn save_partial(
        &self,
        draft_id: &DraftId,
        step: StepNumber,
        fields: &FieldMap,
    ) -> Result<(), PersistenceError> {
        self.service
            .save_partial(draft_id, step, fields.clone())
            .map(|_| ())
            .map_err(rejected)
    }

    async fn submit_complete(
        &self,
        draft_id: &DraftId,
        fields: &FieldMap,
    ) -> Result<(), PersistenceError> {
        self.service
            .submit(draft_id, fields.clone(), self.today)
            .map(|_| ())
            .map_err(rejected)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
