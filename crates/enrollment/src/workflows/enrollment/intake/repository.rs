use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::documents::UploadedFile;
use super::super::domain::{field, DocumentSlot, DraftId, DraftStatus, FieldMap, StepNumber};

/// Outcome of the quota check made when an application is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Inscrito,
    ListaEspera,
}

impl Placement {
    pub const fn label(self) -> &'static str {
        match self {
            Placement::Inscrito => "inscrito",
            Placement::ListaEspera => "lista_espera",
        }
    }
}

/// What is kept about a received document. Content storage is someone else's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl From<&UploadedFile> for StoredDocument {
    fn from(file: &UploadedFile) -> Self {
        Self {
            file_name: file.file_name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.size_bytes,
        }
    }
}

/// Server-side copy of a draft. Credentials are never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub draft_id: DraftId,
    pub fields: FieldMap,
    pub documents: BTreeMap<DocumentSlot, StoredDocument>,
    pub step_reached: StepNumber,
    pub status: DraftStatus,
    pub placement: Option<Placement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl DraftRecord {
    pub fn new(draft_id: DraftId, fields: FieldMap, now: DateTime<Utc>) -> Self {
        Self {
            draft_id,
            fields,
            documents: BTreeMap::new(),
            step_reached: StepNumber::FIRST,
            status: DraftStatus::InProgress,
            placement: None,
            created_at: now,
            updated_at: now,
            submitted_at: None,
        }
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|value| value.as_text())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn email(&self) -> Option<String> {
        self.text(field::EMAIL).map(str::to_lowercase)
    }

    pub fn document_number(&self) -> Option<&str> {
        self.text(field::NUMERO_DOCUMENTO)
    }

    pub fn municipio(&self) -> Option<&str> {
        self.text(field::MUNICIPIO)
    }

    pub fn is_submitted(&self) -> bool {
        self.status == DraftStatus::Completed
    }

    pub fn progress_view(&self) -> DraftProgressView {
        DraftProgressView {
            user_id: self.draft_id.clone(),
            paso_actual: self.step_reached.get(),
            estado_inscripcion: self.status.label(),
            estado_cuenta: self.placement.map(Placement::label),
            fields: self.fields.clone(),
            documentos: self
                .documents
                .keys()
                .map(|slot| slot.field_name())
                .collect(),
        }
    }
}

/// Read-back payload used to resume a draft.
#[derive(Debug, Clone, Serialize)]
pub struct DraftProgressView {
    pub user_id: DraftId,
    pub paso_actual: u8,
    pub estado_inscripcion: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado_cuenta: Option<&'static str>,
    pub fields: FieldMap,
    pub documentos: Vec<&'static str>,
}

/// Storage for drafts. Implementations keep identity uniqueness and placement decisions
/// inside the same critical section as the write.
pub trait DraftRepository: Send + Sync {
    /// Store a new draft; fails when its email or document number is already taken.
    fn insert(&self, record: DraftRecord) -> Result<DraftRecord, RepositoryError>;
    /// Replace an in-progress draft; the identity check excludes the draft itself.
    fn update(&self, record: DraftRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError>;
    fn find_by_identity(
        &self,
        email: &str,
        document_number: &str,
    ) -> Result<Option<DraftRecord>, RepositoryError>;
    /// Mark the draft submitted, placing it on the waitlist when the municipality already
    /// has `quota` confirmed applications.
    fn complete(&self, record: DraftRecord, quota: u32) -> Result<DraftRecord, RepositoryError>;
    /// In-progress drafts untouched since `cutoff`, oldest first.
    fn stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<DraftRecord>, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("document number already registered")]
    DuplicateDocument,
    #[error("draft already submitted")]
    AlreadySubmitted,
    #[error("draft not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Mutex-guarded map; enough for a single intake process and for tests.
#[derive(Debug, Default)]
pub struct InMemoryDraftRepository {
    records: Mutex<BTreeMap<DraftId, DraftRecord>>,
}

impl InMemoryDraftRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<DraftId, DraftRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("draft store lock poisoned".to_string()))
    }
}

fn check_identity(
    records: &BTreeMap<DraftId, DraftRecord>,
    candidate: &DraftRecord,
) -> Result<(), RepositoryError> {
    let email = candidate.email();
    let document = candidate.document_number();
    for existing in records.values() {
        if existing.draft_id == candidate.draft_id {
            continue;
        }
        if email.is_some() && existing.email() == email {
            return Err(RepositoryError::DuplicateEmail);
        }
        if document.is_some() && existing.document_number() == document {
            return Err(RepositoryError::DuplicateDocument);
        }
    }
    Ok(())
}

impl DraftRepository for InMemoryDraftRepository {
    fn insert(&self, record: DraftRecord) -> Result<DraftRecord, RepositoryError> {
        let mut records = self.lock()?;
        check_identity(&records, &record)?;
        records.insert(record.draft_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: DraftRecord) -> Result<(), RepositoryError> {
        let mut records = self.lock()?;
        match records.get(&record.draft_id) {
            None => return Err(RepositoryError::NotFound),
            Some(existing) if existing.is_submitted() => {
                return Err(RepositoryError::AlreadySubmitted)
            }
            Some(_) => {}
        }
        check_identity(&records, &record)?;
        records.insert(record.draft_id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn find_by_identity(
        &self,
        email: &str,
        document_number: &str,
    ) -> Result<Option<DraftRecord>, RepositoryError> {
        let email = email.trim().to_lowercase();
        let document_number = document_number.trim();
        Ok(self
            .lock()?
            .values()
            .find(|record| {
                record.email().as_deref() == Some(email.as_str())
                    || record.document_number() == Some(document_number)
            })
            .cloned())
    }

    fn complete(
        &self,
        mut record: DraftRecord,
        quota: u32,
    ) -> Result<DraftRecord, RepositoryError> {
        let mut records = self.lock()?;
        match records.get(&record.draft_id) {
            None => return Err(RepositoryError::NotFound),
            Some(existing) if existing.is_submitted() => {
                return Err(RepositoryError::AlreadySubmitted)
            }
            Some(_) => {}
        }
        check_identity(&records, &record)?;

        let confirmed = records
            .values()
            .filter(|other| {
                other.placement == Some(Placement::Inscrito)
                    && other.municipio() == record.municipio()
            })
            .count();
        record.placement = Some(if confirmed < quota as usize {
            Placement::Inscrito
        } else {
            Placement::ListaEspera
        });
        record.status = DraftStatus::Completed;

        records.insert(record.draft_id.clone(), record.clone());
        Ok(record)
    }

    fn stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<DraftRecord>, RepositoryError> {
        let mut stale: Vec<DraftRecord> = self
            .lock()?
            .values()
            .filter(|record| !record.is_submitted() && record.updated_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|record| record.updated_at);
        Ok(stale)
    }
}
