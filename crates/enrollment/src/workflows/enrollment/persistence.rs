//! Draft persistence: the backend contract, the timeout/dedup wrapper the wizard talks to,
//! and the HTTP implementation against the enrollment endpoints.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{DraftId, FieldMap, StepNumber};
use crate::config::BackendConfig;

pub const REGISTER_INITIAL_PATH: &str = "/api/register-initial";
pub const SAVE_PARTIAL_PATH: &str = "/api/save-partial";
pub const REGISTER_PATH: &str = "/api/register";

/// Error `code` values the backend sends alongside a 409, so the two kinds of conflict stay
/// apart on the wire.
pub const ALREADY_SUBMITTED_CODE: &str = "already_submitted";
pub const DUPLICATE_IDENTITY_CODE: &str = "duplicate_identity";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    /// The backend rejected the data; the message is meant for the applicant.
    #[error("{0}")]
    Validation(String),
    /// Email or document number already registered, or any other conflict that is not a
    /// finalized draft.
    #[error("{0}")]
    Conflict(String),
    /// The draft was already submitted.
    #[error("{0}")]
    AlreadyCompleted(String),
    #[error("{0}")]
    Connectivity(String),
    #[error("Tiempo de espera agotado tras {}s", .0.as_secs())]
    Timeout(Duration),
}

impl PersistenceError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PersistenceError::Connectivity(_) | PersistenceError::Timeout(_)
        )
    }
}

/// The three calls that move a draft through its lifecycle.
#[async_trait]
pub trait ProgressBackend: Send + Sync {
    async fn create_draft(&self, fields: &FieldMap) -> Result<DraftId, PersistenceError>;

    async fn save_partial(
        &self,
        draft_id: &DraftId,
        step: StepNumber,
        fields: &FieldMap,
    ) -> Result<(), PersistenceError>;

    async fn submit_complete(
        &self,
        draft_id: &DraftId,
        fields: &FieldMap,
    ) -> Result<(), PersistenceError>;
}

#[async_trait]
impl<B> ProgressBackend for Arc<B>
where
    B: ProgressBackend + ?Sized,
{
    async fn create_draft(&self, fields: &FieldMap) -> Result<DraftId, PersistenceError> {
        (**self).create_draft(fields).await
    }

    async fn save_partial(
        &self,
        draft_id: &DraftId,
        step: StepNumber,
        fields: &FieldMap,
    ) -> Result<(), PersistenceError> {
        (**self).save_partial(draft_id, step, fields).await
    }

    async fn submit_complete(
        &self,
        draft_id: &DraftId,
        fields: &FieldMap,
    ) -> Result<(), PersistenceError> {
        (**self).submit_complete(draft_id, fields).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAck {
    Saved,
    /// Same draft, step and fields as the last successful save; nothing was sent.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitAck {
    Submitted,
    /// A retry reached a draft the backend had already finalized.
    AlreadyCompleted,
}

/// Wraps a backend with a per-call timeout and skips re-sending identical partial saves.
/// Calls take `&mut self`, so a single client never has two requests in flight.
#[derive(Debug)]
pub struct ProgressClient<B> {
    backend: B,
    timeout: Duration,
    last_saved: Option<(DraftId, StepNumber, FieldMap)>,
}

impl<B: ProgressBackend> ProgressClient<B> {
    pub fn new(backend: B, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            last_saved: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn create_draft(&mut self, fields: &FieldMap) -> Result<DraftId, PersistenceError> {
        let draft_id = bounded(self.timeout, self.backend.create_draft(fields)).await?;
        tracing::info!(draft_id = %draft_id, "draft created");
        Ok(draft_id)
    }

    pub async fn save_partial(
        &mut self,
        draft_id: &DraftId,
        step: StepNumber,
        fields: &FieldMap,
    ) -> Result<SaveAck, PersistenceError> {
        let unchanged = self
            .last_saved
            .as_ref()
            .is_some_and(|(id, saved_step, saved)| {
                id == draft_id && *saved_step == step && saved == fields
            });
        if unchanged {
            tracing::debug!(
                draft_id = %draft_id,
                step = step.get(),
                "partial save skipped; no changes"
            );
            return Ok(SaveAck::Unchanged);
        }

        bounded(
            self.timeout,
            self.backend.save_partial(draft_id, step, fields),
        )
        .await?;
        self.last_saved = Some((draft_id.clone(), step, fields.clone()));
        tracing::info!(draft_id = %draft_id, step = step.get(), "partial progress saved");
        Ok(SaveAck::Saved)
    }

    pub async fn submit_complete(
        &mut self,
        draft_id: &DraftId,
        fields: &FieldMap,
    ) -> Result<SubmitAck, PersistenceError> {
        match bounded(self.timeout, self.backend.submit_complete(draft_id, fields)).await {
            Ok(()) => {
                tracing::info!(draft_id = %draft_id, "application submitted");
                Ok(SubmitAck::Submitted)
            }
            Err(PersistenceError::AlreadyCompleted(message)) => {
                tracing::info!(
                    draft_id = %draft_id,
                    %message,
                    "submission retry hit a completed draft"
                );
                Ok(SubmitAck::AlreadyCompleted)
            }
            Err(err) => Err(err),
        }
    }
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, PersistenceError>>,
) -> Result<T, PersistenceError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_secs = limit.as_secs_f64(), "backend call timed out");
            Err(PersistenceError::Timeout(limit))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    CreateDraft,
    SavePartial,
    SubmitComplete,
}

impl Operation {
    const fn path(self) -> &'static str {
        match self {
            Operation::CreateDraft => REGISTER_INITIAL_PATH,
            Operation::SavePartial => SAVE_PARTIAL_PATH,
            Operation::SubmitComplete => REGISTER_PATH,
        }
    }

    const fn fallback_message(self) -> &'static str {
        match self {
            Operation::CreateDraft => "Error al crear usuario",
            Operation::SavePartial => "Error al guardar progreso",
            Operation::SubmitComplete => "Error al completar inscripción",
        }
    }

    const fn connectivity_message(self) -> &'static str {
        match self {
            Operation::SavePartial => "Error de conexión al guardar progreso",
            Operation::CreateDraft | Operation::SubmitComplete => "Error de conexión",
        }
    }
}

#[derive(Debug, Serialize)]
struct SavePartialRequest<'a> {
    user_id: &'a str,
    paso: u8,
    #[serde(flatten)]
    fields: &'a FieldMap,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    fields: &'a FieldMap,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    user_id: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

/// `ProgressBackend` over the enrollment HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpProgressBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpProgressBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, PersistenceError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| PersistenceError::Connectivity(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        operation: Operation,
        body: &B,
    ) -> Result<reqwest::Response, PersistenceError> {
        let url = format!("{}{}", self.base_url, operation.path());
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| self.transport_error(operation, err))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let (message, code) = match response.json::<ErrorResponse>().await {
            Ok(body) => (body.error, body.code),
            Err(_) => (operation.fallback_message().to_string(), None),
        };
        tracing::warn!(
            path = operation.path(),
            status = status.as_u16(),
            code = code.as_deref(),
            %message,
            "backend rejected request"
        );
        Err(classify(operation, status, code.as_deref(), message))
    }

    fn transport_error(&self, operation: Operation, err: reqwest::Error) -> PersistenceError {
        tracing::warn!(path = operation.path(), error = %err, "backend unreachable");
        if err.is_timeout() {
            PersistenceError::Timeout(self.timeout)
        } else {
            PersistenceError::Connectivity(operation.connectivity_message().to_string())
        }
    }
}

/// Only an explicit `already_submitted` code marks a draft as finalized; any other 409 is a
/// rejection the applicant has to resolve.
fn classify(
    operation: Operation,
    status: StatusCode,
    code: Option<&str>,
    message: String,
) -> PersistenceError {
    match status {
        StatusCode::CONFLICT
            if operation != Operation::CreateDraft && code == Some(ALREADY_SUBMITTED_CODE) =>
        {
            PersistenceError::AlreadyCompleted(message)
        }
        StatusCode::CONFLICT => PersistenceError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            PersistenceError::Validation(message)
        }
        _ => PersistenceError::Connectivity(message),
    }
}

#[async_trait]
impl ProgressBackend for HttpProgressBackend {
    async fn create_draft(&self, fields: &FieldMap) -> Result<DraftId, PersistenceError> {
        let response = self.post(Operation::CreateDraft, fields).await?;
        let created: CreatedResponse = response.json().await.map_err(|err| {
            PersistenceError::Connectivity(format!("respuesta inválida del servidor: {err}"))
        })?;

        match created.user_id {
            Value::String(id) if !id.is_empty() => Ok(DraftId(id)),
            Value::Number(id) => Ok(DraftId(id.to_string())),
            other => Err(PersistenceError::Connectivity(format!(
                "respuesta inválida del servidor: user_id {other}"
            ))),
        }
    }

    async fn save_partial(
        &self,
        draft_id: &DraftId,
        step: StepNumber,
        fields: &FieldMap,
    ) -> Result<(), PersistenceError> {
        let body = SavePartialRequest {
            user_id: &draft_id.0,
            paso: step.get(),
            fields,
        };
        self.post(Operation::SavePartial, &body).await.map(|_| ())
    }

    async fn submit_complete(
        &self,
        draft_id: &DraftId,
        fields: &FieldMap,
    ) -> Result<(), PersistenceError> {
        let body = SubmitRequest {
            user_id: &draft_id.0,
            fields,
        };
        self.post(Operation::SubmitComplete, &body).await.map(|_| ())
    }
}
