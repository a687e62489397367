use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDate};
use serde_json::{json, Map, Value};

use super::super::domain::{fields_from_json, DraftId, FieldMap, StepNumber};
use super::repository::DraftRepository;
use super::service::{EnrollmentIntakeService, IntakeError};
use crate::workflows::enrollment::persistence::{
    ALREADY_SUBMITTED_CODE, DUPLICATE_IDENTITY_CODE, REGISTER_INITIAL_PATH, REGISTER_PATH,
    SAVE_PARTIAL_PATH,
};

/// Router exposing the enrollment endpoints the wizard persists through.
pub fn enrollment_router<R>(service: Arc<EnrollmentIntakeService<R>>) -> Router
where
    R: DraftRepository + 'static,
{
    Router::new()
        .route(REGISTER_INITIAL_PATH, post(register_initial_handler::<R>))
        .route(SAVE_PARTIAL_PATH, post(save_partial_handler::<R>))
        .route(REGISTER_PATH, post(register_handler::<R>))
        .route("/api/get-partial/:user_id", get(get_partial_handler::<R>))
        .with_state(service)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) async fn register_initial_handler<R>(
    State(service): State<Arc<EnrollmentIntakeService<R>>>,
    axum::Json(body): axum::Json<Map<String, Value>>,
) -> Response
where
    R: DraftRepository + 'static,
{
    let fields = into_fields(body);
    match service.register_initial(fields, today()) {
        Ok(record) => {
            let payload = json!({
                "message": "Usuario creado. Puede continuar completando el formulario.",
                "user_id": record.draft_id,
                "estado_inscripcion": record.status.label(),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn save_partial_handler<R>(
    State(service): State<Arc<EnrollmentIntakeService<R>>>,
    axum::Json(mut body): axum::Json<Map<String, Value>>,
) -> Response
where
    R: DraftRepository + 'static,
{
    let draft_id = match take_draft_id(&mut body) {
        Some(id) => id,
        None => return bad_request("user_id es obligatorio"),
    };
    let step = match body.remove("paso").as_ref().and_then(step_from_value) {
        Some(step) => step,
        None => return bad_request("paso debe ser un número entre 1 y 8"),
    };

    match service.save_partial(&draft_id, step, into_fields(body)) {
        Ok(outcome) => {
            let payload = json!({
                "message": "Progreso guardado",
                "paso_actual": outcome.record.step_reached.get(),
                "estado_inscripcion": outcome.record.status.label(),
                "changed": outcome.changed,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn register_handler<R>(
    State(service): State<Arc<EnrollmentIntakeService<R>>>,
    axum::Json(mut body): axum::Json<Map<String, Value>>,
) -> Response
where
    R: DraftRepository + 'static,
{
    let draft_id = match take_draft_id(&mut body) {
        Some(id) => id,
        None => return bad_request("user_id es obligatorio"),
    };

    match service.submit(&draft_id, into_fields(body), today()) {
        Ok(outcome) => {
            let payload = json!({
                "message": "¡Inscripción completada exitosamente!",
                "user_id": outcome.record.draft_id,
                "estado_inscripcion": outcome.record.status.label(),
                "estado_cuenta": outcome.placement.label(),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_partial_handler<R>(
    State(service): State<Arc<EnrollmentIntakeService<R>>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: DraftRepository + 'static,
{
    match service.progress(&DraftId(user_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.progress_view())).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: IntakeError) -> Response {
    let status = match &err {
        IntakeError::Validation(_) | IntakeError::Incomplete { .. } | IntakeError::Document(_) => {
            StatusCode::BAD_REQUEST
        }
        IntakeError::DuplicateIdentity(_) | IntakeError::AlreadySubmitted => StatusCode::CONFLICT,
        IntakeError::NotFound => StatusCode::NOT_FOUND,
        IntakeError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = match &err {
        IntakeError::Validation(errors) | IntakeError::Incomplete { errors, .. } => json!({
            "error": err.to_string(),
            "errors": errors,
        }),
        IntakeError::DuplicateIdentity(_) => json!({
            "error": err.to_string(),
            "code": DUPLICATE_IDENTITY_CODE,
        }),
        IntakeError::AlreadySubmitted => json!({
            "error": err.to_string(),
            "code": ALREADY_SUBMITTED_CODE,
        }),
        _ => json!({
            "error": err.to_string(),
        }),
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "intake request failed");
    }
    (status, axum::Json(payload)).into_response()
}

fn bad_request(message: &str) -> Response {
    let payload = json!({
        "error": message,
    });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

/// Draft ids arrive as strings or, from older clients, as bare numbers.
fn take_draft_id(body: &mut Map<String, Value>) -> Option<DraftId> {
    match body.remove("user_id")? {
        Value::String(id) if !id.trim().is_empty() => Some(DraftId(id.trim().to_string())),
        Value::Number(id) => Some(DraftId(id.to_string())),
        _ => None,
    }
}

fn step_from_value(value: &Value) -> Option<StepNumber> {
    let raw = match value {
        Value::Number(number) => number.as_u64()?,
        Value::String(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    StepNumber::new(u8::try_from(raw).ok()?).ok()
}

fn into_fields(body: Map<String, Value>) -> FieldMap {
    fields_from_json(body)
}
