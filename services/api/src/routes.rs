use crate::infra::{deserialize_optional_date, AppState};
use crate::requirements::{requirements_report, RequirementsReport};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use enrollment::workflows::enrollment::{
    enrollment_router, fields_from_json, DraftRepository, EnrollmentIntakeService,
    ValidationEngine,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct RequirementsRequest {
    #[serde(default)]
    pub(crate) answers: Map<String, Value>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn with_enrollment_routes<R>(service: Arc<EnrollmentIntakeService<R>>) -> axum::Router
where
    R: DraftRepository + 'static,
{
    enrollment_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/enrollment/requirements",
            axum::routing::post(requirements_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn requirements_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<RequirementsRequest>,
) -> Json<RequirementsReport> {
    let RequirementsRequest { answers, today } = payload;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let engine = ValidationEngine::new(state.eligibility.clone());
    Json(requirements_report(&engine, fields_from_json(answers), today))
}
