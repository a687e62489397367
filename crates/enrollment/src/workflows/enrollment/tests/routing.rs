use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::config::EligibilityConfig;
use crate::workflows::enrollment::domain::field;
use crate::workflows::enrollment::intake::enrollment_router;
use crate::workflows::enrollment::persistence::{
    ProgressClient, ALREADY_SUBMITTED_CODE, DUPLICATE_IDENTITY_CODE, REGISTER_INITIAL_PATH,
    REGISTER_PATH, SAVE_PARTIAL_PATH,
};
use crate::workflows::enrollment::wizard::{EnrollmentWizard, Transition};

fn router() -> Router {
    let (service, _) = intake_service();
    enrollment_router(service)
}

async fn post(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("serializable")))
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    let status = response.status();
    (status, read_json_body(response).await)
}

async fn get(router: &Router, path: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::get(path)
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    let status = response.status();
    (status, read_json_body(response).await)
}

fn first_step_map(email: &str, document: &str) -> Map<String, Value> {
    let mut body = json_object(general_answers(email, document));
    body.remove(field::CONFIRM_PASSWORD);
    body
}

fn first_step_body(email: &str, document: &str) -> Value {
    Value::Object(first_step_map(email, document))
}

async fn registered(router: &Router) -> String {
    let (status, body) = post(
        router,
        REGISTER_INITIAL_PATH,
        first_step_body("ana.perez@correo.co", "1085123456"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["user_id"]
        .as_str()
        .expect("string draft id")
        .to_string()
}

#[tokio::test]
async fn register_initial_returns_created_with_a_draft_id() {
    let router = router();
    let (status, body) = post(
        &router,
        REGISTER_INITIAL_PATH,
        first_step_body("ana.perez@correo.co", "1085123456"),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["user_id"].as_str().is_some());
    assert_eq!(body["estado_inscripcion"], "en_progreso");
}

#[tokio::test]
async fn duplicate_registrations_conflict() {
    let router = router();
    registered(&router).await;

    let (status, body) = post(
        &router,
        REGISTER_INITIAL_PATH,
        first_step_body("ana.perez@correo.co", "1085000000"),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "El correo electrónico ya está registrado");
    assert_eq!(body["code"], DUPLICATE_IDENTITY_CODE);
}

#[tokio::test]
async fn invalid_registrations_return_field_errors() {
    let router = router();
    let (status, body) = post(&router, REGISTER_INITIAL_PATH, json!({ "nombre": "Ana" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"].get(field::EMAIL).is_some());
    assert!(body["errors"].get(field::CONFIRM_PASSWORD).is_none());
}

#[tokio::test]
async fn save_partial_requires_a_draft_and_a_step() {
    let router = router();
    let draft_id = registered(&router).await;

    let (status, _) = post(&router, SAVE_PARTIAL_PATH, json!({ "paso": 2 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &router,
        SAVE_PARTIAL_PATH,
        json!({ "user_id": draft_id, "paso": 9 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(
        &router,
        SAVE_PARTIAL_PATH,
        json!({ "user_id": "draft-999999", "paso": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Usuario no encontrado");
}

#[tokio::test]
async fn saved_progress_can_be_read_back() {
    let router = router();
    let draft_id = registered(&router).await;

    let (status, body) = post(
        &router,
        SAVE_PARTIAL_PATH,
        json!({
            "user_id": draft_id,
            "paso": "6",
            "emprendimiento_formalizado": false,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paso_actual"], 6);
    assert_eq!(body["changed"], true);

    let (status, body) = get(&router, &format!("/api/get-partial/{draft_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paso_actual"], 6);
    assert_eq!(body["fields"]["emprendimiento_formalizado"], false);
    assert!(body["fields"].get(field::PASSWORD).is_none());
    assert!(body.get("estado_cuenta").is_none());
}

#[tokio::test]
async fn incomplete_submissions_are_rejected_with_errors() {
    let router = router();
    let draft_id = registered(&router).await;

    let mut body = first_step_map("ana.perez@correo.co", "1085123456");
    body.insert("user_id".to_string(), Value::String(draft_id));
    let (status, payload) = post(&router, REGISTER_PATH, Value::Object(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(payload["errors"].get("doc_terminos_pdf").is_some());
}

#[tokio::test]
async fn wizard_completes_against_the_intake_service() {
    let (service, _) = intake_service();
    let backend = Arc::new(InProcessBackend {
        service: Arc::clone(&service),
        today: today(),
    });
    let client = ProgressClient::new(backend, Duration::from_secs(2));
    let mut wizard = EnrollmentWizard::new(client, EligibilityConfig::default());
    fill(&mut wizard, general_answers("ana.perez@correo.co", "1085123456"));
    fill(&mut wizard, later_answers());
    attach_all(&mut wizard);

    let mut transition = wizard.next(today()).await.expect("step accepted");
    while let Transition::Advanced(_) = transition {
        transition = wizard.next(today()).await.expect("step accepted");
    }

    assert_eq!(
        transition,
        Transition::Submitted {
            already_completed: false
        }
    );
    let draft_id = wizard.draft().draft_id().cloned().expect("draft id assigned");
    let record = service.progress(&draft_id).expect("draft stored");
    assert!(record.is_submitted());
    assert_eq!(record.documents.len(), 14);

    let router = enrollment_router(service);
    let (status, body) = get(&router, &format!("/api/get-partial/{draft_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["estado_inscripcion"], "enviada");
    assert_eq!(body["estado_cuenta"], "inscrito");

    let (status, body) = post(
        &router,
        SAVE_PARTIAL_PATH,
        json!({ "user_id": draft_id.0, "paso": 3, "nombre": "Otra" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], ALREADY_SUBMITTED_CODE);
}
