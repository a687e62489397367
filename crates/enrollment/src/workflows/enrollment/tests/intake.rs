use super::common::*;
use chrono::{Duration, Utc};

use crate::workflows::enrollment::documents::{DocumentEncoder, SlotError};
use crate::workflows::enrollment::domain::{
    field, DocumentSlot, DraftId, DraftStatus, FieldMap, FieldValue,
};
use crate::workflows::enrollment::intake::service::{DUPLICATE_DOCUMENT, DUPLICATE_EMAIL};
use crate::workflows::enrollment::intake::{DraftRecord, IntakeError, Placement};

fn wire(answers: Vec<(&'static str, FieldValue)>) -> FieldMap {
    let mut fields = fields(answers);
    fields.remove(field::CONFIRM_PASSWORD);
    fields
}

fn register(service: &MemoryIntake, email: &str, document: &str) -> DraftRecord {
    service
        .register_initial(wire(general_answers(email, document)), today())
        .expect("registration accepted")
}

async fn submission(email: &str, document: &str) -> FieldMap {
    let mut fields = wire(general_answers(email, document));
    fields.extend(wire(later_answers()));
    let encoded = DocumentEncoder::new()
        .encode_documents(&complete_draft())
        .await
        .expect("documents encode");
    encoded.into_fields(&mut fields);
    fields
}

#[test]
fn registration_hands_out_an_id_and_keeps_no_credentials() {
    let (service, _) = intake_service();
    let record = register(&service, "ana.perez@correo.co", "1085123456");

    assert!(record.draft_id.0.starts_with("draft-"));
    assert_eq!(record.status, DraftStatus::InProgress);
    assert_eq!(record.step_reached, step(1));
    assert!(!record.fields.contains_key(field::PASSWORD));
    assert_eq!(
        record.fields.get(field::CONVOCATORIA),
        Some(&FieldValue::Text("2025".to_string()))
    );
}

#[test]
fn registration_is_validated_without_the_confirmation_field() {
    let (service, _) = intake_service();
    let mut fields = wire(general_answers("ana.perez@correo.co", "1085123456"));
    fields.insert(
        field::FECHA_NACIMIENTO.to_string(),
        FieldValue::from("1980-01-01"),
    );

    let err = service
        .register_initial(fields, today())
        .expect_err("applicant too old");

    let IntakeError::Validation(errors) = err else {
        panic!("expected validation failure, got {err:?}");
    };
    assert_eq!(errors.len(), 1);
    assert!(errors.contains(field::FECHA_NACIMIENTO));
}

#[test]
fn identities_are_unique_across_drafts() {
    let (service, _) = intake_service();
    register(&service, "ana.perez@correo.co", "1085123456");

    let same_email = service
        .register_initial(
            wire(general_answers("ANA.PEREZ@correo.co", "1085999999")),
            today(),
        )
        .expect_err("email taken");
    assert!(matches!(same_email, IntakeError::DuplicateIdentity(DUPLICATE_EMAIL)));

    let same_document = service
        .register_initial(
            wire(general_answers("otra@correo.co", "1085123456")),
            today(),
        )
        .expect_err("document taken");
    assert!(matches!(
        same_document,
        IntakeError::DuplicateIdentity(DUPLICATE_DOCUMENT)
    ));
}

#[test]
fn partial_saves_are_idempotent_and_never_move_backwards() {
    let (service, _) = intake_service();
    let record = register(&service, "ana.perez@correo.co", "1085123456");
    let answers = wire(vec![(field::EMPRENDIMIENTO_FORMALIZADO, true.into())]);

    let first = service
        .save_partial(&record.draft_id, step(6), answers.clone())
        .expect("save accepted");
    assert!(first.changed);
    assert_eq!(first.record.step_reached, step(6));

    let replay = service
        .save_partial(&record.draft_id, step(6), answers)
        .expect("replay accepted");
    assert!(!replay.changed);

    let earlier = service
        .save_partial(&record.draft_id, step(3), FieldMap::new())
        .expect("earlier step accepted");
    assert_eq!(earlier.record.step_reached, step(6));

    let stored = service.progress(&record.draft_id).expect("draft exists");
    assert_eq!(stored.step_reached, step(6));
    assert_eq!(
        stored.fields.get(field::EMPRENDIMIENTO_FORMALIZADO),
        Some(&FieldValue::Flag(true))
    );
}

#[test]
fn unknown_drafts_are_not_found() {
    let (service, _) = intake_service();
    let err = service
        .save_partial(&DraftId("draft-999999".to_string()), step(2), FieldMap::new())
        .expect_err("no such draft");
    assert!(matches!(err, IntakeError::NotFound));
}

#[tokio::test]
async fn submissions_missing_documents_report_the_first_incomplete_step() {
    let (service, _) = intake_service();
    let record = register(&service, "ana.perez@correo.co", "1085123456");
    let mut fields = wire(general_answers("ana.perez@correo.co", "1085123456"));
    fields.extend(wire(later_answers()));

    let err = service
        .submit(&record.draft_id, fields, today())
        .expect_err("documents missing");

    let IntakeError::Incomplete { step: first, errors } = err else {
        panic!("expected incomplete submission, got {err:?}");
    };
    assert_eq!(first, step(2));
    assert!(errors.contains(DocumentSlot::DocTerminos.field_name()));
    assert!(errors.contains(DocumentSlot::Redam.field_name()));
}

#[tokio::test]
async fn complete_submissions_are_placed_and_locked() {
    let (service, _) = intake_service();
    let record = register(&service, "ana.perez@correo.co", "1085123456");

    let outcome = service
        .submit(
            &record.draft_id,
            submission("ana.perez@correo.co", "1085123456").await,
            today(),
        )
        .expect("submission accepted");

    assert_eq!(outcome.placement, Placement::Inscrito);
    assert_eq!(outcome.record.status, DraftStatus::Completed);
    assert_eq!(outcome.record.step_reached, step(8));
    assert_eq!(outcome.record.documents.len(), 14);
    assert!(!outcome.record.fields.contains_key(field::PASSWORD));
    assert!(!outcome
        .record
        .fields
        .contains_key(DocumentSlot::Rut.field_name()));

    let view = outcome.record.progress_view();
    assert_eq!(view.estado_inscripcion, "enviada");
    assert_eq!(view.estado_cuenta, Some("inscrito"));

    let err = service
        .save_partial(&record.draft_id, step(8), FieldMap::new())
        .expect_err("submitted drafts are read-only");
    assert!(matches!(err, IntakeError::AlreadySubmitted));

    let err = service
        .submit(
            &record.draft_id,
            submission("ana.perez@correo.co", "1085123456").await,
            today(),
        )
        .expect_err("second submission");
    assert!(matches!(err, IntakeError::AlreadySubmitted));
}

#[tokio::test]
async fn municipalities_over_quota_go_to_the_waitlist() {
    let (service, _) = intake_service();
    let mut placements = Vec::new();

    for index in 0..4 {
        let email = format!("aplicante{index}@correo.co");
        let document = format!("108500000{index}");
        let mut fields = wire(general_answers(&email, &document));
        fields.insert(field::MUNICIPIO.to_string(), "Providencia".into());
        let record = service
            .register_initial(fields, today())
            .expect("registration accepted");

        let mut submitted = submission(&email, &document).await;
        submitted.insert(field::MUNICIPIO.to_string(), "Providencia".into());
        let outcome = service
            .submit(&record.draft_id, submitted, today())
            .expect("submission accepted");
        placements.push(outcome.placement);
    }

    assert_eq!(
        placements,
        vec![
            Placement::Inscrito,
            Placement::Inscrito,
            Placement::Inscrito,
            Placement::ListaEspera
        ]
    );
}

#[tokio::test]
async fn age_is_checked_again_on_the_submission_date() {
    let (service, _) = intake_service();
    let mut answers = wire(general_answers("ana.perez@correo.co", "1085123456"));
    answers.insert(field::FECHA_NACIMIENTO.to_string(), "1992-06-02".into());
    let record = service
        .register_initial(answers, today())
        .expect("32 on the registration date");

    let mut fields = submission("ana.perez@correo.co", "1085123456").await;
    fields.insert(field::FECHA_NACIMIENTO.to_string(), "1992-06-02".into());
    let err = service
        .submit(&record.draft_id, fields, today() + Duration::days(1))
        .expect_err("33 on the submission date");

    let IntakeError::Incomplete { step: first, errors } = err else {
        panic!("expected incomplete submission, got {err:?}");
    };
    assert_eq!(first, step(1));
    assert!(errors.contains(field::FECHA_NACIMIENTO));
}

#[tokio::test]
async fn malformed_payloads_are_rejected() {
    let (service, _) = intake_service();
    let record = register(&service, "ana.perez@correo.co", "1085123456");
    let mut fields = submission("ana.perez@correo.co", "1085123456").await;
    fields.insert(DocumentSlot::Rut.field_name().to_string(), "%%%".into());

    let err = service
        .submit(&record.draft_id, fields, today())
        .expect_err("not base64");

    assert!(matches!(
        err,
        IntakeError::Document(SlotError::InvalidEncoding { field: "rut_pdf" })
    ));
}

#[tokio::test]
async fn stale_drafts_exclude_submitted_applications() {
    let (service, _) = intake_service();
    let abandoned = register(&service, "ana.perez@correo.co", "1085123456");
    let finished = register(&service, "luis.gomez@correo.co", "1085654321");
    service
        .submit(
            &finished.draft_id,
            submission("luis.gomez@correo.co", "1085654321").await,
            today(),
        )
        .expect("submission accepted");

    let stale = service
        .stale_drafts(Utc::now() + Duration::minutes(1))
        .expect("repository available");
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].draft_id, abandoned.draft_id);

    let none = service
        .stale_drafts(Utc::now() - Duration::minutes(1))
        .expect("repository available");
    assert!(none.is_empty());
}
