use crate::infra::load_answers;
use chrono::{Local, NaiveDate, Utc};
use clap::Args;
use enrollment::config::AppConfig;
use enrollment::error::AppError;
use enrollment::workflows::enrollment::{
    ApplicationDraft, FieldMap, ValidationEngine, ValidationResult,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct StepsArgs {
    /// JSON file with the applicant's answers so far (flat object of field names)
    #[arg(long)]
    pub(crate) answers: Option<PathBuf>,
    /// Evaluation date for the age window (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

/// What one step asks for given the answers so far, and what it would still reject.
#[derive(Debug, Serialize)]
pub(crate) struct StepRequirementsView {
    pub(crate) step: u8,
    pub(crate) title: &'static str,
    pub(crate) description: &'static str,
    pub(crate) required_fields: Vec<&'static str>,
    pub(crate) required_documents: Vec<&'static str>,
    pub(crate) optional_documents: Vec<&'static str>,
    pub(crate) errors: ValidationResult,
}

#[derive(Debug, Serialize)]
pub(crate) struct RequirementsReport {
    pub(crate) today: NaiveDate,
    pub(crate) tipo_persona: Option<&'static str>,
    pub(crate) first_incomplete_step: Option<u8>,
    pub(crate) steps: Vec<StepRequirementsView>,
}

pub(crate) fn requirements_report(
    engine: &ValidationEngine,
    answers: FieldMap,
    today: NaiveDate,
) -> RequirementsReport {
    let draft = ApplicationDraft::from_fields(answers, Utc::now());
    let (first_invalid, _) = engine.validate_all(&draft, today);

    let steps = engine
        .blueprint()
        .steps()
        .iter()
        .map(|spec| StepRequirementsView {
            step: spec.number.get(),
            title: spec.title,
            description: spec.description,
            required_fields: spec.required_fields_for(&draft),
            required_documents: spec
                .required_documents_for(&draft)
                .into_iter()
                .map(|slot| slot.field_name())
                .collect(),
            optional_documents: spec
                .optional_documents
                .iter()
                .map(|slot| slot.field_name())
                .collect(),
            errors: engine.validate(spec.number, &draft, today),
        })
        .collect();

    RequirementsReport {
        today,
        tipo_persona: draft.person_type().map(|person| person.as_str()),
        first_incomplete_step: first_invalid.map(|step| step.get()),
        steps,
    }
}

pub(crate) fn run_steps(args: StepsArgs) -> Result<(), AppError> {
    let StepsArgs { answers, today } = args;

    let config = AppConfig::load()?;
    let answers = match answers {
        Some(path) => load_answers(&path)?,
        None => FieldMap::new(),
    };
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let engine = ValidationEngine::new(config.eligibility);

    render_requirements(&requirements_report(&engine, answers, today));
    Ok(())
}

fn render_requirements(report: &RequirementsReport) {
    println!("Enrollment requirements as of {}", report.today);
    if let Some(person) = report.tipo_persona {
        println!("Tipo de persona: {person}");
    }
    match report.first_incomplete_step {
        Some(step) => println!("First incomplete step: {step}"),
        None => println!("Every step is complete"),
    }

    for step in &report.steps {
        let marker = if step.errors.is_valid() { "ok" } else { "pending" };
        println!("\nPaso {} · {} [{}]", step.step, step.title, marker);
        println!("  {}", step.description);
        if !step.required_fields.is_empty() {
            println!("  Campos: {}", step.required_fields.join(", "));
        }
        if !step.required_documents.is_empty() {
            println!("  Documentos: {}", step.required_documents.join(", "));
        }
        if !step.optional_documents.is_empty() {
            println!("  Opcionales: {}", step.optional_documents.join(", "));
        }
        for (field, message) in step.errors.iter() {
            println!("    - {field}: {message}");
        }
    }
}
