use crate::infra::load_answers;
use chrono::{Local, NaiveDate};
use clap::Args;
use enrollment::config::AppConfig;
use enrollment::error::AppError;
use enrollment::telemetry;
use enrollment::workflows::enrollment::{
    DocumentSlot, EnrollmentWizard, HttpProgressBackend, ProgressBackend, ProgressClient,
    StepNumber, Transition, UploadedFile, ValidationResult, WizardError,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub(crate) struct EnrollArgs {
    /// JSON file with the applicant's answers (flat object of field names)
    #[arg(long)]
    pub(crate) answers: PathBuf,
    /// Directory of documents named after their slot, e.g. `rut_pdf.pdf` or
    /// `doc_plan_negocio_xls.xlsx`
    #[arg(long)]
    pub(crate) documents: Option<PathBuf>,
    /// Backend base URL (defaults to ENROLLMENT_BACKEND_URL)
    #[arg(long)]
    pub(crate) backend: Option<String>,
    /// Evaluation date for the age window (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn run_enroll(args: EnrollArgs) -> Result<(), AppError> {
    let EnrollArgs {
        answers,
        documents,
        backend,
        today,
    } = args;

    let mut config = AppConfig::load()?;
    if let Some(base_url) = backend {
        config.backend.base_url = base_url;
    }
    telemetry::init(&config.telemetry)?;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let backend = HttpProgressBackend::new(&config.backend)?;
    let client = ProgressClient::new(backend, config.backend.request_timeout);
    let mut wizard = EnrollmentWizard::new(client, config.eligibility.clone());

    for (name, value) in load_answers(&answers)? {
        wizard.set_field(&name, value)?;
    }
    if let Some(dir) = documents {
        attach_documents(&mut wizard, &dir).await?;
    }

    println!("Enrollment wizard ({})", config.backend.base_url);
    drive(&mut wizard, today).await
}

/// Attach every slot that has a matching file in `dir`. Slots without one are left empty
/// and surface later as validation errors on their step.
async fn attach_documents<B: ProgressBackend>(
    wizard: &mut EnrollmentWizard<B>,
    dir: &Path,
) -> Result<(), AppError> {
    for slot in DocumentSlot::ALL {
        let Some(path) = find_document(dir, slot) else {
            continue;
        };
        let file = UploadedFile::from_path(&path).await.map_err(|err| {
            let mut rejection = ValidationResult::new();
            rejection.set(slot.field_name(), err.to_string());
            WizardError::ClientValidation(rejection)
        })?;
        info!(slot = %slot, path = %path.display(), "document attached");
        wizard.attach_document(slot, file)?;
    }
    Ok(())
}

/// First file named `<field_name>.<ext>` whose extension maps to a type the slot accepts.
pub(crate) fn find_document(dir: &Path, slot: DocumentSlot) -> Option<PathBuf> {
    slot.accepted_types()
        .iter()
        .filter_map(|mime| mime_guess::get_mime_extensions_str(mime))
        .flat_map(|extensions| extensions.iter())
        .map(|extension| dir.join(format!("{}.{}", slot.field_name(), extension)))
        .find(|candidate| candidate.is_file())
}

async fn drive<B: ProgressBackend>(
    wizard: &mut EnrollmentWizard<B>,
    today: NaiveDate,
) -> Result<(), AppError> {
    loop {
        let step = wizard.state().visible_step();
        match wizard.next(today).await {
            Ok(Transition::Advanced(next)) => {
                println!("  Paso {} guardado, continúa en el paso {}", step_label(step), next);
            }
            Ok(Transition::Submitted { already_completed }) => {
                if already_completed {
                    println!("  La inscripción ya había sido recibida por el servidor");
                } else {
                    println!("  ¡Inscripción completada exitosamente!");
                }
                if let Some(draft_id) = wizard.draft().draft_id() {
                    println!("  Identificador: {draft_id}");
                }
                return Ok(());
            }
            Ok(Transition::Retreated(_)) | Ok(Transition::Stayed(_)) => {}
            Err(WizardError::ClientValidation(errors)) => {
                println!("  Paso {} tiene errores:", step_label(step));
                for (field, message) in errors.iter() {
                    println!("    - {field}: {message}");
                }
                return Err(WizardError::ClientValidation(errors).into());
            }
            Err(err) => {
                warn!(error = %err, "enrollment stopped");
                return Err(err.into());
            }
        }
    }
}

fn step_label(step: Option<StepNumber>) -> String {
    step.map(|step| step.to_string())
        .unwrap_or_else(|| "final".to_string())
}
