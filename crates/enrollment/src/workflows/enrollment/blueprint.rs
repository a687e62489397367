use super::domain::{field, ApplicationDraft, DocumentSlot, StepNumber};
use super::validation::{rules, StepRule};

/// Requirements of one wizard step, computed from the answers accumulated so far.
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub number: StepNumber,
    pub title: &'static str,
    pub description: &'static str,
    pub required_fields: fn(&ApplicationDraft) -> Vec<&'static str>,
    pub optional_fields: &'static [&'static str],
    pub required_documents: fn(&ApplicationDraft) -> Vec<DocumentSlot>,
    pub optional_documents: &'static [DocumentSlot],
    pub rules: StepRule,
}

impl StepSpec {
    pub fn required_fields_for(&self, draft: &ApplicationDraft) -> Vec<&'static str> {
        (self.required_fields)(draft)
    }

    pub fn required_documents_for(&self, draft: &ApplicationDraft) -> Vec<DocumentSlot> {
        (self.required_documents)(draft)
    }
}

#[derive(Debug)]
pub struct EnrollmentBlueprint {
    steps: [StepSpec; StepNumber::COUNT as usize],
}

impl EnrollmentBlueprint {
    pub fn standard() -> Self {
        Self {
            steps: standard_steps(),
        }
    }

    pub fn step(&self, number: StepNumber) -> &StepSpec {
        &self.steps[usize::from(number.get() - 1)]
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }
}

impl Default for EnrollmentBlueprint {
    fn default() -> Self {
        Self::standard()
    }
}

fn step(value: u8) -> StepNumber {
    StepNumber::new(value).unwrap_or(StepNumber::FIRST)
}

fn standard_steps() -> [StepSpec; StepNumber::COUNT as usize] {
    [
        StepSpec {
            number: step(1),
            title: "Datos Generales",
            description: "Información personal y del emprendimiento",
            required_fields: general_fields,
            optional_fields: &[],
            required_documents: no_documents,
            optional_documents: &[],
            rules: rules::general_data,
        },
        StepSpec {
            number: step(2),
            title: "Documentos Obligatorios",
            description: "TDR, Uso de imagen, Plan de negocio, Vecindad",
            required_fields: no_fields,
            optional_fields: &[field::VIDEO_URL],
            required_documents: mandatory_documents,
            optional_documents: &[],
            rules: rules::none,
        },
        StepSpec {
            number: step(3),
            title: "Documentos por Tipo",
            description: "Según persona natural o jurídica",
            required_fields: no_fields,
            optional_fields: &[],
            required_documents: person_type_documents,
            optional_documents: &[],
            rules: rules::none,
        },
        StepSpec {
            number: step(4),
            title: "Documentos Diferenciales",
            description: "RUV, SISBEN, Grupo étnico (opcionales)",
            required_fields: no_fields,
            optional_fields: &[],
            required_documents: no_documents,
            optional_documents: &[
                DocumentSlot::Ruv,
                DocumentSlot::Sisben,
                DocumentSlot::GrupoEtnico,
                DocumentSlot::Arn,
                DocumentSlot::Discapacidad,
            ],
            rules: rules::none,
        },
        StepSpec {
            number: step(5),
            title: "Documentos de Control",
            description: "Antecedentes y certificados obligatorios",
            required_fields: no_fields,
            optional_fields: &[],
            required_documents: control_documents,
            optional_documents: &[],
            rules: rules::none,
        },
        StepSpec {
            number: step(6),
            title: "Funcionamiento",
            description: "Certificación de funcionamiento del emprendimiento",
            required_fields: operation_fields,
            optional_fields: &[],
            required_documents: operation_documents,
            optional_documents: &[],
            rules: rules::operation,
        },
        StepSpec {
            number: step(7),
            title: "Financiación",
            description: "Financiación de otras fuentes estatales",
            required_fields: financing_fields,
            optional_fields: &[
                field::FINANCIADO_REGALIAS,
                field::FINANCIADO_CAMARA_COMERCIO,
                field::FINANCIADO_INCUBADORAS,
                field::FINANCIADO_OTRO,
            ],
            required_documents: no_documents,
            optional_documents: &[],
            rules: rules::financing,
        },
        StepSpec {
            number: step(8),
            title: "Declaraciones",
            description: "Declaraciones y aceptación de términos",
            required_fields: declaration_fields,
            optional_fields: &[],
            required_documents: no_documents,
            optional_documents: &[],
            rules: rules::declarations,
        },
    ]
}

fn no_fields(_: &ApplicationDraft) -> Vec<&'static str> {
    Vec::new()
}

fn no_documents(_: &ApplicationDraft) -> Vec<DocumentSlot> {
    Vec::new()
}

fn general_fields(_: &ApplicationDraft) -> Vec<&'static str> {
    vec![
        field::NOMBRE,
        field::APELLIDO,
        field::EMAIL,
        field::TIPO_DOCUMENTO,
        field::NUMERO_DOCUMENTO,
        field::FECHA_NACIMIENTO,
        field::SEXO,
        field::ESTADO_CIVIL,
        field::TELEFONO,
        field::DIRECCION,
        field::MUNICIPIO,
        field::EMPRENDIMIENTO_NOMBRE,
        field::EMPRENDIMIENTO_SECTOR,
        field::TIPO_PERSONA,
        field::PASSWORD,
        field::CONFIRM_PASSWORD,
    ]
}

fn mandatory_documents(_: &ApplicationDraft) -> Vec<DocumentSlot> {
    vec![
        DocumentSlot::DocTerminos,
        DocumentSlot::DocUsoImagen,
        DocumentSlot::DocPlanNegocio,
        DocumentSlot::DocVecindad,
    ]
}

fn person_type_documents(draft: &ApplicationDraft) -> Vec<DocumentSlot> {
    use super::domain::PersonType;

    let mut slots = vec![DocumentSlot::Rut];
    match draft.person_type() {
        Some(PersonType::Natural) => slots.push(DocumentSlot::Cedula),
        Some(PersonType::Juridica) => {
            slots.push(DocumentSlot::CedulaRepresentante);
            slots.push(DocumentSlot::CertExistencia);
        }
        // Unreachable past step 1, which requires a valid person type.
        None => {}
    }
    slots
}

fn control_documents(_: &ApplicationDraft) -> Vec<DocumentSlot> {
    vec![
        DocumentSlot::AntecedentesFiscales,
        DocumentSlot::AntecedentesDisciplinarios,
        DocumentSlot::AntecedentesJudiciales,
        DocumentSlot::Redam,
        DocumentSlot::InhabilidadesSexuales,
        DocumentSlot::DeclaracionCapacidadLegal,
    ]
}

fn operation_fields(_: &ApplicationDraft) -> Vec<&'static str> {
    vec![field::EMPRENDIMIENTO_FORMALIZADO]
}

fn operation_documents(draft: &ApplicationDraft) -> Vec<DocumentSlot> {
    match draft.flag(field::EMPRENDIMIENTO_FORMALIZADO) {
        Some(true) => vec![DocumentSlot::MatriculaMercantil, DocumentSlot::Facturas6Meses],
        Some(false) => vec![DocumentSlot::PublicacionesRedes, DocumentSlot::RegistroVentas],
        None => Vec::new(),
    }
}

fn financing_fields(draft: &ApplicationDraft) -> Vec<&'static str> {
    let mut fields = vec![field::FINANCIADO_ESTADO];
    if draft.flag(field::FINANCIADO_ESTADO) == Some(true)
        && draft.flag(field::FINANCIADO_OTRO) == Some(true)
    {
        fields.push(field::FINANCIADO_OTRO_TEXTO);
    }
    fields
}

fn declaration_fields(_: &ApplicationDraft) -> Vec<&'static str> {
    vec![
        field::DECLARA_VERAZ,
        field::DECLARA_NO_BENEFICIARIO,
        field::ACEPTA_TERMINOS,
    ]
}
