use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::documents::{UploadedFile, PDF, XLS, XLSX};

/// Wire names of the applicant answers carried in the flat field map.
pub mod field {
    pub const NOMBRE: &str = "nombre";
    pub const APELLIDO: &str = "apellido";
    pub const EMAIL: &str = "email";
    pub const TIPO_DOCUMENTO: &str = "tipo_documento";
    pub const NUMERO_DOCUMENTO: &str = "numero_documento";
    pub const FECHA_NACIMIENTO: &str = "fecha_nacimiento";
    pub const SEXO: &str = "sexo";
    pub const ESTADO_CIVIL: &str = "estado_civil";
    pub const TELEFONO: &str = "telefono";
    pub const DIRECCION: &str = "direccion";
    pub const MUNICIPIO: &str = "municipio";
    pub const EMPRENDIMIENTO_NOMBRE: &str = "emprendimiento_nombre";
    pub const EMPRENDIMIENTO_SECTOR: &str = "emprendimiento_sector";
    pub const TIPO_PERSONA: &str = "tipo_persona";
    pub const PASSWORD: &str = "password";
    pub const CONFIRM_PASSWORD: &str = "confirm_password";
    pub const CONVOCATORIA: &str = "convocatoria";
    pub const VIDEO_URL: &str = "video_url";
    pub const EMPRENDIMIENTO_FORMALIZADO: &str = "emprendimiento_formalizado";
    pub const FINANCIADO_ESTADO: &str = "financiado_estado";
    pub const FINANCIADO_REGALIAS: &str = "financiado_regalias";
    pub const FINANCIADO_CAMARA_COMERCIO: &str = "financiado_camara_comercio";
    pub const FINANCIADO_INCUBADORAS: &str = "financiado_incubadoras";
    pub const FINANCIADO_OTRO: &str = "financiado_otro";
    pub const FINANCIADO_OTRO_TEXTO: &str = "financiado_otro_texto";
    /// Error slot for the "at least one financing source" rule; never a stored answer.
    pub const FINANCIADO_FUENTES: &str = "financiado_fuentes";
    pub const DECLARA_VERAZ: &str = "declara_veraz";
    pub const DECLARA_NO_BENEFICIARIO: &str = "declara_no_beneficiario";
    pub const ACEPTA_TERMINOS: &str = "acepta_terminos";

    pub const FINANCING_SOURCES: [&str; 4] = [
        FINANCIADO_REGALIAS,
        FINANCIADO_CAMARA_COMERCIO,
        FINANCIADO_INCUBADORAS,
        FINANCIADO_OTRO,
    ];

    /// Answers that exist only to be checked locally and are never sent to the backend.
    pub const CLIENT_ONLY: [&str; 1] = [CONFIRM_PASSWORD];
}

/// Flat map of answers as it travels to the backend.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Build a field map from a flat JSON object, skipping `null` entries.
pub fn fields_from_json(object: serde_json::Map<String, serde_json::Value>) -> FieldMap {
    object
        .into_iter()
        .filter_map(|(name, value)| FieldValue::from_json(value).map(|value| (name, value)))
        .collect()
}

/// Identifier handed out by the backend when the first step is accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(pub String);

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position in the eight-step enrollment sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StepNumber(u8);

impl StepNumber {
    pub const COUNT: u8 = 8;
    pub const FIRST: Self = Self(1);
    pub const LAST: Self = Self(Self::COUNT);

    pub fn new(value: u8) -> Result<Self, DraftError> {
        if (1..=Self::COUNT).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DraftError::InvalidStep(value))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn is_first(self) -> bool {
        self.0 == 1
    }

    pub const fn is_last(self) -> bool {
        self.0 == Self::COUNT
    }

    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1).ok()
    }

    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub(1).and_then(|value| Self::new(value).ok())
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (1..=Self::COUNT).map(Self)
    }
}

impl TryFrom<u8> for StepNumber {
    type Error = DraftError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StepNumber> for u8 {
    fn from(step: StepNumber) -> Self {
        step.0
    }
}

impl fmt::Display for StepNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single answer: free text or a yes/no flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            FieldValue::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(value) => Some(*value),
            FieldValue::Text(value) => match value.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }

    /// Map a JSON value onto an answer; `null` means no answer.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match value {
            Value::Null => None,
            Value::Bool(flag) => Some(FieldValue::Flag(flag)),
            Value::String(text) => Some(FieldValue::Text(text)),
            Value::Number(number) => Some(FieldValue::Text(number.to_string())),
            other => Some(FieldValue::Text(other.to_string())),
        }
    }

    /// Whether the answer counts as provided: non-blank text or any flag.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Flag(_) => true,
            FieldValue::Text(value) => !value.trim().is_empty(),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Legal form of the applicant; decides which identity documents step 3 asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonType {
    Natural,
    Juridica,
}

impl PersonType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "natural" => Some(Self::Natural),
            "juridica" => Some(Self::Juridica),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Natural => "natural",
            Self::Juridica => "juridica",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    InProgress,
    Completed,
}

impl DraftStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DraftStatus::InProgress => "en_progreso",
            DraftStatus::Completed => "enviada",
        }
    }
}

/// Every document the enrollment form can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSlot {
    DocTerminos,
    DocUsoImagen,
    DocPlanNegocio,
    DocVecindad,
    Rut,
    Cedula,
    CedulaRepresentante,
    CertExistencia,
    Ruv,
    Sisben,
    GrupoEtnico,
    Arn,
    Discapacidad,
    AntecedentesFiscales,
    AntecedentesDisciplinarios,
    AntecedentesJudiciales,
    Redam,
    InhabilidadesSexuales,
    DeclaracionCapacidadLegal,
    MatriculaMercantil,
    Facturas6Meses,
    PublicacionesRedes,
    RegistroVentas,
}

const PDF_ONLY: &[&str] = &[PDF];
const SPREADSHEETS: &[&str] = &[XLSX, XLS];

impl DocumentSlot {
    pub const ALL: [Self; 23] = [
        Self::DocTerminos,
        Self::DocUsoImagen,
        Self::DocPlanNegocio,
        Self::DocVecindad,
        Self::Rut,
        Self::Cedula,
        Self::CedulaRepresentante,
        Self::CertExistencia,
        Self::Ruv,
        Self::Sisben,
        Self::GrupoEtnico,
        Self::Arn,
        Self::Discapacidad,
        Self::AntecedentesFiscales,
        Self::AntecedentesDisciplinarios,
        Self::AntecedentesJudiciales,
        Self::Redam,
        Self::InhabilidadesSexuales,
        Self::DeclaracionCapacidadLegal,
        Self::MatriculaMercantil,
        Self::Facturas6Meses,
        Self::PublicacionesRedes,
        Self::RegistroVentas,
    ];

    /// Wire field carrying the base64 payload.
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::DocTerminos => "doc_terminos_pdf",
            Self::DocUsoImagen => "doc_uso_imagen_pdf",
            Self::DocPlanNegocio => "doc_plan_negocio_xls",
            Self::DocVecindad => "doc_vecindad_pdf",
            Self::Rut => "rut_pdf",
            Self::Cedula => "cedula_pdf",
            Self::CedulaRepresentante => "cedula_representante_pdf",
            Self::CertExistencia => "cert_existencia_pdf",
            Self::Ruv => "ruv_pdf",
            Self::Sisben => "sisben_pdf",
            Self::GrupoEtnico => "grupo_etnico_pdf",
            Self::Arn => "arn_pdf",
            Self::Discapacidad => "discapacidad_pdf",
            Self::AntecedentesFiscales => "antecedentes_fiscales_pdf",
            Self::AntecedentesDisciplinarios => "antecedentes_disciplinarios_pdf",
            Self::AntecedentesJudiciales => "antecedentes_judiciales_pdf",
            Self::Redam => "redam_pdf",
            Self::InhabilidadesSexuales => "inhabilidades_sexuales_pdf",
            Self::DeclaracionCapacidadLegal => "declaracion_capacidad_legal_pdf",
            Self::MatriculaMercantil => "matricula_mercantil_pdf",
            Self::Facturas6Meses => "facturas_6meses_pdf",
            Self::PublicacionesRedes => "publicaciones_redes_pdf",
            Self::RegistroVentas => "registro_ventas_pdf",
        }
    }

    /// Sibling wire field carrying the original filename.
    pub const fn name_field(self) -> &'static str {
        match self {
            Self::DocTerminos => "doc_terminos_pdf_nombre",
            Self::DocUsoImagen => "doc_uso_imagen_pdf_nombre",
            // The backend has always read the business plan name from this key.
            Self::DocPlanNegocio => "doc_plan_negocio_nombre",
            Self::DocVecindad => "doc_vecindad_pdf_nombre",
            Self::Rut => "rut_pdf_nombre",
            Self::Cedula => "cedula_pdf_nombre",
            Self::CedulaRepresentante => "cedula_representante_pdf_nombre",
            Self::CertExistencia => "cert_existencia_pdf_nombre",
            Self::Ruv => "ruv_pdf_nombre",
            Self::Sisben => "sisben_pdf_nombre",
            Self::GrupoEtnico => "grupo_etnico_pdf_nombre",
            Self::Arn => "arn_pdf_nombre",
            Self::Discapacidad => "discapacidad_pdf_nombre",
            Self::AntecedentesFiscales => "antecedentes_fiscales_pdf_nombre",
            Self::AntecedentesDisciplinarios => "antecedentes_disciplinarios_pdf_nombre",
            Self::AntecedentesJudiciales => "antecedentes_judiciales_pdf_nombre",
            Self::Redam => "redam_pdf_nombre",
            Self::InhabilidadesSexuales => "inhabilidades_sexuales_pdf_nombre",
            Self::DeclaracionCapacidadLegal => "declaracion_capacidad_legal_pdf_nombre",
            Self::MatriculaMercantil => "matricula_mercantil_pdf_nombre",
            Self::Facturas6Meses => "facturas_6meses_pdf_nombre",
            Self::PublicacionesRedes => "publicaciones_redes_pdf_nombre",
            Self::RegistroVentas => "registro_ventas_pdf_nombre",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::DocTerminos => "Términos de referencia firmados (TDR)",
            Self::DocUsoImagen => "Autorización de uso de imagen",
            Self::DocPlanNegocio => "Plan de negocio",
            Self::DocVecindad => "Certificado de vecindad",
            Self::Rut => "RUT",
            Self::Cedula => "Cédula de ciudadanía",
            Self::CedulaRepresentante => "Cédula del representante legal",
            Self::CertExistencia => "Certificado de existencia y representación legal",
            Self::Ruv => "Registro Único de Víctimas (RUV)",
            Self::Sisben => "Copia del SISBEN (grupos A, B o C)",
            Self::GrupoEtnico => "Certificado de pertenencia a grupo étnico",
            Self::Arn => "Certificado de proceso de reincorporación (ARN)",
            Self::Discapacidad => "Certificado de discapacidad",
            Self::AntecedentesFiscales => "Antecedentes fiscales (Contraloría)",
            Self::AntecedentesDisciplinarios => "Antecedentes disciplinarios (Procuraduría)",
            Self::AntecedentesJudiciales => "Antecedentes judiciales (Policía Nacional)",
            Self::Redam => "Certificado REDAM",
            Self::InhabilidadesSexuales => {
                "Consulta de inhabilidades por delitos sexuales contra menores"
            }
            Self::DeclaracionCapacidadLegal => "Declaración juramentada de capacidad legal",
            Self::MatriculaMercantil => "Matrícula mercantil",
            Self::Facturas6Meses => "Facturas de los últimos 6 meses",
            Self::PublicacionesRedes => "Publicaciones en redes sociales",
            Self::RegistroVentas => "Registro de ventas",
        }
    }

    /// Step that collects the slot.
    pub fn step(self) -> StepNumber {
        let value = match self {
            Self::DocTerminos | Self::DocUsoImagen | Self::DocPlanNegocio | Self::DocVecindad => 2,
            Self::Rut | Self::Cedula | Self::CedulaRepresentante | Self::CertExistencia => 3,
            Self::Ruv | Self::Sisben | Self::GrupoEtnico | Self::Arn | Self::Discapacidad => 4,
            Self::AntecedentesFiscales
            | Self::AntecedentesDisciplinarios
            | Self::AntecedentesJudiciales
            | Self::Redam
            | Self::InhabilidadesSexuales
            | Self::DeclaracionCapacidadLegal => 5,
            Self::MatriculaMercantil
            | Self::Facturas6Meses
            | Self::PublicacionesRedes
            | Self::RegistroVentas => 6,
        };
        StepNumber(value)
    }

    pub const fn accepted_types(self) -> &'static [&'static str] {
        match self {
            Self::DocPlanNegocio => SPREADSHEETS,
            _ => PDF_ONLY,
        }
    }

    /// Differential documents may be missing at submission and supplied later.
    pub const fn is_subsanable(self) -> bool {
        matches!(
            self,
            Self::Ruv | Self::Sisben | Self::GrupoEtnico | Self::Arn | Self::Discapacidad
        )
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.field_name() == name)
    }

    pub fn for_step(step: StepNumber) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |slot| slot.step() == step)
    }
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// The applicant's in-flight enrollment: answers, attached files, and progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    draft_id: Option<DraftId>,
    current_step: StepNumber,
    fields: FieldMap,
    documents: BTreeMap<DocumentSlot, UploadedFile>,
    completed_steps: BTreeSet<StepNumber>,
    status: DraftStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApplicationDraft {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            draft_id: None,
            current_step: StepNumber::FIRST,
            fields: FieldMap::new(),
            documents: BTreeMap::new(),
            completed_steps: BTreeSet::new(),
            status: DraftStatus::InProgress,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a draft from answers already on record (e.g. a backend read-back).
    pub fn from_fields(fields: FieldMap, now: DateTime<Utc>) -> Self {
        let mut draft = Self::new(now);
        draft.fields = fields;
        draft
    }

    pub fn draft_id(&self) -> Option<&DraftId> {
        self.draft_id.as_ref()
    }

    pub fn current_step(&self) -> StepNumber {
        self.current_step
    }

    pub fn status(&self) -> DraftStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == DraftStatus::Completed
    }

    pub fn is_step_completed(&self, step: StepNumber) -> bool {
        self.completed_steps.contains(&step)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Trimmed, non-blank text answer.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(FieldValue::as_text)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(FieldValue::as_flag)
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(FieldValue::is_present)
    }

    pub fn person_type(&self) -> Option<PersonType> {
        self.text(field::TIPO_PERSONA).and_then(PersonType::parse)
    }

    pub fn documents(&self) -> &BTreeMap<DocumentSlot, UploadedFile> {
        &self.documents
    }

    pub fn document(&self, slot: DocumentSlot) -> Option<&UploadedFile> {
        self.documents.get(&slot)
    }

    pub fn has_document(&self, slot: DocumentSlot) -> bool {
        self.documents.contains_key(&slot)
    }

    pub fn set_field(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
        now: DateTime<Utc>,
    ) -> Result<(), DraftError> {
        self.ensure_mutable()?;
        self.fields.insert(name.into(), value.into());
        self.updated_at = now;
        Ok(())
    }

    pub fn clear_field(&mut self, name: &str, now: DateTime<Utc>) -> Result<(), DraftError> {
        self.ensure_mutable()?;
        if self.fields.remove(name).is_some() {
            self.updated_at = now;
        }
        Ok(())
    }

    pub fn attach(
        &mut self,
        slot: DocumentSlot,
        file: UploadedFile,
        now: DateTime<Utc>,
    ) -> Result<(), DraftError> {
        self.ensure_mutable()?;
        self.documents.insert(slot, file);
        self.updated_at = now;
        Ok(())
    }

    pub fn detach(
        &mut self,
        slot: DocumentSlot,
        now: DateTime<Utc>,
    ) -> Result<Option<UploadedFile>, DraftError> {
        self.ensure_mutable()?;
        let removed = self.documents.remove(&slot);
        if removed.is_some() {
            self.updated_at = now;
        }
        Ok(removed)
    }

    /// Answers as transmitted to the backend; client-only fields are left out.
    pub fn wire_fields(&self) -> FieldMap {
        self.fields
            .iter()
            .filter(|(name, _)| !field::CLIENT_ONLY.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub(crate) fn assign_id(&mut self, draft_id: DraftId) {
        self.draft_id = Some(draft_id);
    }

    /// Mark the current step complete and move forward one step.
    pub(crate) fn advance(&mut self, now: DateTime<Utc>) -> Result<StepNumber, DraftError> {
        self.ensure_mutable()?;
        let next = self
            .current_step
            .next()
            .ok_or(DraftError::InvalidStep(self.current_step.get() + 1))?;
        self.completed_steps.insert(self.current_step);
        self.current_step = next;
        self.updated_at = now;
        Ok(next)
    }

    /// Explicit backward navigation; the only way the current step decreases.
    pub(crate) fn step_back(&mut self) -> Result<StepNumber, DraftError> {
        self.ensure_mutable()?;
        let previous = self
            .current_step
            .previous()
            .ok_or(DraftError::InvalidStep(0))?;
        self.current_step = previous;
        Ok(previous)
    }

    /// Jump back to an earlier step, e.g. one whose answers were edited after it was confirmed.
    pub(crate) fn return_to(&mut self, step: StepNumber) -> Result<StepNumber, DraftError> {
        self.ensure_mutable()?;
        if step > self.current_step {
            return Err(DraftError::InvalidStep(step.get()));
        }
        self.current_step = step;
        Ok(step)
    }

    pub(crate) fn mark_completed(&mut self, now: DateTime<Utc>) -> Result<(), DraftError> {
        self.ensure_mutable()?;
        self.completed_steps.insert(self.current_step);
        self.status = DraftStatus::Completed;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<(), DraftError> {
        if self.is_completed() {
            Err(DraftError::Completed)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("step {0} is outside the 1..=8 enrollment sequence")]
    InvalidStep(u8),
    #[error("la inscripción ya fue enviada y no se puede modificar")]
    Completed,
}
