//! Applicant-facing error texts. The program runs in Spanish, so these are too.

use super::super::domain::{field, DocumentSlot, PersonType};

pub fn missing_field(name: &str) -> String {
    let text = match name {
        field::NOMBRE => "El nombre es obligatorio",
        field::APELLIDO => "El apellido es obligatorio",
        field::EMAIL => "El correo electrónico es obligatorio",
        field::TIPO_DOCUMENTO => "El tipo de documento es obligatorio",
        field::NUMERO_DOCUMENTO => "El número de documento es obligatorio",
        field::FECHA_NACIMIENTO => "La fecha de nacimiento es obligatoria",
        field::SEXO => "El sexo es obligatorio",
        field::ESTADO_CIVIL => "El estado civil es obligatorio",
        field::TELEFONO => "El teléfono es obligatorio",
        field::DIRECCION => "La dirección es obligatoria",
        field::MUNICIPIO => "El municipio es obligatorio",
        field::EMPRENDIMIENTO_NOMBRE => "El nombre del emprendimiento es obligatorio",
        field::EMPRENDIMIENTO_SECTOR => "El sector económico es obligatorio",
        field::TIPO_PERSONA => "El tipo de persona es obligatorio",
        field::PASSWORD => "La contraseña es obligatoria",
        field::CONFIRM_PASSWORD => "Confirmar contraseña es obligatorio",
        field::EMPRENDIMIENTO_FORMALIZADO => UNANSWERED_FORMALIZATION,
        field::FINANCIADO_ESTADO => UNANSWERED_FINANCING,
        field::FINANCIADO_OTRO_TEXTO => OTHER_SOURCE_UNSPECIFIED,
        field::DECLARA_VERAZ => "Debe declarar que la información suministrada es veraz",
        field::DECLARA_NO_BENEFICIARIO => {
            "Debe declarar que no ha sido beneficiario de recursos públicos para este emprendimiento"
        }
        field::ACEPTA_TERMINOS => "Debe aceptar los términos y condiciones de la convocatoria",
        other => return format!("El campo {other} es obligatorio"),
    };
    text.to_string()
}

pub fn missing_document(slot: DocumentSlot, person_type: Option<PersonType>) -> String {
    let text = match slot {
        DocumentSlot::DocTerminos => "El documento TDR es obligatorio",
        DocumentSlot::DocUsoImagen => "La autorización de uso de imagen es obligatoria",
        DocumentSlot::DocPlanNegocio => "El plan de negocio es obligatorio",
        DocumentSlot::DocVecindad => "El certificado de vecindad es obligatorio",
        DocumentSlot::Rut => "El RUT es obligatorio",
        DocumentSlot::Cedula => match person_type {
            Some(PersonType::Natural) => "La cédula es obligatoria para Persona Natural",
            _ => "La cédula es obligatoria",
        },
        DocumentSlot::CedulaRepresentante => {
            "La cédula del representante legal es obligatoria para Persona Jurídica"
        }
        DocumentSlot::CertExistencia => {
            "El certificado de existencia y representación legal es obligatorio para Persona Jurídica"
        }
        DocumentSlot::AntecedentesFiscales => "Los antecedentes fiscales son obligatorios",
        DocumentSlot::AntecedentesDisciplinarios => {
            "Los antecedentes disciplinarios son obligatorios"
        }
        DocumentSlot::AntecedentesJudiciales => "Los antecedentes judiciales son obligatorios",
        DocumentSlot::Redam => "El certificado REDAM es obligatorio",
        DocumentSlot::InhabilidadesSexuales => {
            "La consulta de inhabilidades sexuales es obligatoria"
        }
        DocumentSlot::DeclaracionCapacidadLegal => {
            "La declaración de capacidad legal es obligatoria"
        }
        DocumentSlot::MatriculaMercantil => {
            "La matrícula mercantil es obligatoria para emprendimientos formalizados"
        }
        DocumentSlot::Facturas6Meses => {
            "Las facturas de los últimos 6 meses son obligatorias para emprendimientos formalizados"
        }
        DocumentSlot::PublicacionesRedes => {
            "Las publicaciones de redes sociales son obligatorias para emprendimientos informales"
        }
        DocumentSlot::RegistroVentas => {
            "El registro de ventas es obligatorio para emprendimientos informales"
        }
        other => return format!("El documento {} es obligatorio", other.label()),
    };
    text.to_string()
}

pub fn invalid_choice(name: &str) -> String {
    match name {
        field::MUNICIPIO => "El municipio seleccionado no es válido".to_string(),
        field::TIPO_DOCUMENTO => "El tipo de documento no es válido".to_string(),
        field::SEXO => "El sexo seleccionado no es válido".to_string(),
        field::ESTADO_CIVIL => "El estado civil seleccionado no es válido".to_string(),
        field::EMPRENDIMIENTO_SECTOR => "El sector económico no es válido".to_string(),
        field::TIPO_PERSONA => "El tipo de persona no es válido".to_string(),
        other => format!("El valor de {other} no es válido"),
    }
}

pub fn age_out_of_range(min_age: u32, max_age: u32) -> String {
    format!("Debe tener entre {min_age} y {max_age} años para participar")
}

pub const INVALID_EMAIL: &str = "El formato del correo electrónico no es válido";
pub const INVALID_BIRTH_DATE: &str = "Fecha de nacimiento inválida";
pub const WEAK_PASSWORD: &str =
    "La contraseña debe tener al menos 8 caracteres, incluir letras y números";
pub const PASSWORD_MISMATCH: &str = "Las contraseñas no coinciden";
pub const UNANSWERED_FORMALIZATION: &str =
    "Debe especificar si el emprendimiento está formalizado";
pub const UNANSWERED_FINANCING: &str =
    "Debe especificar si el emprendimiento ha sido financiado por otros programas del Estado";
pub const NO_FINANCING_SOURCE: &str =
    "Si el emprendimiento ha sido financiado, debe especificar al menos una fuente de financiación";
pub const OTHER_SOURCE_UNSPECIFIED: &str =
    "Si selecciona \"Otro\" como fuente de financiación, debe especificar cuál";
