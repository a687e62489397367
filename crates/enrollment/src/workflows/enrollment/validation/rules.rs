use std::sync::OnceLock;

use regex::Regex;

use super::super::catalog;
use super::super::domain::{field, ApplicationDraft};
use super::eligibility::{age_on, parse_birth_date};
use super::{messages, RuleContext, ValidationResult};

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok())
        .as_ref()
}

pub fn is_valid_email(value: &str) -> bool {
    email_pattern().is_some_and(|pattern| pattern.is_match(value.trim()))
}

/// At least eight characters, with at least one ASCII letter and one digit.
pub fn is_strong_password(value: &str) -> bool {
    value.chars().count() >= 8
        && value.chars().any(|c| c.is_ascii_alphabetic())
        && value.chars().any(|c| c.is_ascii_digit())
}

pub fn none(_: &ApplicationDraft, _: &RuleContext<'_>, _: &mut ValidationResult) {}

pub fn general_data(
    draft: &ApplicationDraft,
    context: &RuleContext<'_>,
    result: &mut ValidationResult,
) {
    if let Some(email) = draft.text(field::EMAIL) {
        if !is_valid_email(email) {
            result.insert(field::EMAIL, messages::INVALID_EMAIL);
        }
    }

    if let Some(raw) = draft.text(field::FECHA_NACIMIENTO) {
        match parse_birth_date(raw).and_then(|birth| age_on(birth, context.today)) {
            None => result.insert(field::FECHA_NACIMIENTO, messages::INVALID_BIRTH_DATE),
            Some(age) => {
                let window = context.eligibility;
                if age < window.min_age || age > window.max_age {
                    result.insert(
                        field::FECHA_NACIMIENTO,
                        messages::age_out_of_range(window.min_age, window.max_age),
                    );
                }
            }
        }
    }

    check_choice(draft, field::TIPO_DOCUMENTO, &catalog::TIPOS_DOCUMENTO, result);
    check_choice(draft, field::SEXO, &catalog::SEXOS, result);
    check_choice(draft, field::ESTADO_CIVIL, &catalog::ESTADOS_CIVILES, result);
    check_choice(draft, field::EMPRENDIMIENTO_SECTOR, &catalog::SECTORES, result);
    check_choice(draft, field::TIPO_PERSONA, &catalog::TIPOS_PERSONA, result);
    if let Some(municipio) = draft.text(field::MUNICIPIO) {
        if catalog::find_municipality(municipio).is_none() {
            result.insert(field::MUNICIPIO, messages::invalid_choice(field::MUNICIPIO));
        }
    }

    if let Some(password) = draft.text(field::PASSWORD) {
        if !is_strong_password(password) {
            result.insert(field::PASSWORD, messages::WEAK_PASSWORD);
        }
        if let Some(confirmation) = draft.text(field::CONFIRM_PASSWORD) {
            if confirmation != password {
                result.insert(field::CONFIRM_PASSWORD, messages::PASSWORD_MISMATCH);
            }
        }
    }
}

fn check_choice(
    draft: &ApplicationDraft,
    name: &'static str,
    allowed: &[&str],
    result: &mut ValidationResult,
) {
    if let Some(value) = draft.text(name) {
        if !allowed.contains(&value) {
            result.insert(name, messages::invalid_choice(name));
        }
    }
}

pub fn operation(draft: &ApplicationDraft, _: &RuleContext<'_>, result: &mut ValidationResult) {
    if draft.is_present(field::EMPRENDIMIENTO_FORMALIZADO)
        && draft.flag(field::EMPRENDIMIENTO_FORMALIZADO).is_none()
    {
        result.insert(
            field::EMPRENDIMIENTO_FORMALIZADO,
            messages::UNANSWERED_FORMALIZATION,
        );
    }
}

pub fn financing(draft: &ApplicationDraft, _: &RuleContext<'_>, result: &mut ValidationResult) {
    match draft.flag(field::FINANCIADO_ESTADO) {
        None => result.insert(field::FINANCIADO_ESTADO, messages::UNANSWERED_FINANCING),
        Some(false) => {}
        Some(true) => {
            let any_source = field::FINANCING_SOURCES
                .iter()
                .any(|source| draft.flag(source) == Some(true));
            if !any_source {
                result.insert(field::FINANCIADO_FUENTES, messages::NO_FINANCING_SOURCE);
            }
        }
    }
}

pub fn declarations(draft: &ApplicationDraft, _: &RuleContext<'_>, result: &mut ValidationResult) {
    for name in [
        field::DECLARA_VERAZ,
        field::DECLARA_NO_BENEFICIARIO,
        field::ACEPTA_TERMINOS,
    ] {
        if draft.flag(name) != Some(true) {
            result.insert(name, messages::missing_field(name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern_requires_a_top_level_domain() {
        assert!(is_valid_email("ana.perez@correo.co"));
        assert!(!is_valid_email("ana.perez@correo"));
        assert!(!is_valid_email("ana perez@correo.co"));
    }

    #[test]
    fn passwords_need_letters_and_digits() {
        assert!(is_strong_password("clave2025"));
        assert!(!is_strong_password("clave"));
        assert!(!is_strong_password("12345678"));
        assert!(!is_strong_password("abcdefgh"));
    }
}
