mod eligibility;
pub(crate) mod messages;
pub(crate) mod rules;

pub use eligibility::{age_on, parse_birth_date};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::blueprint::EnrollmentBlueprint;
use super::domain::{field, ApplicationDraft, StepNumber};
use crate::config::EligibilityConfig;

/// Key under which step-level and non-field failures are reported.
pub const GENERAL: &str = "general";

/// Cross-field checks a step runs after its presence checks.
pub type StepRule = fn(&ApplicationDraft, &RuleContext<'_>, &mut ValidationResult);

/// Inputs shared by every rule evaluation: the evaluation date and the program's eligibility
/// window.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub today: NaiveDate,
    pub eligibility: &'a EligibilityConfig,
}

/// Field-level errors of one step, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationResult {
    errors: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error unless the field already carries one; the first failure wins.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    pub fn set(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(field.into(), message.into());
    }

    pub fn set_general(&mut self, message: impl Into<String>) {
        self.set(GENERAL, message);
    }

    pub fn general(&self) -> Option<&str> {
        self.errors.get(GENERAL).map(String::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }

    pub fn merge(&mut self, other: ValidationResult) {
        for (field, message) in other.errors {
            self.insert(field, message);
        }
    }

    /// Drop errors on fields that never leave the applicant's device.
    pub fn retain_transmitted(&mut self) {
        self.errors
            .retain(|name, _| !field::CLIENT_ONLY.contains(&name.as_str()));
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.errors.remove(field)
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// First message, preferring the general slot; used when a single line is needed.
    pub fn summary(&self) -> Option<&str> {
        self.general()
            .or_else(|| self.errors.values().next().map(String::as_str))
    }
}

/// Stateless evaluator applying the step table to a draft.
#[derive(Debug)]
pub struct ValidationEngine {
    blueprint: EnrollmentBlueprint,
    eligibility: EligibilityConfig,
}

impl ValidationEngine {
    pub fn new(eligibility: EligibilityConfig) -> Self {
        Self {
            blueprint: EnrollmentBlueprint::standard(),
            eligibility,
        }
    }

    pub fn blueprint(&self) -> &EnrollmentBlueprint {
        &self.blueprint
    }

    pub fn eligibility(&self) -> &EligibilityConfig {
        &self.eligibility
    }

    /// Evaluate one step. Only the requirements active for the draft's current answers are
    /// checked, so optional or inactive fields are never reported.
    pub fn validate(
        &self,
        step: StepNumber,
        draft: &ApplicationDraft,
        today: NaiveDate,
    ) -> ValidationResult {
        let spec = self.blueprint.step(step);
        let context = RuleContext {
            today,
            eligibility: &self.eligibility,
        };
        let mut result = ValidationResult::new();

        for name in spec.required_fields_for(draft) {
            if !draft.is_present(name) {
                result.insert(name, messages::missing_field(name));
            }
        }
        for slot in spec.required_documents_for(draft) {
            if !draft.has_document(slot) {
                result.insert(
                    slot.field_name(),
                    messages::missing_document(slot, draft.person_type()),
                );
            }
        }

        (spec.rules)(draft, &context, &mut result);
        result
    }

    /// Evaluate every step, merging the results. The first failing step is reported alongside.
    pub fn validate_all(
        &self,
        draft: &ApplicationDraft,
        today: NaiveDate,
    ) -> (Option<StepNumber>, ValidationResult) {
        let mut merged = ValidationResult::new();
        let mut first_invalid = None;
        for step in StepNumber::all() {
            let result = self.validate(step, draft, today);
            if !result.is_valid() && first_invalid.is_none() {
                first_invalid = Some(step);
            }
            merged.merge(result);
        }
        (first_invalid, merged)
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(EligibilityConfig::default())
    }
}
