use chrono::NaiveDate;
use enrollment::config::EligibilityConfig;
use enrollment::workflows::enrollment::{fields_from_json, FieldMap};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) eligibility: EligibilityConfig,
}

/// Read a flat JSON object of answers, e.g.
/// `{"nombre": "Ana", "emprendimiento_formalizado": true}`.
pub(crate) fn load_answers(path: &Path) -> io::Result<FieldMap> {
    let raw = std::fs::read_to_string(path)?;
    parse_answers(&raw)
}

pub(crate) fn parse_answers(raw: &str) -> io::Result<FieldMap> {
    let object: Map<String, Value> = serde_json::from_str(raw)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    Ok(fields_from_json(object))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
