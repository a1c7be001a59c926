use std::fmt;

use serde_json::Value;

use crate::model::SchedulerState;

/// A problem the import validator found with one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldIssue {
    Missing(&'static str),
    NotAnArray(&'static str),
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Missing(name) => write!(f, "{name} missing"),
            FieldIssue::NotAnArray(name) => write!(f, "{name} is not an array"),
        }
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error type for state imports
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid state payload: {}", join_issues(.0))]
    Schema(Vec<FieldIssue>),
}

const REQUIRED_ARRAYS: [&str; 2] = ["tasks", "backlog"];

/// Check the shape of an incoming payload without deserializing it.
/// A null field counts as missing.
pub fn validate_shape(value: &Value) -> Vec<FieldIssue> {
    let Some(obj) = value.as_object() else {
        return REQUIRED_ARRAYS.iter().map(|f| FieldIssue::Missing(f)).collect();
    };
    let mut issues = Vec::new();
    for field in REQUIRED_ARRAYS {
        match obj.get(field) {
            None | Some(Value::Null) => issues.push(FieldIssue::Missing(field)),
            Some(v) if !v.is_array() => issues.push(FieldIssue::NotAnArray(field)),
            Some(_) => {}
        }
    }
    issues
}

/// Parse and validate a full state payload. On any error the caller's
/// current state stands untouched.
pub fn import_state(json: &str) -> Result<SchedulerState, ImportError> {
    let value: Value = serde_json::from_str(json)?;
    let issues = validate_shape(&value);
    if !issues.is_empty() {
        return Err(ImportError::Schema(issues));
    }
    Ok(serde_json::from_value(value)?)
}

/// The full aggregate as pretty JSON
pub fn export_state(state: &SchedulerState) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(state)
}
