use serde::{Deserialize, Serialize};

/// How often a template produces instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
}

/// What happens to a progression counter when a day ends with the
/// instance still incomplete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissPolicy {
    #[default]
    Hold,
    Reset,
}

/// A counted multi-day program attached to a template (e.g. a 30-day run)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionSpec {
    /// Total days in the program; counters wrap back to 1 past this
    pub days: u32,
    /// Per-template miss override; absent defers to the global setting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_miss: Option<MissPolicy>,
}

/// A recurring task template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTask {
    pub id: String,
    pub title: String,
    /// Recurrence kind
    #[serde(rename = "type")]
    pub kind: Recurrence,
    /// Weekday indices (0 = Sunday); only weekly templates consult this
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<u8>,
    /// Estimated minutes, 0 = no estimate
    #[serde(default)]
    pub duration_min: u32,
    /// Whether instances carry a percent-complete field
    #[serde(default)]
    pub percent_tracking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression: Option<ProgressionSpec>,
    /// Inactive templates generate nothing but keep their history
    pub active: bool,
}

impl RecurringTask {
    /// Create a daily template with the given id and title, active,
    /// with no estimate, percent tracking, or progression
    pub fn daily(id: String, title: String) -> Self {
        RecurringTask {
            id,
            title,
            kind: Recurrence::Daily,
            weekdays: Vec::new(),
            duration_min: 0,
            percent_tracking: false,
            progression: None,
            active: true,
        }
    }

    /// Create a weekly template scheduled on the given weekdays (0 = Sunday)
    pub fn weekly(id: String, title: String, weekdays: Vec<u8>) -> Self {
        RecurringTask {
            kind: Recurrence::Weekly,
            weekdays,
            ..RecurringTask::daily(id, title)
        }
    }
}
