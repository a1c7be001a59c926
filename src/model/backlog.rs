use serde::{Deserialize, Serialize};

/// A free-form backlog entry, not bound to any date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogItem {
    pub id: String,
    pub title: String,
    /// Estimated minutes; absent = no estimate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_min: Option<u32>,
    /// Creation time, epoch milliseconds
    #[serde(default)]
    pub created_at: i64,
}

impl BacklogItem {
    pub fn new(id: String, title: String, created_at: i64) -> Self {
        BacklogItem {
            id,
            title,
            estimate_min: None,
            created_at,
        }
    }
}
