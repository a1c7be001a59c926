use serde::{Deserialize, Serialize};

/// Where an instance came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceSource {
    /// Generated from a recurring template
    Schedule,
    /// Pulled in from the backlog
    Backlog,
    /// Typed directly onto the day
    Quick,
}

/// A concrete task on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    /// Date key of the day this instance belongs to
    pub date: String,
    /// Originating template; schedule instances only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub duration_est: u32,
    /// Percent complete; carried only when the template tracks percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    pub completed: bool,
    /// Minutes actually spent (whole minutes; timers fold into this)
    #[serde(default)]
    pub actual_min: u32,
    /// Position in the day list; always equals the array index
    pub order: usize,
    pub source: InstanceSource,
    /// Backlog identity this instance carries, if it came from there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlog_id: Option<String>,
    /// Epoch ms when the running timer started; absent when stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_start_at: Option<i64>,
    /// Leftover seconds (< 60) carried between timer stops
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timer_accumulated_sec: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Instance {
    /// Whether a timer is currently running on this instance
    pub fn timer_running(&self) -> bool {
        self.timer_start_at.is_some()
    }
}
