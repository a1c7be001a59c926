use serde::{Deserialize, Serialize};

use crate::model::MissPolicy;

/// Hour at which the logical day flips when none is configured
pub const DEFAULT_ROLLOVER_HOUR: u32 = 3;

/// User-tunable scheduler settings, stored inside the state aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Local hour (0-23) at which a new logical day begins
    #[serde(default = "default_rollover_hour")]
    pub rollover_hour: u32,
    /// Global miss policy; templates may override per-progression
    #[serde(default)]
    pub progression_miss: MissPolicy,
}

fn default_rollover_hour() -> u32 {
    DEFAULT_ROLLOVER_HOUR
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            rollover_hour: DEFAULT_ROLLOVER_HOUR,
            progression_miss: MissPolicy::Hold,
        }
    }
}

impl Settings {
    /// The rollover hour with out-of-range values falling back to the default
    pub fn effective_rollover_hour(&self) -> u32 {
        if self.rollover_hour <= 23 {
            self.rollover_hour
        } else {
            DEFAULT_ROLLOVER_HOUR
        }
    }
}
