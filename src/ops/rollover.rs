use chrono::NaiveDateTime;

use crate::model::SchedulerState;
use crate::ops::{clock, generate, progression};

/// What a rollover check did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rollover {
    /// The logical date is unchanged
    Current,
    /// The day advanced past `ended`
    Advanced {
        ended: String,
        today: String,
        counters_reset: usize,
    },
}

/// A fresh aggregate anchored to the current logical date
pub fn default_state(now: NaiveDateTime) -> SchedulerState {
    let mut state = SchedulerState::default();
    state.last_date = clock::logical_date_key(now, state.settings.effective_rollover_hour());
    state
}

/// Check whether the logical date moved past `last_date`. On an advance:
/// close out the ended day by applying miss policies, move `last_date`
/// forward, then generate the new day (so reset counters are reflected
/// in the fresh titles). The caller persists after an advance.
pub fn rollover_if_needed(state: &mut SchedulerState, now: NaiveDateTime) -> Rollover {
    let today = clock::logical_date_key(now, state.settings.effective_rollover_hour());
    if state.last_date == today {
        return Rollover::Current;
    }
    let ended = state.last_date.clone();
    let counters_reset = if ended.is_empty() {
        0
    } else {
        progression::apply_miss_policies(state, &ended)
    };
    state.last_date = today.clone();
    generate::ensure_generated(state, &today);
    Rollover::Advanced {
        ended,
        today,
        counters_reset,
    }
}
