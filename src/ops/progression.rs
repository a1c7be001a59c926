use crate::model::{MissPolicy, SchedulerState};

/// Advance a template's counter after a completion. Steps forward, or
/// wraps back to 1 once the program's final day is done. Templates
/// without a progression are untouched.
pub fn advance_on_completion(state: &mut SchedulerState, task_id: &str) {
    let Some(spec) = state.find_task(task_id).and_then(|t| t.progression) else {
        return;
    };
    let cur = state.counter(task_id);
    let next = if cur >= spec.days { 1 } else { cur + 1 };
    state.progression.insert(task_id.to_string(), next);
}

/// Apply miss policies to a day that ended. Every schedule instance left
/// incomplete consults its template's `on_miss`, falling back to the
/// global setting: hold keeps the counter, reset writes it back to 1.
/// Returns how many counters observably changed.
pub fn apply_miss_policies(state: &mut SchedulerState, key: &str) -> usize {
    let missed: Vec<String> = state
        .day(key)
        .iter()
        .filter(|i| !i.completed)
        .filter_map(|i| i.task_id.clone())
        .collect();
    let mut reset = 0;
    for task_id in missed {
        let Some(spec) = state.find_task(&task_id).and_then(|t| t.progression) else {
            continue;
        };
        let policy = spec.on_miss.unwrap_or(state.settings.progression_miss);
        if policy == MissPolicy::Reset {
            let prev = state.counter(&task_id);
            state.progression.insert(task_id.clone(), 1);
            if prev != 1 {
                reset += 1;
            }
        }
    }
    reset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Instance, InstanceSource, ProgressionSpec, RecurringTask};

    const DAY: &str = "2026-01-05";

    fn prog_task(id: &str, days: u32, on_miss: Option<MissPolicy>) -> RecurringTask {
        let mut t = RecurringTask::daily(id.to_string(), format!("task {id}"));
        t.progression = Some(ProgressionSpec { days, on_miss });
        t
    }

    fn inst(id: &str, task_id: Option<&str>, completed: bool) -> Instance {
        Instance {
            id: id.to_string(),
            date: DAY.to_string(),
            task_id: task_id.map(|s| s.to_string()),
            title: format!("inst {id}"),
            duration_est: 0,
            percent: None,
            completed,
            actual_min: 0,
            order: 0,
            source: InstanceSource::Schedule,
            backlog_id: None,
            timer_start_at: None,
            timer_accumulated_sec: 0,
        }
    }

    fn state_with(tasks: Vec<RecurringTask>, day: Vec<Instance>) -> SchedulerState {
        let mut state = SchedulerState {
            tasks,
            ..SchedulerState::default()
        };
        state.instances_by_date.insert(DAY.to_string(), day);
        state
    }

    // --- Advance ---

    #[test]
    fn advance_steps_forward() {
        let mut state = state_with(vec![prog_task("t1", 3, None)], vec![]);
        advance_on_completion(&mut state, "t1");
        assert_eq!(state.counter("t1"), 2);
        advance_on_completion(&mut state, "t1");
        assert_eq!(state.counter("t1"), 3);
    }

    #[test]
    fn advance_wraps_past_final_day() {
        let mut state = state_with(vec![prog_task("t1", 3, None)], vec![]);
        state.progression.insert("t1".to_string(), 3);
        advance_on_completion(&mut state, "t1");
        assert_eq!(state.counter("t1"), 1);
    }

    #[test]
    fn advance_wraps_from_beyond_range() {
        let mut state = state_with(vec![prog_task("t1", 3, None)], vec![]);
        state.progression.insert("t1".to_string(), 9);
        advance_on_completion(&mut state, "t1");
        assert_eq!(state.counter("t1"), 1);
    }

    #[test]
    fn advance_ignores_plain_templates() {
        let mut state = state_with(
            vec![RecurringTask::daily("t1".into(), "plain".into())],
            vec![],
        );
        advance_on_completion(&mut state, "t1");
        assert!(state.progression.is_empty());
    }

    #[test]
    fn advance_ignores_unknown_task() {
        let mut state = state_with(vec![], vec![]);
        advance_on_completion(&mut state, "ghost");
        assert!(state.progression.is_empty());
    }

    // --- Miss policies ---

    #[test]
    fn hold_keeps_the_counter() {
        let mut state = state_with(
            vec![prog_task("t1", 30, None)],
            vec![inst("i1", Some("t1"), false)],
        );
        state.progression.insert("t1".to_string(), 7);
        assert_eq!(apply_miss_policies(&mut state, DAY), 0);
        assert_eq!(state.counter("t1"), 7);
    }

    #[test]
    fn reset_returns_to_one() {
        let mut state = state_with(
            vec![prog_task("t1", 30, Some(MissPolicy::Reset))],
            vec![inst("i1", Some("t1"), false)],
        );
        state.progression.insert("t1".to_string(), 7);
        assert_eq!(apply_miss_policies(&mut state, DAY), 1);
        assert_eq!(state.counter("t1"), 1);
    }

    #[test]
    fn global_default_applies_when_template_is_silent() {
        let mut state = state_with(
            vec![prog_task("t1", 30, None)],
            vec![inst("i1", Some("t1"), false)],
        );
        state.settings.progression_miss = MissPolicy::Reset;
        state.progression.insert("t1".to_string(), 4);
        assert_eq!(apply_miss_policies(&mut state, DAY), 1);
        assert_eq!(state.counter("t1"), 1);
    }

    #[test]
    fn template_override_beats_global() {
        let mut state = state_with(
            vec![prog_task("t1", 30, Some(MissPolicy::Hold))],
            vec![inst("i1", Some("t1"), false)],
        );
        state.settings.progression_miss = MissPolicy::Reset;
        state.progression.insert("t1".to_string(), 4);
        assert_eq!(apply_miss_policies(&mut state, DAY), 0);
        assert_eq!(state.counter("t1"), 4);
    }

    #[test]
    fn completed_instances_never_miss() {
        let mut state = state_with(
            vec![prog_task("t1", 30, Some(MissPolicy::Reset))],
            vec![inst("i1", Some("t1"), true)],
        );
        state.progression.insert("t1".to_string(), 7);
        assert_eq!(apply_miss_policies(&mut state, DAY), 0);
        assert_eq!(state.counter("t1"), 7);
    }

    #[test]
    fn instances_without_template_are_ignored() {
        let mut state = state_with(
            vec![prog_task("t1", 30, Some(MissPolicy::Reset))],
            vec![inst("i1", None, false), inst("i2", Some("gone"), false)],
        );
        assert_eq!(apply_miss_policies(&mut state, DAY), 0);
    }

    #[test]
    fn reset_of_a_fresh_counter_counts_nothing() {
        let mut state = state_with(
            vec![prog_task("t1", 30, Some(MissPolicy::Reset))],
            vec![inst("i1", Some("t1"), false)],
        );
        assert_eq!(apply_miss_policies(&mut state, DAY), 0);
        assert_eq!(state.counter("t1"), 1);
    }

    #[test]
    fn untouched_day_is_a_noop() {
        let mut state = state_with(vec![prog_task("t1", 30, Some(MissPolicy::Reset))], vec![]);
        assert_eq!(apply_miss_policies(&mut state, "2099-01-01"), 0);
    }
}
