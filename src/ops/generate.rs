use indexmap::IndexMap;
use uuid::Uuid;

use crate::model::{renumber, Instance, InstanceSource, Recurrence, RecurringTask, SchedulerState};
use crate::ops::clock;

fn uid() -> String {
    Uuid::new_v4().to_string()
}

/// Whether a template produces an instance on the given date. Weekly
/// templates never match an unparsable key; daily ones still generate.
fn due_on(task: &RecurringTask, key: &str) -> bool {
    if !task.active {
        return false;
    }
    match task.kind {
        Recurrence::Daily => true,
        Recurrence::Weekly => clock::parse_date_key(key)
            .map(|d| task.weekdays.contains(&clock::weekday_index(d)))
            .unwrap_or(false),
    }
}

fn instance_from_template(task: &RecurringTask, counter: u32, key: &str) -> Instance {
    let title = if task.progression.is_some() {
        format!("{} — Day {}", task.title, counter)
    } else {
        task.title.clone()
    };
    Instance {
        id: uid(),
        date: key.to_string(),
        task_id: Some(task.id.clone()),
        title,
        duration_est: task.duration_min,
        percent: task.percent_tracking.then_some(0),
        completed: false,
        actual_min: 0,
        order: 0,
        source: InstanceSource::Schedule,
        backlog_id: None,
        timer_start_at: None,
        timer_accumulated_sec: 0,
    }
}

/// Expand the active templates due on a date into a fresh day list.
/// Pure per call: two calls yield the same titles and order but mint
/// distinct ids. Idempotence is [`ensure_generated`]'s job.
pub fn generate_for_date(
    tasks: &[RecurringTask],
    progression: &IndexMap<String, u32>,
    key: &str,
) -> Vec<Instance> {
    let mut list: Vec<Instance> = tasks
        .iter()
        .filter(|t| due_on(t, key))
        .map(|t| {
            let counter = progression.get(&t.id).copied().unwrap_or(1);
            instance_from_template(t, counter, key)
        })
        .collect();
    renumber(&mut list);
    list
}

/// Generate a date's list if that date has never been touched. Returns
/// whether generation ran. An existing entry, even an empty one, is
/// never regenerated.
pub fn ensure_generated(state: &mut SchedulerState, key: &str) -> bool {
    if state.instances_by_date.contains_key(key) {
        return false;
    }
    let list = generate_for_date(&state.tasks, &state.progression, key);
    state.instances_by_date.insert(key.to_string(), list);
    true
}
