use uuid::Uuid;

use crate::model::{ProgressionSpec, Recurrence, RecurringTask, SchedulerState};

/// Error type for template operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("weekly task needs at least one weekday")]
    NoWeekdays,
    #[error("invalid weekday {0} (0-6, 0 = Sunday)")]
    BadWeekday(u8),
    #[error("progression needs at least one day")]
    ZeroDays,
}

fn uid() -> String {
    Uuid::new_v4().to_string()
}

/// Add a template. New templates are active; existing days are not
/// regenerated. Returns the new template's id.
pub fn add_task(
    state: &mut SchedulerState,
    title: String,
    kind: Recurrence,
    weekdays: Vec<u8>,
    duration_min: u32,
    percent_tracking: bool,
    progression: Option<ProgressionSpec>,
) -> Result<String, TaskError> {
    if kind == Recurrence::Weekly && weekdays.is_empty() {
        return Err(TaskError::NoWeekdays);
    }
    if let Some(d) = weekdays.iter().find(|d| **d > 6) {
        return Err(TaskError::BadWeekday(*d));
    }
    if progression.is_some_and(|p| p.days == 0) {
        return Err(TaskError::ZeroDays);
    }
    let task = RecurringTask {
        id: uid(),
        title,
        kind,
        weekdays,
        duration_min,
        percent_tracking,
        progression,
        active: true,
    };
    let id = task.id.clone();
    state.tasks.push(task);
    Ok(id)
}

/// Remove a template. Generated instances and the progression counter
/// stay behind; future days simply stop including it.
pub fn delete_task(state: &mut SchedulerState, id: &str) -> Result<(), TaskError> {
    let i = state
        .tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
    state.tasks.remove(i);
    Ok(())
}

/// Flip a template's active flag; returns the new value
pub fn toggle_active(state: &mut SchedulerState, id: &str) -> Result<bool, TaskError> {
    let task = state
        .find_task_mut(id)
        .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
    task.active = !task.active;
    Ok(task.active)
}
