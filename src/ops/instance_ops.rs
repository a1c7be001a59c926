use uuid::Uuid;

use crate::model::{
    completed_count, renumber, repartition, Instance, InstanceSource, SchedulerState,
};
use crate::ops::{generate, progression};

/// Error type for instance operations
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("no instance {0} on {1}")]
    NotFound(String, String),
}

fn uid() -> String {
    Uuid::new_v4().to_string()
}

fn find_instance_mut<'a>(
    state: &'a mut SchedulerState,
    key: &str,
    id: &str,
) -> Result<&'a mut Instance, InstanceError> {
    state
        .day_mut(key)
        .and_then(|list| list.iter_mut().find(|i| i.id == id))
        .ok_or_else(|| InstanceError::NotFound(id.to_string(), key.to_string()))
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Flip an instance's completed flag. Completing a schedule instance
/// advances its template's progression counter; un-completing never
/// reverts one. The day list is repartitioned and renumbered afterwards.
/// Returns the new completed value.
pub fn toggle_completed(
    state: &mut SchedulerState,
    key: &str,
    id: &str,
) -> Result<bool, InstanceError> {
    let not_found = || InstanceError::NotFound(id.to_string(), key.to_string());
    let list = state.day_mut(key).ok_or_else(not_found)?;
    let inst = list.iter_mut().find(|i| i.id == id).ok_or_else(not_found)?;
    inst.completed = !inst.completed;
    let now_done = inst.completed;
    let advanced = if now_done { inst.task_id.clone() } else { None };
    repartition(list);
    if let Some(task_id) = advanced {
        progression::advance_on_completion(state, &task_id);
    }
    Ok(now_done)
}

// ---------------------------------------------------------------------------
// Add / edit / delete
// ---------------------------------------------------------------------------

/// Add a one-off instance to a day, at the boundary between the
/// completed and incomplete blocks. Generates the day first if it was
/// never touched. Returns the new instance's id.
pub fn quick_add(
    state: &mut SchedulerState,
    key: &str,
    title: String,
    duration_est: u32,
) -> String {
    generate::ensure_generated(state, key);
    let inst = Instance {
        id: uid(),
        date: key.to_string(),
        task_id: None,
        title,
        duration_est,
        percent: None,
        completed: false,
        actual_min: 0,
        order: 0,
        source: InstanceSource::Quick,
        backlog_id: None,
        timer_start_at: None,
        timer_accumulated_sec: 0,
    };
    let id = inst.id.clone();
    let list = state.instances_by_date.entry(key.to_string()).or_default();
    let at = completed_count(list);
    list.insert(at, inst);
    renumber(list);
    id
}

/// Update title and/or estimate; fields left None are untouched
pub fn edit_instance(
    state: &mut SchedulerState,
    key: &str,
    id: &str,
    title: Option<String>,
    duration_est: Option<u32>,
) -> Result<(), InstanceError> {
    let inst = find_instance_mut(state, key, id)?;
    if let Some(t) = title {
        inst.title = t;
    }
    if let Some(d) = duration_est {
        inst.duration_est = d;
    }
    Ok(())
}

pub fn delete_instance(state: &mut SchedulerState, key: &str, id: &str) -> Result<(), InstanceError> {
    let not_found = || InstanceError::NotFound(id.to_string(), key.to_string());
    let list = state.day_mut(key).ok_or_else(not_found)?;
    let i = list.iter().position(|x| x.id == id).ok_or_else(not_found)?;
    list.remove(i);
    renumber(list);
    Ok(())
}

/// Drop everything on a day that did not come from the schedule.
/// Returns how many instances were dropped.
pub fn clear_extras(state: &mut SchedulerState, key: &str) -> usize {
    let Some(list) = state.day_mut(key) else {
        return 0;
    };
    let before = list.len();
    list.retain(|i| i.source == InstanceSource::Schedule);
    renumber(list);
    before - list.len()
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

/// Start the timer if it is not already running
pub fn start_timer(
    state: &mut SchedulerState,
    key: &str,
    id: &str,
    now_ms: i64,
) -> Result<(), InstanceError> {
    let inst = find_instance_mut(state, key, id)?;
    if inst.timer_start_at.is_none() {
        inst.timer_start_at = Some(now_ms);
    }
    Ok(())
}

/// Stop a running timer, folding elapsed whole minutes into `actual_min`
/// and carrying leftover seconds. Stopping a stopped timer is a no-op.
/// Elapsed time never goes negative under clock skew.
pub fn stop_timer(
    state: &mut SchedulerState,
    key: &str,
    id: &str,
    now_ms: i64,
) -> Result<(), InstanceError> {
    let inst = find_instance_mut(state, key, id)?;
    let Some(start) = inst.timer_start_at.take() else {
        return Ok(());
    };
    let delta = ((now_ms - start) / 1000).max(0) as u32;
    let total = inst.timer_accumulated_sec + delta;
    inst.actual_min += total / 60;
    inst.timer_accumulated_sec = total % 60;
    Ok(())
}

/// Total tracked seconds, including a live timer
pub fn tracked_seconds(inst: &Instance, now_ms: i64) -> u64 {
    let base = inst.actual_min as u64 * 60 + inst.timer_accumulated_sec as u64;
    let running = inst
        .timer_start_at
        .map(|s| ((now_ms - s) / 1000).max(0) as u64)
        .unwrap_or(0);
    base + running
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Completion roll-up for one day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub done: usize,
    pub total: usize,
    /// Rounded percent complete; 0 for an empty day
    pub percent: u32,
    pub est_min: u32,
    pub actual_min: u32,
}

pub fn day_summary(state: &SchedulerState, key: &str) -> DaySummary {
    let list = state.day(key);
    let done = completed_count(list);
    let total = list.len();
    let percent = if total == 0 {
        0
    } else {
        (done as f64 / total as f64 * 100.0).round() as u32
    };
    DaySummary {
        done,
        total,
        percent,
        est_min: list.iter().map(|i| i.duration_est).sum(),
        actual_min: list.iter().map(|i| i.actual_min).sum(),
    }
}
