use uuid::Uuid;

use crate::model::{BacklogItem, SchedulerState};

/// Error type for backlog operations
#[derive(Debug, thiserror::Error)]
pub enum BacklogError {
    #[error("no backlog item {0}")]
    NotFound(String),
}

fn uid() -> String {
    Uuid::new_v4().to_string()
}

/// Add an item to the top of the backlog. Returns the new item's id.
pub fn add_item(
    state: &mut SchedulerState,
    title: String,
    estimate_min: Option<u32>,
    now_ms: i64,
) -> String {
    let mut item = BacklogItem::new(uid(), title, now_ms);
    item.estimate_min = estimate_min.filter(|e| *e > 0);
    let id = item.id.clone();
    state.backlog.insert(0, item);
    id
}

/// Update title and/or estimate; an estimate of 0 clears it
pub fn edit_item(
    state: &mut SchedulerState,
    id: &str,
    title: Option<String>,
    estimate_min: Option<u32>,
) -> Result<(), BacklogError> {
    let item = state
        .backlog
        .iter_mut()
        .find(|b| b.id == id)
        .ok_or_else(|| BacklogError::NotFound(id.to_string()))?;
    if let Some(t) = title {
        item.title = t;
    }
    if let Some(e) = estimate_min {
        item.estimate_min = if e == 0 { None } else { Some(e) };
    }
    Ok(())
}

pub fn delete_item(state: &mut SchedulerState, id: &str) -> Result<(), BacklogError> {
    let i = state
        .backlog
        .iter()
        .position(|b| b.id == id)
        .ok_or_else(|| BacklogError::NotFound(id.to_string()))?;
    state.backlog.remove(i);
    Ok(())
}
