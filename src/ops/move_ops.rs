use uuid::Uuid;

use crate::model::{
    completed_count, renumber, BacklogItem, Instance, InstanceSource, Recurrence, SchedulerState,
};
use crate::ops::generate;

/// Outcome of sending a day instance back to the backlog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendBack {
    /// Landed in the backlog under this id
    Moved(String),
    /// Daily schedule instances stay on their day
    KeptDaily,
    NotFound,
}

fn uid() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Reorder
// ---------------------------------------------------------------------------

/// Reorder an instance within its day list. `target_index` is the
/// desired slot with the instance still in place; it is clamped into
/// range, adjusted for the removal, and finally clamped into the
/// instance's partition block. Returns whether the instance was found.
pub fn reorder_today(
    state: &mut SchedulerState,
    key: &str,
    id: &str,
    target_index: usize,
) -> bool {
    let Some(list) = state.day_mut(key) else {
        return false;
    };
    let Some(i) = list.iter().position(|x| x.id == id) else {
        return false;
    };
    let mut idx = target_index.min(list.len());
    let inst = list.remove(i);
    if i < idx {
        idx -= 1;
    }
    let boundary = completed_count(list);
    if inst.completed {
        idx = idx.min(boundary);
    } else {
        idx = idx.max(boundary);
    }
    list.insert(idx, inst);
    renumber(list);
    true
}

/// Reorder a backlog item; same slot semantics as [`reorder_today`]
pub fn reorder_backlog(state: &mut SchedulerState, id: &str, target_index: usize) -> bool {
    let Some(i) = state.backlog.iter().position(|b| b.id == id) else {
        return false;
    };
    let mut idx = target_index.min(state.backlog.len());
    let item = state.backlog.remove(i);
    if i < idx {
        idx -= 1;
    }
    state.backlog.insert(idx, item);
    true
}

// ---------------------------------------------------------------------------
// Across lists
// ---------------------------------------------------------------------------

/// Pull a backlog item onto a day. The item is consumed and the new
/// instance remembers it via `backlog_id`. `at_index` defaults to the
/// completed boundary and is otherwise clamped into the incomplete
/// region. A missing item changes nothing. Returns the instance's id.
pub fn backlog_to_today(
    state: &mut SchedulerState,
    key: &str,
    item_id: &str,
    at_index: Option<usize>,
) -> Option<String> {
    let i = state.backlog.iter().position(|b| b.id == item_id)?;
    generate::ensure_generated(state, key);
    let item = state.backlog.remove(i);
    let inst = Instance {
        id: uid(),
        date: key.to_string(),
        task_id: None,
        title: item.title,
        duration_est: item.estimate_min.unwrap_or(0),
        percent: None,
        completed: false,
        actual_min: 0,
        order: 0,
        source: InstanceSource::Backlog,
        backlog_id: Some(item.id),
        timer_start_at: None,
        timer_accumulated_sec: 0,
    };
    let id = inst.id.clone();
    let list = state.instances_by_date.entry(key.to_string()).or_default();
    let boundary = completed_count(list);
    let mut idx = at_index.map_or(boundary, |n| n.min(list.len()));
    if idx < boundary {
        idx = boundary;
    }
    list.insert(idx, inst);
    renumber(list);
    Some(id)
}

fn insert_backlog_item(
    state: &mut SchedulerState,
    id: String,
    inst: &Instance,
    target_index: usize,
    now_ms: i64,
) {
    let item = BacklogItem {
        id,
        title: inst.title.clone(),
        estimate_min: if inst.duration_est > 0 {
            Some(inst.duration_est)
        } else {
            None
        },
        created_at: now_ms,
    };
    let at = target_index.min(state.backlog.len());
    state.backlog.insert(at, item);
}

/// Send a day instance back to the backlog, landing at `target_index`
/// (clamped). Daily schedule instances are kept on their day. The
/// backlog identity is preserved: a live item is relocated, a remembered
/// id is recreated, and only an instance with no backlog past mints a
/// fresh id. Exactly one item per identity results.
pub fn today_to_backlog(
    state: &mut SchedulerState,
    key: &str,
    id: &str,
    target_index: usize,
    now_ms: i64,
) -> SendBack {
    let Some(i) = state.day(key).iter().position(|x| x.id == id) else {
        return SendBack::NotFound;
    };
    let inst = state.day(key)[i].clone();
    if let Some(task_id) = &inst.task_id {
        if state
            .find_task(task_id)
            .is_some_and(|t| t.kind == Recurrence::Daily)
        {
            return SendBack::KeptDaily;
        }
    }

    let landed = if let Some(bid) = inst.backlog_id.clone() {
        if let Some(existing) = state.backlog.iter().position(|b| b.id == bid) {
            let item = state.backlog.remove(existing);
            let at = target_index.min(state.backlog.len());
            state.backlog.insert(at, item);
        } else {
            insert_backlog_item(state, bid.clone(), &inst, target_index, now_ms);
        }
        bid
    } else {
        let fresh = uid();
        insert_backlog_item(state, fresh.clone(), &inst, target_index, now_ms);
        fresh
    };

    if let Some(list) = state.day_mut(key) {
        list.remove(i);
        renumber(list);
    }
    SendBack::Moved(landed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecurringTask;

    const DAY: &str = "2026-01-05";

    fn inst(id: &str, completed: bool) -> Instance {
        Instance {
            id: id.to_string(),
            date: DAY.to_string(),
            task_id: None,
            title: format!("inst {id}"),
            duration_est: 0,
            percent: None,
            completed,
            actual_min: 0,
            order: 0,
            source: InstanceSource::Quick,
            backlog_id: None,
            timer_start_at: None,
            timer_accumulated_sec: 0,
        }
    }

    fn item(id: &str) -> BacklogItem {
        BacklogItem::new(id.to_string(), format!("item {id}"), 100)
    }

    fn day_state(mut list: Vec<Instance>) -> SchedulerState {
        renumber(&mut list);
        let mut state = SchedulerState::default();
        state.instances_by_date.insert(DAY.to_string(), list);
        state
    }

    fn day_ids(state: &SchedulerState) -> Vec<&str> {
        state.day(DAY).iter().map(|i| i.id.as_str()).collect()
    }

    fn backlog_ids(state: &SchedulerState) -> Vec<&str> {
        state.backlog.iter().map(|b| b.id.as_str()).collect()
    }

    fn orders_contiguous(state: &SchedulerState) -> bool {
        state.day(DAY).iter().enumerate().all(|(n, i)| i.order == n)
    }

    // --- Reorder within a day ---

    #[test]
    fn reorder_moves_down_past_followers() {
        let mut state = day_state(vec![inst("a", false), inst("b", false), inst("c", false)]);
        assert!(reorder_today(&mut state, DAY, "a", 2));
        assert_eq!(day_ids(&state), vec!["b", "a", "c"]);
        assert!(orders_contiguous(&state));
    }

    #[test]
    fn reorder_to_len_moves_to_end() {
        let mut state = day_state(vec![inst("a", false), inst("b", false), inst("c", false)]);
        assert!(reorder_today(&mut state, DAY, "a", 3));
        assert_eq!(day_ids(&state), vec!["b", "c", "a"]);
    }

    #[test]
    fn reorder_moves_up() {
        let mut state = day_state(vec![inst("a", false), inst("b", false), inst("c", false)]);
        assert!(reorder_today(&mut state, DAY, "c", 0));
        assert_eq!(day_ids(&state), vec!["c", "a", "b"]);
    }

    #[test]
    fn reorder_clamps_wild_target() {
        let mut state = day_state(vec![inst("a", false), inst("b", false)]);
        assert!(reorder_today(&mut state, DAY, "a", 99));
        assert_eq!(day_ids(&state), vec!["b", "a"]);
    }

    #[test]
    fn incomplete_cannot_enter_completed_block() {
        let mut state = day_state(vec![
            inst("c1", true),
            inst("c2", true),
            inst("t1", false),
            inst("t2", false),
        ]);
        assert!(reorder_today(&mut state, DAY, "t2", 0));
        assert_eq!(day_ids(&state), vec!["c1", "c2", "t2", "t1"]);
        assert!(orders_contiguous(&state));
    }

    #[test]
    fn completed_cannot_enter_incomplete_block() {
        let mut state = day_state(vec![
            inst("c1", true),
            inst("c2", true),
            inst("t1", false),
            inst("t2", false),
        ]);
        assert!(reorder_today(&mut state, DAY, "c1", 4));
        assert_eq!(day_ids(&state), vec!["c2", "c1", "t1", "t2"]);
        assert!(orders_contiguous(&state));
    }

    #[test]
    fn reorder_within_completed_block() {
        let mut state = day_state(vec![inst("c1", true), inst("c2", true), inst("t1", false)]);
        assert!(reorder_today(&mut state, DAY, "c2", 0));
        assert_eq!(day_ids(&state), vec!["c2", "c1", "t1"]);
    }

    #[test]
    fn reorder_unknown_is_rejected() {
        let mut state = day_state(vec![inst("a", false)]);
        assert!(!reorder_today(&mut state, DAY, "ghost", 0));
        assert!(!reorder_today(&mut state, "2099-01-01", "a", 0));
        assert_eq!(day_ids(&state), vec!["a"]);
    }

    // --- Reorder within backlog ---

    #[test]
    fn backlog_reorder_down_and_up() {
        let mut state = SchedulerState::default();
        state.backlog = vec![item("x"), item("y"), item("z")];
        assert!(reorder_backlog(&mut state, "x", 2));
        assert_eq!(backlog_ids(&state), vec!["y", "x", "z"]);
        assert!(reorder_backlog(&mut state, "z", 0));
        assert_eq!(backlog_ids(&state), vec!["z", "y", "x"]);
    }

    #[test]
    fn backlog_reorder_clamps() {
        let mut state = SchedulerState::default();
        state.backlog = vec![item("x"), item("y")];
        assert!(reorder_backlog(&mut state, "x", 50));
        assert_eq!(backlog_ids(&state), vec!["y", "x"]);
    }

    #[test]
    fn backlog_reorder_unknown_is_rejected() {
        let mut state = SchedulerState::default();
        state.backlog = vec![item("x")];
        assert!(!reorder_backlog(&mut state, "ghost", 0));
        assert_eq!(backlog_ids(&state), vec!["x"]);
    }

    // --- Backlog to today ---

    #[test]
    fn pull_lands_at_completed_boundary_by_default() {
        let mut state = day_state(vec![inst("c1", true), inst("t1", false)]);
        let mut it = item("b1");
        it.estimate_min = Some(25);
        state.backlog.push(it);

        let id = backlog_to_today(&mut state, DAY, "b1", None).unwrap();
        assert_eq!(day_ids(&state), vec!["c1", id.as_str(), "t1"]);
        let pulled = &state.day(DAY)[1];
        assert_eq!(pulled.source, InstanceSource::Backlog);
        assert_eq!(pulled.backlog_id.as_deref(), Some("b1"));
        assert_eq!(pulled.duration_est, 25);
        assert_eq!(pulled.task_id, None);
        assert!(state.backlog.is_empty());
        assert!(orders_contiguous(&state));
    }

    #[test]
    fn pull_index_is_raised_into_incomplete_region() {
        let mut state = day_state(vec![inst("c1", true), inst("t1", false)]);
        state.backlog.push(item("b1"));
        let id = backlog_to_today(&mut state, DAY, "b1", Some(0)).unwrap();
        assert_eq!(day_ids(&state), vec!["c1", id.as_str(), "t1"]);
    }

    #[test]
    fn pull_index_clamps_to_end() {
        let mut state = day_state(vec![inst("t1", false)]);
        state.backlog.push(item("b1"));
        let id = backlog_to_today(&mut state, DAY, "b1", Some(9)).unwrap();
        assert_eq!(day_ids(&state), vec!["t1", id.as_str()]);
    }

    #[test]
    fn pull_generates_untouched_day_first() {
        let mut state = SchedulerState::default();
        state
            .tasks
            .push(RecurringTask::daily("t1".into(), "read".into()));
        state.backlog.push(item("b1"));
        backlog_to_today(&mut state, DAY, "b1", None).unwrap();
        assert_eq!(state.day(DAY).len(), 2);
        assert_eq!(state.day(DAY)[0].task_id.as_deref(), Some("t1"));
        assert_eq!(state.day(DAY)[1].backlog_id.as_deref(), Some("b1"));
    }

    #[test]
    fn pull_of_missing_item_changes_nothing() {
        let mut state = SchedulerState::default();
        state
            .tasks
            .push(RecurringTask::daily("t1".into(), "read".into()));
        assert_eq!(backlog_to_today(&mut state, DAY, "ghost", None), None);
        // not even generation ran
        assert!(state.instances_by_date.is_empty());
    }

    #[test]
    fn pull_without_estimate_reads_zero() {
        let mut state = day_state(vec![]);
        state.backlog.push(item("b1"));
        backlog_to_today(&mut state, DAY, "b1", None).unwrap();
        assert_eq!(state.day(DAY)[0].duration_est, 0);
    }

    // --- Today to backlog ---

    #[test]
    fn daily_schedule_instance_is_kept() {
        let mut state = day_state(vec![]);
        state
            .tasks
            .push(RecurringTask::daily("t1".into(), "read".into()));
        let mut sched = inst("i1", false);
        sched.task_id = Some("t1".to_string());
        sched.source = InstanceSource::Schedule;
        state.day_mut(DAY).unwrap().push(sched);

        assert_eq!(
            today_to_backlog(&mut state, DAY, "i1", 0, 500),
            SendBack::KeptDaily
        );
        assert_eq!(day_ids(&state), vec!["i1"]);
        assert!(state.backlog.is_empty());
    }

    #[test]
    fn weekly_schedule_instance_moves_out() {
        let mut state = day_state(vec![]);
        state.tasks.push(RecurringTask::weekly(
            "t1".into(),
            "gym".into(),
            vec![1],
        ));
        let mut sched = inst("i1", false);
        sched.task_id = Some("t1".to_string());
        sched.duration_est = 60;
        state.day_mut(DAY).unwrap().push(sched);

        let SendBack::Moved(bid) = today_to_backlog(&mut state, DAY, "i1", 0, 500) else {
            panic!("expected a move");
        };
        assert!(state.day(DAY).is_empty());
        assert_eq!(state.backlog[0].id, bid);
        assert_eq!(state.backlog[0].estimate_min, Some(60));
        assert_eq!(state.backlog[0].created_at, 500);
    }

    #[test]
    fn orphaned_schedule_instance_moves_out() {
        // template was deleted since generation
        let mut state = day_state(vec![]);
        let mut sched = inst("i1", false);
        sched.task_id = Some("gone".to_string());
        state.day_mut(DAY).unwrap().push(sched);

        assert!(matches!(
            today_to_backlog(&mut state, DAY, "i1", 0, 500),
            SendBack::Moved(_)
        ));
    }

    #[test]
    fn send_back_relocates_live_item() {
        let mut came_back = inst("i1", false);
        came_back.backlog_id = Some("b1".to_string());
        let mut state = day_state(vec![came_back]);
        state.backlog = vec![item("b1"), item("b2")];

        assert_eq!(
            today_to_backlog(&mut state, DAY, "i1", 1, 500),
            SendBack::Moved("b1".to_string())
        );
        assert_eq!(backlog_ids(&state), vec!["b2", "b1"]);
        assert!(state.day(DAY).is_empty());
    }

    #[test]
    fn send_back_recreates_remembered_identity() {
        let mut came_back = inst("i1", false);
        came_back.backlog_id = Some("b1".to_string());
        came_back.duration_est = 15;
        let mut state = day_state(vec![came_back]);
        state.backlog = vec![item("b2")];

        assert_eq!(
            today_to_backlog(&mut state, DAY, "i1", 0, 777),
            SendBack::Moved("b1".to_string())
        );
        assert_eq!(backlog_ids(&state), vec!["b1", "b2"]);
        assert_eq!(state.backlog[0].estimate_min, Some(15));
        assert_eq!(state.backlog[0].created_at, 777);
    }

    #[test]
    fn send_back_mints_id_for_quick_instance() {
        let mut state = day_state(vec![inst("i1", false)]);
        let SendBack::Moved(bid) = today_to_backlog(&mut state, DAY, "i1", 0, 500) else {
            panic!("expected a move");
        };
        assert_eq!(state.backlog.len(), 1);
        assert_eq!(state.backlog[0].id, bid);
        // zero duration means no estimate
        assert_eq!(state.backlog[0].estimate_min, None);
    }

    #[test]
    fn send_back_renumbers_the_day() {
        let mut state = day_state(vec![inst("a", false), inst("b", false), inst("c", false)]);
        today_to_backlog(&mut state, DAY, "b", 0, 500);
        assert_eq!(day_ids(&state), vec!["a", "c"]);
        assert!(orders_contiguous(&state));
    }

    #[test]
    fn send_back_of_unknown_instance() {
        let mut state = day_state(vec![]);
        assert_eq!(
            today_to_backlog(&mut state, DAY, "ghost", 0, 500),
            SendBack::NotFound
        );
    }

    #[test]
    fn send_back_clamps_backlog_index() {
        let mut state = day_state(vec![inst("i1", false)]);
        state.backlog = vec![item("b2")];
        let SendBack::Moved(bid) = today_to_backlog(&mut state, DAY, "i1", 42, 500) else {
            panic!("expected a move");
        };
        assert_eq!(backlog_ids(&state), vec!["b2", bid.as_str()]);
    }
}
