use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{BacklogItem, Instance, RecurringTask, Settings};

/// The whole scheduler state, persisted and synced as one aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerState {
    /// Recurring templates
    #[serde(default)]
    pub tasks: Vec<RecurringTask>,
    /// Undated backlog
    #[serde(default)]
    pub backlog: Vec<BacklogItem>,
    /// Instances keyed by date key, in first-touch order
    #[serde(default)]
    pub instances_by_date: IndexMap<String, Vec<Instance>>,
    /// Progression counters keyed by template id; absent reads as 1
    #[serde(default)]
    pub progression: IndexMap<String, u32>,
    #[serde(default)]
    pub settings: Settings,
    /// The logical date this state last observed
    #[serde(default)]
    pub last_date: String,
}

impl SchedulerState {
    /// Instances for a date, empty if the date was never touched
    pub fn day(&self, key: &str) -> &[Instance] {
        self.instances_by_date
            .get(key)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Mutable day list, None if the date was never touched
    pub fn day_mut(&mut self, key: &str) -> Option<&mut Vec<Instance>> {
        self.instances_by_date.get_mut(key)
    }

    pub fn find_task(&self, id: &str) -> Option<&RecurringTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_task_mut(&mut self, id: &str) -> Option<&mut RecurringTask> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Progression counter for a template, defaulting to 1 when unset
    pub fn counter(&self, task_id: &str) -> u32 {
        self.progression.get(task_id).copied().unwrap_or(1)
    }
}

/// Rewrite `order` fields to match array positions
pub fn renumber(list: &mut [Instance]) {
    for (i, inst) in list.iter_mut().enumerate() {
        inst.order = i;
    }
}

/// Number of completed instances in a day list
pub fn completed_count(list: &[Instance]) -> usize {
    list.iter().filter(|i| i.completed).count()
}

/// Restore the completed-prefix partition, keeping relative order on
/// both sides, and renumber
pub fn repartition(list: &mut [Instance]) {
    list.sort_by_key(|i| !i.completed);
    renumber(list);
}
