use serde::Serialize;

use crate::model::{BacklogItem, Instance, InstanceSource, MissPolicy, Recurrence, RecurringTask};
use crate::ops::clock::parse_date_key;
use crate::ops::instance_ops::DaySummary;
use crate::parse::minutes_to_string;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct InstanceJson {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub source: InstanceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    pub est_min: u32,
    pub actual_min: u32,
    pub timer_running: bool,
}

#[derive(Serialize)]
pub struct DayJson {
    pub date: String,
    pub items: Vec<InstanceJson>,
}

#[derive(Serialize)]
pub struct BacklogItemJson {
    pub index: usize,
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_min: Option<u32>,
    pub created_at: i64,
}

#[derive(Serialize)]
pub struct TemplateJson {
    pub id: String,
    pub title: String,
    pub kind: Recurrence,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<u8>,
    pub est_min: u32,
    pub percent_tracking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progression: Option<ProgressionJson>,
    pub active: bool,
}

#[derive(Serialize)]
pub struct ProgressionJson {
    pub days: u32,
    pub counter: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_miss: Option<MissPolicy>,
}

#[derive(Serialize)]
pub struct SummaryJson {
    pub date: String,
    pub done: usize,
    pub total: usize,
    pub percent: u32,
    pub est_min: u32,
    pub actual_min: u32,
}

#[derive(Serialize)]
pub struct SettingsJson {
    pub rollover_hour: u32,
    pub progression_miss: MissPolicy,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn instance_to_json(inst: &Instance) -> InstanceJson {
    InstanceJson {
        index: inst.order,
        id: inst.id.clone(),
        title: inst.title.clone(),
        completed: inst.completed,
        source: inst.source,
        task_id: inst.task_id.clone(),
        percent: inst.percent,
        est_min: inst.duration_est,
        actual_min: inst.actual_min,
        timer_running: inst.timer_running(),
    }
}

pub fn backlog_item_to_json(index: usize, item: &BacklogItem) -> BacklogItemJson {
    BacklogItemJson {
        index,
        id: item.id.clone(),
        title: item.title.clone(),
        estimate_min: item.estimate_min,
        created_at: item.created_at,
    }
}

pub fn template_to_json(task: &RecurringTask, counter: u32) -> TemplateJson {
    TemplateJson {
        id: task.id.clone(),
        title: task.title.clone(),
        kind: task.kind,
        weekdays: task.weekdays.clone(),
        est_min: task.duration_min,
        percent_tracking: task.percent_tracking,
        progression: task.progression.map(|p| ProgressionJson {
            days: p.days,
            counter,
            on_miss: p.on_miss,
        }),
        active: task.active,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// First eight characters of an item id, enough to address it uniquely
/// on a normal day.
pub fn short_id(id: &str) -> &str {
    if id.len() > 8 { &id[..8] } else { id }
}

fn checkbox_char(inst: &Instance) -> char {
    if inst.completed {
        'x'
    } else if inst.timer_running() {
        '>'
    } else {
        ' '
    }
}

/// Format a single today item as a one-line summary
pub fn format_instance_line(inst: &Instance) -> String {
    let est = if inst.duration_est > 0 {
        format!(" ({})", minutes_to_string(inst.duration_est))
    } else {
        String::new()
    };
    let spent = if inst.actual_min > 0 {
        format!("  spent {}", minutes_to_string(inst.actual_min))
    } else {
        String::new()
    };
    let pct = match inst.percent {
        Some(p) => format!("  {}%", p),
        None => String::new(),
    };
    format!(
        "{:>2} [{}] {}  {}{}{}{}",
        inst.order,
        checkbox_char(inst),
        short_id(&inst.id),
        inst.title,
        est,
        pct,
        spent
    )
}

/// Format a day's listing: header plus one line per item
pub fn format_day_listing(date: &str, items: &[Instance]) -> Vec<String> {
    let header = match parse_date_key(date) {
        Some(d) => format!("== {} ==", d.format("%a %Y-%m-%d")),
        None => format!("== {} ==", date),
    };
    let mut lines = vec![header, String::new()];
    if items.is_empty() {
        lines.push("(nothing scheduled)".to_string());
        return lines;
    }
    for inst in items {
        lines.push(format_instance_line(inst));
    }
    lines
}

/// Format the backlog listing
pub fn format_backlog_listing(items: &[BacklogItem]) -> Vec<String> {
    if items.is_empty() {
        return vec!["(backlog is empty)".to_string()];
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let est = match item.estimate_min {
                Some(m) => format!(" ({})", minutes_to_string(m)),
                None => String::new(),
            };
            format!("{:>2} {}  {}{}", i, short_id(&item.id), item.title, est)
        })
        .collect()
}

/// Format a template as a one-line summary
pub fn format_template_line(task: &RecurringTask, counter: u32) -> String {
    let schedule = match task.kind {
        Recurrence::Daily => "daily".to_string(),
        Recurrence::Weekly => format!("weekly on {}", weekday_names(&task.weekdays)),
    };
    let est = if task.duration_min > 0 {
        format!(" ({})", minutes_to_string(task.duration_min))
    } else {
        String::new()
    };
    let run = match task.progression {
        Some(p) => {
            let policy = match p.on_miss {
                Some(MissPolicy::Reset) => ", miss: reset",
                Some(MissPolicy::Hold) => ", miss: hold",
                None => "",
            };
            format!("  [day {}/{}{}]", counter, p.days, policy)
        }
        None => String::new(),
    };
    let idle = if task.active { "" } else { "  (inactive)" };
    format!(
        "{}  {}  {}{}{}{}",
        short_id(&task.id),
        task.title,
        schedule,
        est,
        run,
        idle
    )
}

/// Format a day summary as one line
pub fn format_summary(date: &str, s: &DaySummary) -> String {
    let mut line = format!("{}: {}/{} done ({}%)", date, s.done, s.total, s.percent);
    if s.est_min > 0 {
        line.push_str(&format!(", est {}", minutes_to_string(s.est_min)));
    }
    if s.actual_min > 0 {
        line.push_str(&format!(", spent {}", minutes_to_string(s.actual_min)));
    }
    line
}

const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

fn weekday_names(days: &[u8]) -> String {
    days.iter()
        .map(|d| match WEEKDAY_NAMES.get(*d as usize) {
            Some(name) => name.to_string(),
            None => d.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

/// Parse a miss policy string
pub fn parse_miss_policy(s: &str) -> Result<MissPolicy, String> {
    match s {
        "hold" => Ok(MissPolicy::Hold),
        "reset" => Ok(MissPolicy::Reset),
        _ => Err(format!("unknown miss policy '{}' (expected: hold, reset)", s)),
    }
}

/// Parse a comma-separated weekday list: names ("mon,wed") or indices
/// ("1,3"), 0 = Sunday
pub fn parse_weekdays(s: &str) -> Result<Vec<u8>, String> {
    let mut days = Vec::new();
    for part in s.split(',') {
        let part = part.trim().to_lowercase();
        if part.is_empty() {
            continue;
        }
        let day = if let Ok(n) = part.parse::<u8>() {
            if n > 6 {
                return Err(format!("weekday index {} out of range (0-6)", n));
            }
            n
        } else {
            match WEEKDAY_NAMES.iter().position(|name| part.starts_with(name)) {
                Some(i) => i as u8,
                None => return Err(format!("unknown weekday '{}'", part)),
            }
        };
        if !days.contains(&day) {
            days.push(day);
        }
    }
    if days.is_empty() {
        return Err("no weekdays given".to_string());
    }
    Ok(days)
}
