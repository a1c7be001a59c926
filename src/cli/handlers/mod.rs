use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, SecondsFormat, Utc};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::lock::FileLock;
use crate::io::recovery::{self, log_import_rejection, log_sync_rejection};
use crate::io::store::StateStore;
use crate::io::watcher::StateWatcher;
use crate::model::{MissPolicy, ProgressionSpec, Recurrence, SchedulerState};
use crate::ops::clock::{logical_date_key, parse_date_key};
use crate::ops::import::{export_state, import_state};
use crate::ops::move_ops::SendBack;
use crate::ops::rollover::{rollover_if_needed, Rollover};
use crate::ops::{backlog_ops, generate, instance_ops, move_ops, task_ops};
use crate::parse::parse_duration;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let dir = resolve_data_dir(cli.data_dir.as_deref());

    match cli.command.unwrap_or(Commands::Today(TodayArgs::default())) {
        // Read commands
        Commands::Today(args) => cmd_today(&dir, args, json),
        Commands::Backlog => cmd_backlog(&dir, json),
        Commands::Stats(args) => cmd_stats(&dir, args, json),
        Commands::Recovery(args) => cmd_recovery(&dir, args, json),
        Commands::Export(args) => cmd_export(&dir, args),

        // Write commands
        Commands::Add(args) => cmd_add(&dir, args),
        Commands::Done(args) => cmd_done(&dir, args),
        Commands::Edit(args) => cmd_edit(&dir, args),
        Commands::Rm(args) => cmd_rm(&dir, args),
        Commands::Mv(args) => cmd_mv(&dir, args),
        Commands::Plan(args) => cmd_plan(&dir, args),
        Commands::Shelve(args) => cmd_shelve(&dir, args),
        Commands::Timer(args) => cmd_timer(&dir, args),
        Commands::Task(args) => cmd_task(&dir, args, json),
        Commands::ClearExtras(args) => cmd_clear_extras(&dir, args),
        Commands::Rollover => cmd_rollover(&dir),
        Commands::Settings(args) => cmd_settings(&dir, args, json),
        Commands::Import(args) => cmd_import(&dir, args),

        // Resident mode
        Commands::Watch(args) => cmd_watch(&dir, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_data_dir(flag: Option<&str>) -> PathBuf {
    if let Some(dir) = flag {
        return PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("CADENCE_DIR")
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }
    match std::env::var("HOME") {
        Ok(home) => Path::new(&home).join(".cadence"),
        Err(_) => PathBuf::from(".cadence"),
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Lock the data directory and load state for a write command.
fn open_for_write(
    dir: &Path,
) -> Result<(FileLock, StateStore, SchedulerState), Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    let lock = FileLock::acquire_default(dir)?;
    let store = StateStore::open(dir);
    let state = store.load(now());
    Ok((lock, store, state))
}

/// Day a write command targets: an explicit (validated) date, or today
/// after settling any pending rollover.
fn target_day(
    state: &mut SchedulerState,
    date: Option<&str>,
) -> Result<String, Box<dyn std::error::Error>> {
    match date {
        Some(d) => {
            if parse_date_key(d).is_none() {
                return Err(format!("invalid date '{}' (expected YYYY-MM-DD)", d).into());
            }
            Ok(d.to_string())
        }
        None => {
            rollover_if_needed(state, now());
            Ok(state.last_date.clone())
        }
    }
}

/// Validate an optional date argument without touching state.
fn resolve_day(
    state: &SchedulerState,
    date: Option<&str>,
) -> Result<String, Box<dyn std::error::Error>> {
    match date {
        Some(d) => {
            if parse_date_key(d).is_none() {
                return Err(format!("invalid date '{}' (expected YYYY-MM-DD)", d).into());
            }
            Ok(d.to_string())
        }
        None => Ok(logical_date_key(
            now(),
            state.settings.effective_rollover_hour(),
        )),
    }
}

/// Resolve a full or prefix instance id on a day.
fn resolve_instance_id(
    state: &SchedulerState,
    key: &str,
    given: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let matches: Vec<_> = state
        .day(key)
        .iter()
        .filter(|i| i.id.starts_with(given))
        .collect();
    match matches.len() {
        0 => Err(format!("no item matching '{}' on {}", given, key).into()),
        1 => Ok(matches[0].id.clone()),
        _ => Err(format!("id prefix '{}' is ambiguous on {}", given, key).into()),
    }
}

/// Resolve a full or prefix backlog item id.
fn resolve_backlog_id(
    state: &SchedulerState,
    given: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let matches: Vec<_> = state
        .backlog
        .iter()
        .filter(|b| b.id.starts_with(given))
        .collect();
    match matches.len() {
        0 => Err(format!("no backlog item matching '{}'", given).into()),
        1 => Ok(matches[0].id.clone()),
        _ => Err(format!("id prefix '{}' is ambiguous in the backlog", given).into()),
    }
}

/// Resolve a full or prefix template id.
fn resolve_task_id(
    state: &SchedulerState,
    given: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let matches: Vec<_> = state
        .tasks
        .iter()
        .filter(|t| t.id.starts_with(given))
        .collect();
    match matches.len() {
        0 => Err(format!("no template matching '{}'", given).into()),
        1 => Ok(matches[0].id.clone()),
        _ => Err(format!("id prefix '{}' is ambiguous", given).into()),
    }
}

fn miss_policy_name(policy: MissPolicy) -> &'static str {
    match policy {
        MissPolicy::Hold => "hold",
        MissPolicy::Reset => "reset",
    }
}

fn print_day(
    state: &SchedulerState,
    key: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let items = state.day(key);
    if json {
        let out = DayJson {
            date: key.to_string(),
            items: items.iter().map(instance_to_json).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for line in format_day_listing(key, items) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_today(dir: &Path, args: TodayArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    // An explicit date is a stored view: no generation, no rollover
    if let Some(date) = args.date.as_deref() {
        if parse_date_key(date).is_none() {
            return Err(format!("invalid date '{}' (expected YYYY-MM-DD)", date).into());
        }
        let store = StateStore::open(dir);
        let state = store.load(now());
        return print_day(&state, date, json);
    }

    let (_lock, mut store, mut state) = open_for_write(dir)?;
    let rolled = rollover_if_needed(&mut state, now());
    let key = state.last_date.clone();
    let generated = generate::ensure_generated(&mut state, &key);
    if generated || rolled != Rollover::Current {
        store.save(&state);
    }
    print_day(&state, &key, json)
}

fn cmd_backlog(dir: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = StateStore::open(dir);
    let state = store.load(now());
    if json {
        let out: Vec<_> = state
            .backlog
            .iter()
            .enumerate()
            .map(|(i, item)| backlog_item_to_json(i, item))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for line in format_backlog_listing(&state.backlog) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_stats(dir: &Path, args: StatsArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = StateStore::open(dir);
    let state = store.load(now());
    let key = resolve_day(&state, args.date.as_deref())?;
    let summary = instance_ops::day_summary(&state, &key);
    if json {
        let out = SummaryJson {
            date: key,
            done: summary.done,
            total: summary.total,
            percent: summary.percent,
            est_min: summary.est_min,
            actual_min: summary.actual_min,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", format_summary(&key, &summary));
    }
    Ok(())
}

fn cmd_export(dir: &Path, args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = StateStore::open(dir);
    let state = store.load(now());
    let payload = export_state(&state)?;
    match args.file {
        Some(file) => {
            fs::write(&file, &payload)?;
            println!("exported to {}", file);
        }
        None => println!("{}", payload),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_add(dir: &Path, args: AddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, mut store, mut state) = open_for_write(dir)?;
    let est = args.time.as_deref().map(parse_duration).unwrap_or(0);

    let id = if args.backlog {
        backlog_ops::add_item(&mut state, args.title, (est > 0).then_some(est), now_ms())
    } else {
        let key = target_day(&mut state, args.date.as_deref())?;
        instance_ops::quick_add(&mut state, &key, args.title, est)
    };

    store.save(&state);
    println!("{}", id);
    Ok(())
}

fn cmd_done(dir: &Path, args: DoneArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, mut store, mut state) = open_for_write(dir)?;
    let key = target_day(&mut state, args.date.as_deref())?;
    let id = resolve_instance_id(&state, &key, &args.id)?;

    let done = instance_ops::toggle_completed(&mut state, &key, &id)?;
    store.save(&state);
    if done {
        println!("done: {}", short_id(&id));
    } else {
        println!("reopened: {}", short_id(&id));
    }
    Ok(())
}

fn cmd_edit(dir: &Path, args: EditArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, mut store, mut state) = open_for_write(dir)?;
    let est = args.time.as_deref().map(parse_duration);

    if args.backlog {
        let id = resolve_backlog_id(&state, &args.id)?;
        backlog_ops::edit_item(&mut state, &id, args.title, est)?;
        store.save(&state);
        println!("updated: {}", short_id(&id));
    } else {
        let key = target_day(&mut state, args.date.as_deref())?;
        let id = resolve_instance_id(&state, &key, &args.id)?;
        instance_ops::edit_instance(&mut state, &key, &id, args.title, est)?;
        store.save(&state);
        println!("updated: {}", short_id(&id));
    }
    Ok(())
}

fn cmd_rm(dir: &Path, args: RmArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, mut store, mut state) = open_for_write(dir)?;

    if args.backlog {
        let id = resolve_backlog_id(&state, &args.id)?;
        backlog_ops::delete_item(&mut state, &id)?;
        store.save(&state);
        println!("removed: {}", short_id(&id));
    } else {
        let key = target_day(&mut state, args.date.as_deref())?;
        let id = resolve_instance_id(&state, &key, &args.id)?;
        instance_ops::delete_instance(&mut state, &key, &id)?;
        store.save(&state);
        println!("removed: {}", short_id(&id));
    }
    Ok(())
}

fn cmd_mv(dir: &Path, args: MvArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, mut store, mut state) = open_for_write(dir)?;

    if args.backlog {
        let id = resolve_backlog_id(&state, &args.id)?;
        move_ops::reorder_backlog(&mut state, &id, args.position);
        store.save(&state);
        for line in format_backlog_listing(&state.backlog) {
            println!("{}", line);
        }
    } else {
        let key = target_day(&mut state, args.date.as_deref())?;
        let id = resolve_instance_id(&state, &key, &args.id)?;
        move_ops::reorder_today(&mut state, &key, &id, args.position);
        store.save(&state);
        for line in format_day_listing(&key, state.day(&key)) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_plan(dir: &Path, args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, mut store, mut state) = open_for_write(dir)?;
    let key = target_day(&mut state, args.date.as_deref())?;
    let id = resolve_backlog_id(&state, &args.id)?;

    let new_id = move_ops::backlog_to_today(&mut state, &key, &id, args.position)
        .ok_or_else(|| format!("no backlog item matching '{}'", args.id))?;
    store.save(&state);
    println!("{}", new_id);
    Ok(())
}

fn cmd_shelve(dir: &Path, args: ShelveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, mut store, mut state) = open_for_write(dir)?;
    let key = target_day(&mut state, args.date.as_deref())?;
    let id = resolve_instance_id(&state, &key, &args.id)?;

    match move_ops::today_to_backlog(&mut state, &key, &id, args.position.unwrap_or(0), now_ms()) {
        SendBack::Moved(backlog_id) => {
            store.save(&state);
            println!("{}", backlog_id);
            Ok(())
        }
        SendBack::KeptDaily => {
            Err("daily items cannot be shelved (deactivate the template instead)".into())
        }
        SendBack::NotFound => Err(format!("no item matching '{}' on {}", args.id, key).into()),
    }
}

fn cmd_timer(dir: &Path, args: TimerCmd) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, mut store, mut state) = open_for_write(dir)?;

    match args.action {
        TimerAction::Start(a) => {
            let key = target_day(&mut state, a.date.as_deref())?;
            let id = resolve_instance_id(&state, &key, &a.id)?;
            instance_ops::start_timer(&mut state, &key, &id, now_ms())?;
            store.save(&state);
            println!("timer started: {}", short_id(&id));
        }
        TimerAction::Stop(a) => {
            let key = target_day(&mut state, a.date.as_deref())?;
            let id = resolve_instance_id(&state, &key, &a.id)?;
            instance_ops::stop_timer(&mut state, &key, &id, now_ms())?;
            store.save(&state);
            let spent = state
                .day(&key)
                .iter()
                .find(|i| i.id == id)
                .map(|i| i.actual_min)
                .unwrap_or(0);
            println!("timer stopped: {} ({}m tracked)", short_id(&id), spent);
        }
    }
    Ok(())
}

fn cmd_task(dir: &Path, args: TaskCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match args.action {
        TaskAction::List => {
            let store = StateStore::open(dir);
            let state = store.load(now());
            if json {
                let out: Vec<_> = state
                    .tasks
                    .iter()
                    .map(|t| template_to_json(t, state.counter(&t.id)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else if state.tasks.is_empty() {
                println!("(no templates)");
            } else {
                for t in &state.tasks {
                    println!("{}", format_template_line(t, state.counter(&t.id)));
                }
            }
            Ok(())
        }
        TaskAction::Add(a) => {
            let (_lock, mut store, mut state) = open_for_write(dir)?;
            let (kind, weekdays) = match a.on.as_deref() {
                Some(days) => (Recurrence::Weekly, parse_weekdays(days)?),
                None => (Recurrence::Daily, Vec::new()),
            };
            let on_miss = a.miss.as_deref().map(parse_miss_policy).transpose()?;
            if on_miss.is_some() && a.progression.is_none() {
                return Err("--miss needs --progression".into());
            }
            let progression = a.progression.map(|days| ProgressionSpec { days, on_miss });
            let est = a.time.as_deref().map(parse_duration).unwrap_or(0);

            let id = task_ops::add_task(
                &mut state,
                a.title,
                kind,
                weekdays,
                est,
                a.percent,
                progression,
            )?;
            store.save(&state);
            println!("{}", id);
            Ok(())
        }
        TaskAction::Rm(a) => {
            let (_lock, mut store, mut state) = open_for_write(dir)?;
            let id = resolve_task_id(&state, &a.id)?;
            task_ops::delete_task(&mut state, &id)?;
            store.save(&state);
            println!("removed: {}", short_id(&id));
            Ok(())
        }
        TaskAction::Toggle(a) => {
            let (_lock, mut store, mut state) = open_for_write(dir)?;
            let id = resolve_task_id(&state, &a.id)?;
            let active = task_ops::toggle_active(&mut state, &id)?;
            store.save(&state);
            if active {
                println!("{} is now active", short_id(&id));
            } else {
                println!("{} is now inactive", short_id(&id));
            }
            Ok(())
        }
    }
}

fn cmd_clear_extras(dir: &Path, args: ClearExtrasArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, mut store, mut state) = open_for_write(dir)?;
    let key = target_day(&mut state, args.date.as_deref())?;
    let dropped = instance_ops::clear_extras(&mut state, &key);
    store.save(&state);
    println!("cleared {} extras from {}", dropped, key);
    Ok(())
}

fn cmd_rollover(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, mut store, mut state) = open_for_write(dir)?;
    match rollover_if_needed(&mut state, now()) {
        Rollover::Current => {
            println!("already on {}", state.last_date);
        }
        Rollover::Advanced {
            ended,
            today,
            counters_reset,
        } => {
            store.save(&state);
            if counters_reset > 0 {
                println!(
                    "rolled {} into {} ({} counters reset)",
                    ended, today, counters_reset
                );
            } else {
                println!("rolled {} into {}", ended, today);
            }
        }
    }
    Ok(())
}

fn cmd_settings(
    dir: &Path,
    args: SettingsArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if args.rollover_hour.is_none() && args.miss.is_none() {
        let store = StateStore::open(dir);
        let state = store.load(now());
        if json {
            let out = SettingsJson {
                rollover_hour: state.settings.effective_rollover_hour(),
                progression_miss: state.settings.progression_miss,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("rollover hour: {}", state.settings.effective_rollover_hour());
            println!("miss policy:   {}", miss_policy_name(state.settings.progression_miss));
        }
        return Ok(());
    }

    let (_lock, mut store, mut state) = open_for_write(dir)?;
    if let Some(hour) = args.rollover_hour {
        if hour > 23 {
            return Err(format!("rollover hour {} out of range (0-23)", hour).into());
        }
        state.settings.rollover_hour = hour;
    }
    if let Some(policy) = args.miss.as_deref() {
        state.settings.progression_miss = parse_miss_policy(policy)?;
    }
    store.save(&state);
    println!("settings updated");
    Ok(())
}

fn cmd_import(dir: &Path, args: ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    let _lock = FileLock::acquire_default(dir)?;
    let mut store = StateStore::open(dir);
    let raw = fs::read_to_string(&args.file)?;

    match import_state(&raw) {
        Ok(state) => {
            store.save(&state);
            println!(
                "imported {} templates, {} backlog items, {} days",
                state.tasks.len(),
                state.backlog.len(),
                state.instances_by_date.len()
            );
            Ok(())
        }
        Err(err) => {
            log_import_rejection(dir, &args.file, &err.to_string(), &raw);
            Err(err.into())
        }
    }
}

// ---------------------------------------------------------------------------
// Recovery journal
// ---------------------------------------------------------------------------

fn cmd_recovery(
    dir: &Path,
    args: RecoveryCmd,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match args.action {
        Some(RecoveryAction::Prune(p)) => {
            let dropped = recovery::prune_recovery(dir, p.all)?;
            println!("pruned {} entries", dropped);
            Ok(())
        }
        Some(RecoveryAction::Path) => {
            println!("{}", recovery::recovery_log_path(dir).display());
            Ok(())
        }
        None => {
            let limit = args.limit.or(Some(10));
            let entries = recovery::read_recovery_entries(dir, limit)?;
            if json {
                let out: Vec<_> = entries.iter().map(|e| e.to_json()).collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else if entries.is_empty() {
                println!("recovery journal is empty");
            } else {
                for e in &entries {
                    let ts = e.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
                    let cat = e.category.to_string();
                    println!("{}  {:<7} {}", ts, cat, e.description);
                    for (key, value) in &e.fields {
                        println!("    {}: {}", key, value);
                    }
                }
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Resident mode
// ---------------------------------------------------------------------------

fn cmd_watch(dir: &Path, args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    let stop = AtomicBool::new(false);
    watch_loop(dir, Duration::from_secs(args.interval.max(1)), &stop)
}

/// Resident loop: every `interval`, settle rollover under the write
/// lock; every second, poll for outside edits to the state file and
/// adopt them (echoes of our own saves are suppressed, malformed
/// payloads journaled and skipped).
pub fn watch_loop(
    dir: &Path,
    interval: Duration,
    stop: &AtomicBool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = StateStore::open(dir);
    let mut state = {
        let _lock = FileLock::acquire_default(dir)?;
        let mut state = store.load(now());
        if let Rollover::Advanced { today, .. } = rollover_if_needed(&mut state, now()) {
            store.save(&state);
            println!("rolled over to {}", today);
        }
        state
    };

    let watcher = StateWatcher::start(dir)?;
    let tick = Duration::from_secs(1);
    let mut since_check = Duration::ZERO;

    while !stop.load(Ordering::Relaxed) {
        std::thread::sleep(tick);
        since_check += tick;

        if watcher.poll()
            && let Some(raw) = store.read_raw()
            && !store.is_echo(&raw)
        {
            match import_state(&raw) {
                Ok(remote) => {
                    state = remote;
                    println!("picked up an outside edit");
                }
                Err(err) => {
                    log_sync_rejection(dir, &err.to_string(), &raw);
                }
            }
        }

        if since_check >= interval {
            since_check = Duration::ZERO;
            let Ok(_lock) = FileLock::acquire_default(dir) else {
                continue;
            };
            if let Rollover::Advanced { today, .. } = rollover_if_needed(&mut state, now()) {
                store.save(&state);
                println!("rolled over to {}", today);
            }
        }
    }
    Ok(())
}
