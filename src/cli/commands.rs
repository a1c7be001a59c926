use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cad", about = concat!("[o] cadence v", env!("CARGO_PKG_VERSION"), " - daily tasks that roll over with you"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different data directory
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show today's list (default command)
    Today(TodayArgs),
    /// List backlog items
    Backlog,
    /// Add a one-off item to today, or to the backlog
    Add(AddArgs),
    /// Toggle an item's completion
    Done(DoneArgs),
    /// Edit an item's title or estimate
    Edit(EditArgs),
    /// Remove an item
    Rm(RmArgs),
    /// Reorder an item within today or within the backlog
    Mv(MvArgs),
    /// Pull a backlog item into today
    Plan(PlanArgs),
    /// Send a today item back to the backlog
    Shelve(ShelveArgs),
    /// Start or stop an item's timer
    Timer(TimerCmd),
    /// Manage recurring task templates
    Task(TaskCmd),
    /// Remove today's one-off and backlog-sourced items
    ClearExtras(ClearExtrasArgs),
    /// Show a day's completion summary
    Stats(StatsArgs),
    /// Advance to a new day if the rollover hour has passed
    Rollover,
    /// Run resident: roll days over and follow outside edits
    Watch(WatchArgs),
    /// Show or change settings
    Settings(SettingsArgs),
    /// Write the full state as JSON
    Export(ExportArgs),
    /// Replace the full state from a JSON file
    Import(ImportArgs),
    /// View or manage the recovery journal
    Recovery(RecoveryCmd),
}

// ---------------------------------------------------------------------------
// Day view args
// ---------------------------------------------------------------------------

#[derive(Args, Default)]
pub struct TodayArgs {
    /// Show a stored day instead of today (YYYY-MM-DD); does not generate
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Day to summarize (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

// ---------------------------------------------------------------------------
// Item command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Item title
    pub title: String,
    /// Time estimate, e.g. "25m", "1.5h", "90"
    #[arg(long)]
    pub time: Option<String>,
    /// Add to the backlog instead of today
    #[arg(long)]
    pub backlog: bool,
    /// Target day (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct DoneArgs {
    /// Item ID
    pub id: String,
    /// Day the item lives on (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Item ID
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New time estimate, e.g. "25m", "1.5h"
    #[arg(long)]
    pub time: Option<String>,
    /// Edit a backlog item instead of a today item
    #[arg(long)]
    pub backlog: bool,
    /// Day the item lives on (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct RmArgs {
    /// Item ID
    pub id: String,
    /// Remove from the backlog instead of today
    #[arg(long)]
    pub backlog: bool,
    /// Day the item lives on (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Item ID
    pub id: String,
    /// Target position (0-indexed, counted before the item is lifted out)
    pub position: usize,
    /// Reorder within the backlog instead of today
    #[arg(long)]
    pub backlog: bool,
    /// Day the item lives on (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Backlog item ID
    pub id: String,
    /// Position in today's list (default: top of the incomplete block)
    pub position: Option<usize>,
    /// Target day (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct ShelveArgs {
    /// Today item ID
    pub id: String,
    /// Position in the backlog (default: top)
    pub position: Option<usize>,
    /// Day the item lives on (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct ClearExtrasArgs {
    /// Day to clear (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TimerCmd {
    #[command(subcommand)]
    pub action: TimerAction,
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start timing an item
    Start(TimerIdArgs),
    /// Stop timing and fold the elapsed time into actual minutes
    Stop(TimerIdArgs),
}

#[derive(Args)]
pub struct TimerIdArgs {
    /// Item ID
    pub id: String,
    /// Day the item lives on (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

// ---------------------------------------------------------------------------
// Template management
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TaskCmd {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a template
    Add(TaskAddArgs),
    /// List templates
    List,
    /// Delete a template (its generated items stay)
    Rm(TaskIdArgs),
    /// Flip a template between active and inactive
    Toggle(TaskIdArgs),
}

#[derive(Args)]
pub struct TaskAddArgs {
    /// Template title
    pub title: String,
    /// Weekdays for a weekly template, e.g. "mon,wed,fri" or "1,3,5".
    /// Omit for a daily template.
    #[arg(long)]
    pub on: Option<String>,
    /// Time estimate, e.g. "25m", "1.5h"
    #[arg(long)]
    pub time: Option<String>,
    /// Track percent complete on generated items
    #[arg(long)]
    pub percent: bool,
    /// Run a numbered progression of this many days
    #[arg(long, value_name = "DAYS")]
    pub progression: Option<u32>,
    /// Miss policy override for the progression: "hold" or "reset"
    #[arg(long, value_name = "POLICY")]
    pub miss: Option<String>,
}

#[derive(Args)]
pub struct TaskIdArgs {
    /// Template ID
    pub id: String,
}

// ---------------------------------------------------------------------------
// Settings, watch, state transfer
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SettingsArgs {
    /// Hour (0-23) at which a new day starts
    #[arg(long, value_name = "HOUR")]
    pub rollover_hour: Option<u32>,
    /// Default miss policy for progressions: "hold" or "reset"
    #[arg(long, value_name = "POLICY")]
    pub miss: Option<String>,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between rollover checks
    #[arg(long, default_value = "60")]
    pub interval: u64,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Destination file (default: stdout)
    pub file: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// JSON file to import
    pub file: String,
}

// ---------------------------------------------------------------------------
// Recovery journal
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries
    Prune(RecoveryPruneArgs),
    /// Print the absolute path to the journal
    Path,
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove all entries, not just old ones
    #[arg(long)]
    pub all: bool,
}
