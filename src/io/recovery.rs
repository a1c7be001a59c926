use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tempfile::NamedTempFile;

/// Journal size that triggers an inline trim on the next append (1 MB).
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Entries older than this are dropped by `prune_recovery`.
pub const PRUNE_AGE_DAYS: i64 = 30;

const FILE_HEADER: &str = "<!--\n  cadence recovery journal (append-only)\n\n  Payloads the scheduler could not load, save, or apply are preserved\n  here so nothing is silently lost. Inspect with `cad recovery`;\n  drop old entries with `cad recovery prune`.\n-->\n\n";

// --- entry model ---

/// What kind of failure produced a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// The state file existed but could not be parsed.
    Load,
    /// A save did not reach disk.
    Write,
    /// An import payload was rejected before applying.
    Import,
    /// A remote snapshot could not be applied.
    Sync,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecoveryCategory::Load => "load",
            RecoveryCategory::Write => "write",
            RecoveryCategory::Import => "import",
            RecoveryCategory::Sync => "sync",
        };
        write!(f, "{name}")
    }
}

fn parse_category(s: &str) -> Option<RecoveryCategory> {
    match s {
        "load" => Some(RecoveryCategory::Load),
        "write" => Some(RecoveryCategory::Write),
        "import" => Some(RecoveryCategory::Import),
        "sync" => Some(RecoveryCategory::Sync),
        _ => None,
    }
}

/// One preserved failure: when it happened, what went wrong, and the
/// payload that would otherwise have been lost.
#[derive(Debug, Clone)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

impl RecoveryEntry {
    pub fn new(category: RecoveryCategory, description: &str) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            category,
            description: description.to_string(),
            fields: Vec::new(),
            body: String::new(),
        }
    }

    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "## {} — {}: {}\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.category,
            self.description
        ));
        if !self.fields.is_empty() {
            out.push('\n');
            for (key, value) in &self.fields {
                out.push_str(&format!("{key}: {value}\n"));
            }
        }
        if !self.body.is_empty() {
            out.push_str("\n```text\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }
        out.push_str("\n---\n");
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            "category": self.category.to_string(),
            "description": self.description,
            "fields": self.fields.iter().map(|(k, v)| {
                serde_json::json!({ "key": k, "value": v })
            }).collect::<Vec<_>>(),
            "body": self.body,
        })
    }
}

// --- paths ---

pub fn recovery_log_path(dir: &Path) -> PathBuf {
    dir.join(".recovery.md")
}

// --- writing ---

/// Append an entry to the journal. Journaling is best effort: failures
/// are reported on stderr and never propagate to the caller.
pub fn log_recovery(dir: &Path, entry: RecoveryEntry) {
    if let Err(err) = log_recovery_inner(dir, &entry) {
        eprintln!(
            "warning: could not record {} entry in recovery journal: {err}",
            entry.category
        );
    }
}

fn log_recovery_inner(dir: &Path, entry: &RecoveryEntry) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let path = recovery_log_path(dir);

    if let Ok(meta) = fs::metadata(&path) {
        if meta.len() > MAX_LOG_SIZE {
            try_inline_trim(&path);
        }
    }

    let needs_header = match fs::metadata(&path) {
        Ok(meta) => meta.len() == 0,
        Err(_) => true,
    };

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())?;
    Ok(())
}

/// Drop entries past the prune age so the journal stays bounded. Holds
/// the cross-process lock non-blockingly; if another process has it,
/// skip and let a later append retry.
fn try_inline_trim(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let Ok(file) = File::open(path) else { return };
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            return;
        }
        let cutoff = Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS);
        let _ = prune_entries_before(path, cutoff);
        unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    }
    #[cfg(not(unix))]
    {
        let cutoff = Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS);
        let _ = prune_entries_before(path, cutoff);
    }
}

// --- domain helpers ---

/// Preserve a state file that failed to parse before falling open to a
/// fresh state.
pub fn log_load_failure(dir: &Path, path: &Path, err: &str, raw: &str) {
    let entry = RecoveryEntry::new(
        RecoveryCategory::Load,
        "state file could not be parsed",
    )
    .field("File", &path.display().to_string())
    .field("Error", err)
    .body(raw);
    log_recovery(dir, entry);
}

/// Preserve the serialized state when a save fails, so the day's work
/// survives the process.
pub fn log_write_failure(dir: &Path, err: &str, payload: &str) {
    let entry = RecoveryEntry::new(RecoveryCategory::Write, "state save failed")
        .field("Error", err)
        .body(payload);
    log_recovery(dir, entry);
}

/// Preserve an import payload rejected by shape validation.
pub fn log_import_rejection(dir: &Path, source: &str, err: &str, payload: &str) {
    let entry = RecoveryEntry::new(RecoveryCategory::Import, "import rejected")
        .field("Source", source)
        .field("Error", err)
        .body(payload);
    log_recovery(dir, entry);
}

/// Preserve a remote snapshot that arrived malformed.
pub fn log_sync_rejection(dir: &Path, err: &str, payload: &str) {
    let entry = RecoveryEntry::new(RecoveryCategory::Sync, "remote snapshot rejected")
        .field("Error", err)
        .body(payload);
    log_recovery(dir, entry);
}

// --- reading ---

/// Read journal entries, newest first. `limit` keeps only the most
/// recent entries.
pub fn read_recovery_entries(
    dir: &Path,
    limit: Option<usize>,
) -> std::io::Result<Vec<RecoveryEntry>> {
    let path = recovery_log_path(dir);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut content = String::new();
    File::open(&path)?.read_to_string(&mut content)?;

    let mut entries = parse_entries(&content);
    if let Some(n) = limit {
        let len = entries.len();
        if len > n {
            entries.drain(..len - n);
        }
    }
    entries.reverse();
    Ok(entries)
}

fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    let mut current: Option<RecoveryEntry> = None;
    let mut in_code_block = false;

    for line in content.lines() {
        if line.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            if let Some(entry) = current.as_mut() {
                if !entry.body.is_empty() {
                    entry.body.push('\n');
                }
                entry.body.push_str(line);
            }
            continue;
        }
        if let Some(header) = line.strip_prefix("## ") {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            current = parse_entry_header(header);
            continue;
        }
        if line == "---" {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            continue;
        }
        if let Some(entry) = current.as_mut() {
            if let Some((key, value)) = line.split_once(": ") {
                entry.fields.push((key.to_string(), value.to_string()));
            }
        }
    }
    if let Some(entry) = current.take() {
        entries.push(entry);
    }
    entries
}

fn parse_entry_header(header: &str) -> Option<RecoveryEntry> {
    let (ts_str, rest) = header.split_once(" — ")?;
    let (cat_str, desc) = rest.split_once(": ")?;
    let timestamp = DateTime::parse_from_rfc3339(ts_str).ok()?.with_timezone(&Utc);
    let category = parse_category(cat_str)?;
    Some(RecoveryEntry {
        timestamp,
        category,
        description: desc.to_string(),
        fields: Vec::new(),
        body: String::new(),
    })
}

// --- pruning ---

/// Remove entries older than `PRUNE_AGE_DAYS`, or everything when `all`
/// is set. Returns the number of entries dropped.
pub fn prune_recovery(dir: &Path, all: bool) -> std::io::Result<usize> {
    let path = recovery_log_path(dir);
    if !path.exists() {
        return Ok(0);
    }

    #[cfg(unix)]
    let _guard = {
        use std::os::unix::io::AsRawFd;
        let file = File::open(&path)?;
        let mut acquired = false;
        for _ in 0..10 {
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if rc == 0 {
                acquired = true;
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        if !acquired {
            return Err(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "recovery journal is locked by another process",
            ));
        }
        file
    };

    if all {
        let mut content = String::new();
        File::open(&path)?.read_to_string(&mut content)?;
        let count = parse_entries(&content).len();
        atomic_write(&path, FILE_HEADER)?;
        return Ok(count);
    }

    let cutoff = Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS);
    prune_entries_before(&path, cutoff)
}

fn prune_entries_before(path: &Path, cutoff: DateTime<Utc>) -> std::io::Result<usize> {
    let mut content = String::new();
    File::open(path)?.read_to_string(&mut content)?;

    let entries = parse_entries(&content);
    let total = entries.len();
    let kept: Vec<&RecoveryEntry> = entries.iter().filter(|e| e.timestamp >= cutoff).collect();
    let dropped = total - kept.len();
    if dropped == 0 {
        return Ok(0);
    }

    let mut out = String::from(FILE_HEADER);
    for entry in kept {
        out.push_str(&entry.to_markdown());
    }
    atomic_write(path, &out)?;
    Ok(dropped)
}

// --- atomic write ---

/// Write via a temp file in the same directory, then rename into place.
/// Readers never observe a half-written file.
pub fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
