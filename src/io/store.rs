use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::io::recovery::{atomic_write, log_load_failure, log_write_failure};
use crate::io::sync::SyncGate;
use crate::model::SchedulerState;
use crate::ops::rollover::default_state;

pub const STATE_FILE: &str = "state.json";

/// Handle on the data directory: loads and saves the scheduler state
/// and keeps the sync gate that recognizes echoes of our own writes.
pub struct StateStore {
    dir: PathBuf,
    gate: SyncGate,
}

impl StateStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        StateStore {
            dir: dir.into(),
            gate: SyncGate::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Load the state file, falling open to a fresh state when the file
    /// is missing or unreadable. A file that exists but does not parse
    /// is preserved in the recovery journal before being set aside.
    pub fn load(&self, now: NaiveDateTime) -> SchedulerState {
        let path = self.state_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return default_state(now),
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                log_load_failure(&self.dir, &path, &err.to_string(), &raw);
                default_state(now)
            }
        }
    }

    /// Persist the state. Best effort: a failed save journals the
    /// payload and returns false instead of propagating.
    ///
    /// The serialized payload is fingerprinted before the write lands so
    /// the watcher can tell the resulting change event is our own.
    pub fn save(&mut self, state: &SchedulerState) -> bool {
        let payload = match serde_json::to_string_pretty(state) {
            Ok(payload) => payload,
            Err(err) => {
                log_write_failure(&self.dir, &err.to_string(), "");
                return false;
            }
        };
        self.gate.record_write(&payload);
        if let Err(err) = fs::create_dir_all(&self.dir) {
            log_write_failure(&self.dir, &err.to_string(), &payload);
            return false;
        }
        match atomic_write(&self.state_path(), &payload) {
            Ok(()) => true,
            Err(err) => {
                log_write_failure(&self.dir, &err.to_string(), &payload);
                false
            }
        }
    }

    /// Raw bytes of the state file, if present.
    pub fn read_raw(&self) -> Option<String> {
        fs::read_to_string(self.state_path()).ok()
    }

    /// Whether `incoming` matches the last payload this process wrote.
    pub fn is_echo(&self, incoming: &str) -> bool {
        self.gate.is_echo(incoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::recovery::{read_recovery_entries, RecoveryCategory};
    use crate::model::RecurringTask;
    use crate::ops::clock::logical_date_key;
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn missing_file_falls_open_to_fresh_state() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::open(tmp.path());
        let now = at(2026, 1, 5, 10);

        let state = store.load(now);
        assert!(state.tasks.is_empty());
        assert_eq!(state.last_date, logical_date_key(now, 3));
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        let mut store = StateStore::open(tmp.path());
        let now = at(2026, 1, 5, 10);

        let mut state = store.load(now);
        state.tasks.push(RecurringTask::daily("t1".into(), "stretch".into()));
        state.progression.insert("t1".into(), 4);
        assert!(store.save(&state));

        let loaded = store.load(now);
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].title, "stretch");
        assert_eq!(loaded.counter("t1"), 4);
    }

    #[test]
    fn save_records_echo_fingerprint() {
        let tmp = TempDir::new().unwrap();
        let mut store = StateStore::open(tmp.path());
        let state = store.load(at(2026, 1, 5, 10));

        assert!(store.save(&state));
        let raw = store.read_raw().unwrap();
        assert!(store.is_echo(&raw));
        assert!(!store.is_echo("{\"tasks\":[]}"));
    }

    #[test]
    fn corrupt_file_journaled_then_set_aside() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::open(tmp.path());
        fs::write(tmp.path().join(STATE_FILE), "not json {{{").unwrap();

        let state = store.load(at(2026, 1, 5, 10));
        assert!(state.tasks.is_empty());

        let entries = read_recovery_entries(tmp.path(), None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Load);
        assert_eq!(entries[0].body, "not json {{{");
    }

    #[test]
    fn wrong_shape_file_also_falls_open() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::open(tmp.path());
        fs::write(tmp.path().join(STATE_FILE), "{\"tasks\": \"oops\"}").unwrap();

        let state = store.load(at(2026, 1, 5, 10));
        assert!(state.tasks.is_empty());
        let entries = read_recovery_entries(tmp.path(), None).unwrap();
        assert_eq!(entries[0].category, RecoveryCategory::Load);
    }

    #[test]
    fn minimal_object_parses_without_journaling() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::open(tmp.path());
        fs::write(tmp.path().join(STATE_FILE), "{}").unwrap();

        let state = store.load(at(2026, 1, 5, 10));
        assert!(state.tasks.is_empty());
        assert_eq!(state.last_date, "");
        assert!(read_recovery_entries(tmp.path(), None).unwrap().is_empty());
    }

    #[test]
    fn save_creates_data_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("cadence");
        let mut store = StateStore::open(&dir);
        let state = store.load(at(2026, 1, 5, 10));

        assert!(store.save(&state));
        assert!(dir.join(STATE_FILE).exists());
    }
}
