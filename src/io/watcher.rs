use std::path::Path;
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::io::store::STATE_FILE;

/// Watches the data directory for changes to the state file, so the
/// watch loop can pick up edits made by another process or a syncing
/// client.
pub struct StateWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
}

impl StateWatcher {
    /// Start watching `data_dir`. Only mutations of the state file are
    /// reported; the lock file, the recovery journal, and the temp files
    /// of atomic writes stay invisible.
    pub fn start(data_dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(_) => return,
                };
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }
                let touches_state = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().and_then(|n| n.to_str()) == Some(STATE_FILE));
                if touches_state {
                    let _ = tx.send(());
                }
            },
            Config::default(),
        )?;

        watcher.watch(data_dir, RecursiveMode::NonRecursive)?;
        Ok(StateWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Drain pending events. Returns true when the state file changed
    /// since the last poll; bursts coalesce into a single reload.
    pub fn poll(&self) -> bool {
        let mut changed = false;
        while self.rx.try_recv().is_ok() {
            changed = true;
        }
        changed
    }
}
