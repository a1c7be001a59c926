/// Tells our own writes apart from remote ones when the state file is
/// shared through a syncing directory.
///
/// Every save records the exact serialized payload before it hits disk.
/// When the watcher later reports a change, an incoming payload equal to
/// the fingerprint is an echo of our write and must not be re-applied; a
/// differing payload is a genuine remote edit.
#[derive(Debug, Default)]
pub struct SyncGate {
    last_write: Option<String>,
}

impl SyncGate {
    pub fn new() -> Self {
        SyncGate { last_write: None }
    }

    /// Record the payload about to be written. Called before the write
    /// lands so a fast watcher event still matches.
    pub fn record_write(&mut self, payload: &str) {
        self.last_write = Some(payload.to_string());
    }

    /// Whether `incoming` is byte-for-byte the last payload we wrote.
    pub fn is_echo(&self, incoming: &str) -> bool {
        self.last_write.as_deref() == Some(incoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_gate_suppresses_nothing() {
        let gate = SyncGate::new();
        assert!(!gate.is_echo("{}"));
    }

    #[test]
    fn recorded_payload_is_an_echo() {
        let mut gate = SyncGate::new();
        gate.record_write("{\"tasks\":[]}");
        assert!(gate.is_echo("{\"tasks\":[]}"));
    }

    #[test]
    fn different_payload_is_not_an_echo() {
        let mut gate = SyncGate::new();
        gate.record_write("{\"tasks\":[]}");
        assert!(!gate.is_echo("{\"tasks\":[{}]}"));
    }

    #[test]
    fn whitespace_differences_defeat_the_match() {
        let mut gate = SyncGate::new();
        gate.record_write("{\"tasks\": []}");
        assert!(!gate.is_echo("{\"tasks\":[]}"));
    }

    #[test]
    fn newer_write_replaces_fingerprint() {
        let mut gate = SyncGate::new();
        gate.record_write("one");
        gate.record_write("two");
        assert!(!gate.is_echo("one"));
        assert!(gate.is_echo("two"));
    }

    #[test]
    fn echo_check_does_not_consume() {
        let mut gate = SyncGate::new();
        gate.record_write("same");
        assert!(gate.is_echo("same"));
        assert!(gate.is_echo("same"));
    }
}
