//! Polling watcher: snapshots `git status --porcelain`, fingerprints it and
//! runs a debounced delta reindex once the tree settles.

use crate::errors::PipelineError;
use crate::pipeline::Indexer;
use crate::progress::Progress;
use sha1::{Digest, Sha1};
use source_scan::{Change, status_porcelain};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Debounce state machine, separated from the timer loop so it can be
/// driven directly in tests.
struct DebounceState {
    debounce: Duration,
    fingerprint: String,
    pending: Vec<Change>,
    last_change: Option<Instant>,
}

impl DebounceState {
    fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            fingerprint: String::new(),
            pending: Vec::new(),
            last_change: None,
        }
    }

    /// Feeds one snapshot; returns the change set to index once the tree
    /// has been stable for the debounce window.
    fn observe(&mut self, raw: &str, changes: Vec<Change>, now: Instant) -> Option<Vec<Change>> {
        if raw.trim().is_empty() {
            self.fingerprint.clear();
            self.pending.clear();
            self.last_change = None;
            return None;
        }

        let fp = fingerprint(raw);
        if fp != self.fingerprint {
            self.fingerprint = fp;
            self.pending = changes;
            self.last_change = Some(now);
            return None;
        }

        let settled = self
            .last_change
            .is_some_and(|t| now.duration_since(t) >= self.debounce);
        if settled && !self.pending.is_empty() {
            self.last_change = None;
            return Some(std::mem::take(&mut self.pending));
        }
        None
    }
}

fn fingerprint(raw: &str) -> String {
    let mut h = Sha1::new();
    h.update(raw.as_bytes());
    h.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// Long-running delta driver.
pub struct Watcher {
    indexer: Indexer,
    interval: Duration,
    debounce: Duration,
}

impl Watcher {
    pub fn new(indexer: Indexer, interval: Duration, debounce: Duration) -> Self {
        Self {
            indexer,
            interval,
            debounce,
        }
    }

    /// Polls until the process exits. Errors from single ticks are logged
    /// and do not stop the loop; only structural failures propagate.
    pub async fn run(&self, progress: &dyn Progress) -> Result<(), PipelineError> {
        info!(
            "watch: interval={:?} debounce={:?} root={:?}",
            self.interval,
            self.debounce,
            self.indexer.paths().root
        );
        let mut state = DebounceState::new(self.debounce);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let (raw, changes) = match status_porcelain(&self.indexer.paths().root) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("watch: status snapshot failed ({e})");
                    (String::new(), Vec::new())
                }
            };

            if let Some(pending) = state.observe(&raw, changes, Instant::now()) {
                info!("watch: tree settled, {} pending changes", pending.len());
                match self.indexer.delta_index(&pending, progress).await {
                    Ok(Some(warning)) => warn!("watch: {warning}"),
                    Ok(None) => debug!("watch: delta clean"),
                    Err(e) => warn!("watch: delta failed ({e})"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use source_scan::ChangeStatus;

    fn change(path: &str) -> Change {
        Change {
            status: ChangeStatus::Modified,
            path: path.into(),
            old_path: None,
        }
    }

    #[test]
    fn fires_only_after_stable_debounce_window() {
        let debounce = Duration::from_millis(100);
        let mut state = DebounceState::new(debounce);
        let t0 = Instant::now();

        // First sight of the change records it but does not fire.
        assert!(state.observe(" M a.go\n", vec![change("a.go")], t0).is_none());
        // Same fingerprint but still inside the window.
        assert!(
            state
                .observe(" M a.go\n", vec![change("a.go")], t0 + Duration::from_millis(50))
                .is_none()
        );
        // Stable past the window: fire.
        let fired = state
            .observe(" M a.go\n", vec![change("a.go")], t0 + Duration::from_millis(150))
            .unwrap();
        assert_eq!(fired.len(), 1);
        // Pending cleared afterwards; the same snapshot does not re-fire.
        assert!(
            state
                .observe(" M a.go\n", vec![change("a.go")], t0 + Duration::from_millis(400))
                .is_none()
        );
    }

    #[test]
    fn changing_snapshot_resets_the_clock() {
        let debounce = Duration::from_millis(100);
        let mut state = DebounceState::new(debounce);
        let t0 = Instant::now();

        state.observe(" M a.go\n", vec![change("a.go")], t0);
        // New fingerprint inside the window: clock restarts.
        state.observe(
            " M a.go\n M b.go\n",
            vec![change("a.go"), change("b.go")],
            t0 + Duration::from_millis(90),
        );
        assert!(
            state
                .observe(
                    " M a.go\n M b.go\n",
                    vec![change("a.go"), change("b.go")],
                    t0 + Duration::from_millis(150)
                )
                .is_none(),
            "only 60ms since the last fingerprint change"
        );
        let fired = state
            .observe(
                " M a.go\n M b.go\n",
                vec![change("a.go"), change("b.go")],
                t0 + Duration::from_millis(200),
            )
            .unwrap();
        assert_eq!(fired.len(), 2);
    }

    #[test]
    fn empty_snapshot_clears_pending() {
        let mut state = DebounceState::new(Duration::from_millis(10));
        let t0 = Instant::now();
        state.observe(" M a.go\n", vec![change("a.go")], t0);
        state.observe("", Vec::new(), t0 + Duration::from_millis(5));
        assert!(state.pending.is_empty());
        assert!(
            state
                .observe(" M a.go\n", vec![change("a.go")], t0 + Duration::from_millis(50))
                .is_none(),
            "fingerprint was cleared, so this is a fresh change"
        );
    }
}
