//! Bounded per-file error accumulator.
//!
//! Indexing keeps going when a single file misbehaves; the run reports a
//! warning summary instead of failing. The collector counts everything but
//! retains at most [`MAX_SAMPLES`] sample messages.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const MAX_SAMPLES: usize = 5;

/// Thread-safe accumulator shared by the main loop and the vector workers.
#[derive(Default)]
pub struct ErrorCollector {
    count: AtomicUsize,
    samples: Mutex<Vec<String>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one per-file error.
    pub fn record(&self, message: impl Into<String>) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let mut samples = self.samples.lock().expect("collector mutex");
        if samples.len() < MAX_SAMPLES {
            samples.push(message.into());
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// The warning summary so far, or `None` for a clean run.
    pub fn snapshot(&self) -> Option<IndexWarning> {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        let samples = self.samples.lock().expect("collector mutex").clone();
        Some(IndexWarning { count, samples })
    }
}

/// Non-fatal summary of an index run that hit per-file errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexWarning {
    pub count: usize,
    pub samples: Vec<String>,
}

impl std::fmt::Display for IndexWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "index completed with {} errors: {}",
            self.count,
            self.samples.join("; ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_run_has_no_warning() {
        assert!(ErrorCollector::new().snapshot().is_none());
    }

    #[test]
    fn counts_everything_but_keeps_five_samples() {
        let c = ErrorCollector::new();
        for i in 0..8 {
            c.record(format!("file{i}: boom"));
        }
        let w = c.snapshot().unwrap();
        assert_eq!(w.count, 8);
        assert_eq!(w.samples.len(), 5);
        assert!(w.to_string().starts_with("index completed with 8 errors:"));
    }
}
