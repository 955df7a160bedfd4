//! Minimal progress interface used by index and watch runs.
//!
//! The no-op reporter is the default; the CLI provides a terminal
//! implementation behind `--progress`.

/// Progress sink for long-running operations. Every method has a no-op
/// default so implementations only override what they render.
pub trait Progress: Send + Sync {
    /// Announce how many steps the run will take, once known.
    fn set_total(&self, _n: u64) {}
    /// One unit of work done; `msg` names what was just processed.
    fn step(&self, _msg: &str) {}
    /// Update the status line without counting a step.
    fn message(&self, _msg: &str) {}
    /// The run is over; `msg` is the closing status.
    fn finish(&self, _msg: &str) {}
}

/// Reporter that swallows everything, for headless runs.
#[derive(Default, Clone, Copy)]
pub struct NoopProgress;
impl Progress for NoopProgress {}
