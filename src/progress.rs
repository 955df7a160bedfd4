//! Terminal progress reporting (`--progress`).

use index_pipeline::Progress;
use indicatif::{ProgressBar, ProgressStyle};

/// Indicatif-backed reporter behind the shared [`Progress`] trait. Starts
/// as a spinner and switches to a bounded bar once the pipeline announces
/// its file count.
pub struct IndicatifProgress {
    pb: ProgressBar,
}

impl IndicatifProgress {
    pub fn spinner() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {wide_msg}")
                .expect("static template"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { pb }
    }
}

impl Progress for IndicatifProgress {
    fn set_total(&self, n: u64) {
        self.pb.set_length(n);
        self.pb.set_style(
            ProgressStyle::with_template("[{bar:32}] {pos}/{len} {wide_msg}")
                .expect("static template")
                .progress_chars("=> "),
        );
    }
    fn step(&self, msg: &str) {
        self.pb.inc(1);
        self.pb.set_message(msg.to_string());
    }
    fn message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }
    fn finish(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }
}
