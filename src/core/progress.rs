//! Terminal progress display for route batches
//!
//! Renders queue telemetry on stderr with an indicatif progress bar.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::telemetry::Progress;

/// Progress callback function type
pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

/// Creates a progress bar for a batch of `total` routes
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Progress bar bound to one batch run
pub struct ProgressReporter {
    pb: ProgressBar,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            pb: create_progress_bar(total as u64),
        }
    }

    #[cfg(test)]
    fn hidden(total: usize) -> Self {
        let pb = ProgressBar::hidden();
        pb.set_length(total as u64);
        Self { pb }
    }

    pub fn update(&self, progress: &Progress) {
        self.pb.set_position(progress.completed as u64);
        self.pb.set_message(progress.to_string());
    }

    pub fn finish(&self, progress: &Progress) {
        self.update(progress);
        self.pb.finish_with_message(format!(
            "✅ {} routes done ({} empty, {} failed)",
            progress.completed, progress.empty, progress.failed
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn progress(completed: usize) -> Progress {
        Progress {
            total: 10,
            completed,
            empty: 1,
            failed: 0,
            throughput: 2.0,
            eta: Some(Duration::from_secs(4)),
        }
    }

    #[test]
    fn test_create_progress_bar_template() {
        let pb = create_progress_bar(1000);
        assert_eq!(pb.length().unwrap(), 1000);
        pb.set_position(100);
        pb.finish();
    }

    #[test]
    fn test_reporter_tracks_completed() {
        let reporter = ProgressReporter::hidden(10);
        reporter.update(&progress(3));
        assert_eq!(reporter.pb.position(), 3);
        assert_eq!(reporter.pb.message(), "2.0 routes/s, 1 empty, ETA 4s");

        reporter.finish(&progress(10));
        assert_eq!(reporter.pb.position(), 10);
        assert!(reporter.pb.is_finished());
    }
}
