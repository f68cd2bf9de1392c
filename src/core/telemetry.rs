//! Throughput and ETA tracking for route batches
//!
//! Completion timestamps are kept in a sliding window so the reported rate
//! follows changes in engine speed instead of averaging over the whole run.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Default span of the sliding throughput window
pub const DEFAULT_TELEMETRY_WINDOW: Duration = Duration::from_secs(30);

/// How a single task ended, as far as telemetry is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    /// Engine returned a non-empty route
    Routed,
    /// Engine found no route between the endpoints
    Empty,
    /// Engine reported an error
    Failed,
}

/// Telemetry snapshot handed to progress callbacks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub empty: usize,
    pub failed: usize,
    /// Completions per second
    pub throughput: f64,
    pub eta: Option<Duration>,
}

impl Progress {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} routes/s", self.throughput)?;
        if self.empty > 0 {
            write!(f, ", {} empty", self.empty)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if let Some(eta) = self.eta {
            write!(f, ", ETA {}", format_eta(eta))?;
        }
        Ok(())
    }
}

/// Completion counters plus the sliding window of timestamps.
///
/// Owned by the batch coordinator, which is its only writer.
#[derive(Debug)]
pub struct Telemetry {
    window: Duration,
    started: Instant,
    samples: VecDeque<Instant>,
    total: usize,
    completed: usize,
    empty: usize,
    failed: usize,
}

impl Telemetry {
    pub fn new(total: usize, window: Duration, started: Instant) -> Self {
        Self {
            window,
            started,
            samples: VecDeque::new(),
            total,
            completed: 0,
            empty: 0,
            failed: 0,
        }
    }

    /// Record one finished task
    pub fn record(&mut self, at: Instant, kind: CompletionKind) {
        self.completed += 1;
        match kind {
            CompletionKind::Routed => {}
            CompletionKind::Empty => self.empty += 1,
            CompletionKind::Failed => self.failed += 1,
        }
        self.samples.push_back(at);
        if let Some(cutoff) = at.checked_sub(self.window) {
            while self.samples.front().is_some_and(|t| *t < cutoff) {
                self.samples.pop_front();
            }
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn empty(&self) -> usize {
        self.empty
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Completions per second.
    ///
    /// Uses the window when it holds more than one sample spanning more than
    /// a second, otherwise the average since the batch started.
    pub fn throughput(&self, now: Instant) -> f64 {
        let in_window = match now.checked_sub(self.window) {
            Some(cutoff) => {
                let skip = self.samples.partition_point(|t| *t < cutoff);
                self.samples.range(skip..)
            }
            None => self.samples.range(..),
        };
        let mut count = 0usize;
        let mut oldest = None;
        let mut newest = None;
        for t in in_window {
            count += 1;
            oldest.get_or_insert(*t);
            newest = Some(*t);
        }

        if let (Some(oldest), Some(newest)) = (oldest, newest) {
            let span = newest.saturating_duration_since(oldest);
            if count > 1 && span > Duration::from_secs(1) {
                return count as f64 / span.as_secs_f64();
            }
        }

        let elapsed = self.elapsed(now).as_secs_f64();
        if self.completed == 0 || elapsed <= 0.0 {
            0.0
        } else {
            self.completed as f64 / elapsed
        }
    }

    /// Estimated time to finish, `None` when nothing remains or no rate is known
    pub fn eta(&self, now: Instant) -> Option<Duration> {
        let remaining = self.remaining();
        let throughput = self.throughput(now);
        if remaining == 0 || throughput <= 0.0 {
            return None;
        }
        Some(Duration::from_secs((remaining as f64 / throughput).round() as u64))
    }

    pub fn snapshot(&self, now: Instant) -> Progress {
        Progress {
            total: self.total,
            completed: self.completed,
            empty: self.empty,
            failed: self.failed,
            throughput: self.throughput(now),
            eta: self.eta(now),
        }
    }
}

/// Render a duration as hours, minutes and seconds, e.g. `1h 2m 3s`.
///
/// Leading zero units are dropped: `2m 5s`, `42s`.
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(Duration::from_secs(0)), "0s");
        assert_eq!(format_eta(Duration::from_secs(42)), "42s");
        assert_eq!(format_eta(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_eta(Duration::from_secs(3723)), "1h 2m 3s");
        assert_eq!(format_eta(Duration::from_secs(7200)), "2h 0m 0s");
    }

    #[test]
    fn test_no_completions_means_no_rate() {
        let start = Instant::now();
        let telemetry = Telemetry::new(10, DEFAULT_TELEMETRY_WINDOW, start);
        assert_eq!(telemetry.throughput(start + secs(5.0)), 0.0);
        assert_eq!(telemetry.eta(start + secs(5.0)), None);
    }

    #[test]
    fn test_falls_back_to_elapsed_average() {
        let start = Instant::now();
        let mut telemetry = Telemetry::new(10, DEFAULT_TELEMETRY_WINDOW, start);
        // One sample is not enough for the window
        telemetry.record(start + secs(2.0), CompletionKind::Routed);
        let rate = telemetry.throughput(start + secs(4.0));
        assert!((rate - 0.25).abs() < 1e-9, "rate was {rate}");
        assert_eq!(telemetry.eta(start + secs(4.0)), Some(Duration::from_secs(36)));
    }

    #[test]
    fn test_window_needs_more_than_one_second() {
        let start = Instant::now();
        let mut telemetry = Telemetry::new(100, DEFAULT_TELEMETRY_WINDOW, start);
        telemetry.record(start + secs(10.0), CompletionKind::Routed);
        telemetry.record(start + secs(10.5), CompletionKind::Routed);
        // Span of 0.5s: average over 11s elapsed
        let rate = telemetry.throughput(start + secs(11.0));
        assert!((rate - 2.0 / 11.0).abs() < 1e-9, "rate was {rate}");
    }

    #[test]
    fn test_sliding_window_rate() {
        let start = Instant::now();
        let mut telemetry = Telemetry::new(100, DEFAULT_TELEMETRY_WINDOW, start);
        for i in 0..5 {
            telemetry.record(start + secs(1.0 + i as f64), CompletionKind::Routed);
        }
        // 5 samples spanning 4 seconds
        let rate = telemetry.throughput(start + secs(5.0));
        assert!((rate - 1.25).abs() < 1e-9, "rate was {rate}");
        assert_eq!(telemetry.eta(start + secs(5.0)), Some(Duration::from_secs(76)));
    }

    #[test]
    fn test_old_samples_leave_the_window() {
        let start = Instant::now();
        let window = Duration::from_secs(10);
        let mut telemetry = Telemetry::new(100, window, start);
        // Slow phase
        telemetry.record(start + secs(1.0), CompletionKind::Routed);
        telemetry.record(start + secs(5.0), CompletionKind::Routed);
        // Fast phase, the slow samples drop out
        for i in 0..10 {
            telemetry.record(start + secs(20.0 + i as f64 * 0.25), CompletionKind::Routed);
        }
        let rate = telemetry.throughput(start + secs(22.25));
        assert!((rate - 10.0 / 2.25).abs() < 1e-9, "rate was {rate}");
        assert_eq!(telemetry.completed(), 12);
    }

    #[test]
    fn test_counts_empty_and_failed() {
        let start = Instant::now();
        let mut telemetry = Telemetry::new(3, DEFAULT_TELEMETRY_WINDOW, start);
        telemetry.record(start + secs(1.0), CompletionKind::Routed);
        telemetry.record(start + secs(2.0), CompletionKind::Empty);
        telemetry.record(start + secs(3.0), CompletionKind::Failed);

        let progress = telemetry.snapshot(start + secs(3.0));
        assert_eq!(progress.completed, 3);
        assert_eq!(progress.empty, 1);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.remaining(), 0);
        assert_eq!(progress.eta, None);
        assert_eq!(progress.to_string(), "1.5 routes/s, 1 empty, 1 failed");
    }
}
