// src/progress.rs

//! Step reporting for migration jobs
//!
//! A job is a fixed list of steps. Each step is announced through a
//! [`StepProgress`] implementation:
//! - `LogProgress`: step banners on stdout, mirrored to tracing
//! - `SilentProgress`: records steps without output (tests, scripted use)

use chrono::Local;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Core trait for job step tracking
pub trait StepProgress: Send + Sync {
    /// Announce the start of the next step
    fn step(&self, name: &str);

    /// Number of steps announced so far
    fn current(&self) -> usize;

    /// Finish successfully
    fn finish(&self, message: &str);

    /// Finish after a fatal error
    fn fail(&self, message: &str);
}

/// Prints `-- Step N/M: name (HH:MM:SS)` banners
#[derive(Debug)]
pub struct LogProgress {
    job: String,
    total: usize,
    current: AtomicUsize,
}

impl LogProgress {
    pub fn new(job: impl Into<String>, total: usize) -> Self {
        Self {
            job: job.into(),
            total,
            current: AtomicUsize::new(0),
        }
    }
}

impl StepProgress for LogProgress {
    fn step(&self, name: &str) {
        let n = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        let stamp = Local::now().format("%H:%M:%S");
        println!("\n-- Step {}/{}: {} ({})", n, self.total, name, stamp);
        info!(job = %self.job, step = n, "{}", name);
    }

    fn current(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    fn finish(&self, message: &str) {
        info!(job = %self.job, "{}", message);
    }

    fn fail(&self, message: &str) {
        info!(job = %self.job, step = self.current(), "failed: {}", message);
    }
}

/// Records step names without printing anything
#[derive(Debug, Default)]
pub struct SilentProgress {
    steps: Mutex<Vec<String>>,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step names in the order they were announced
    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl StepProgress for SilentProgress {
    fn step(&self, name: &str) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(name.to_string());
        }
    }

    fn current(&self) -> usize {
        self.steps.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn finish(&self, _message: &str) {}

    fn fail(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_progress_counts_steps() {
        let progress = LogProgress::new("container web", 3);
        progress.step("Connect");
        progress.step("Sync image");
        assert_eq!(progress.current(), 2);
    }

    #[test]
    fn test_silent_progress_records() {
        let progress = SilentProgress::new();
        progress.step("one");
        progress.step("two");
        assert_eq!(progress.steps(), vec!["one", "two"]);
        assert_eq!(progress.current(), 2);
    }
}
