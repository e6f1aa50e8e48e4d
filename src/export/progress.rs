//! Progress tracking for dispatch
//!
//! Shows how many partitions have been handed to workers so far. The total
//! is always known (the plan is computed before dispatch starts), so this
//! is a plain bar rather than a spinner. Note that the bar tracks *submitted*
//! jobs, not finished files: it completes the moment the last worker has
//! been launched.

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress tracker over dispatched partitions
pub struct ProgressTracker {
    start_time: Instant,
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `total` - Number of planned partitions
    /// * `enable_bar` - Whether to display a progress bar
    pub fn new(total: u64, enable_bar: bool) -> Self {
        let bar = if enable_bar {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} partitions {msg}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            Some(bar)
        } else {
            None
        };

        Self {
            start_time: Instant::now(),
            bar,
        }
    }

    /// Update the number of partitions dispatched so far
    pub fn update(&self, dispatched: u64) {
        if let Some(ref bar) = self.bar {
            bar.set_position(dispatched);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let rate = dispatched as f64 / elapsed;
                bar.set_message(format!("({:.0}/sec)", rate));
            }
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
