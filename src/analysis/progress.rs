//! Progress reporting for the simulated analysis.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives stage updates from the sequencer.
pub trait ProgressReporter {
    /// Stage `index` (0-based) of `total` has started.
    fn stage(&self, index: usize, total: usize, label: &str);

    /// All stages are done and the result is stored.
    fn finish(&self);
}

/// Percentage shown after stage `index` of `total` starts.
pub fn stage_percent(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    ((index + 1) as f64 / total as f64) * 100.0
}

/// Terminal progress bar.
pub struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    pub fn new(show: bool) -> Self {
        let bar = ProgressBar::new(100);
        if show {
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self { bar }
    }
}

impl ProgressReporter for BarReporter {
    fn stage(&self, index: usize, total: usize, label: &str) {
        self.bar.set_message(label.to_string());
        self.bar.set_position(stage_percent(index, total).round() as u64);
    }

    fn finish(&self) {
        self.bar.finish_with_message("Analysis complete");
    }
}

/// Discards all updates.
#[allow(dead_code)] // Used when progress output is not wanted
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn stage(&self, _index: usize, _total: usize, _label: &str) {}

    fn finish(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_percent() {
        assert_eq!(stage_percent(0, 4), 25.0);
        assert_eq!(stage_percent(3, 4), 100.0);
        assert!((stage_percent(0, 7) - 14.2857).abs() < 0.001);
        assert_eq!(stage_percent(0, 0), 100.0);
    }

    #[test]
    fn test_hidden_bar_reporter() {
        let reporter = BarReporter::new(false);
        reporter.stage(0, 2, "first");
        reporter.stage(1, 2, "second");
        assert_eq!(reporter.bar.position(), 100);
        reporter.finish();
        assert!(reporter.bar.is_finished());
    }
}
