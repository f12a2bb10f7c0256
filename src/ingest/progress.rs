//! Progress reporting for file ingestion
//!
//! One bar per file using the `indicatif` crate. A disabled reporter is a
//! hidden bar so callers never branch on it.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar over the records of one input file
pub struct IngestProgress {
    bar: ProgressBar,
}

impl IngestProgress {
    /// Create a progress reporter
    ///
    /// # Arguments
    /// * `label` - Shown in front of the bar, typically the entity kind
    /// * `total_lines` - Expected record count (0 for unknown)
    /// * `enabled` - When false every call is a no-op
    pub fn new(label: &str, total_lines: u64, enabled: bool) -> Self {
        if !enabled {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = if total_lines > 0 {
            let bar = ProgressBar::new(total_lines);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>9}/{len:9} ({eta}) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░  "),
            );
            bar
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.green} {prefix} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar
        };
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Advance by a number of processed records
    pub fn advance(&self, records: u64) {
        self.bar.inc(records);
    }

    /// Show running success/error counts
    pub fn update_counts(&self, success: usize, errors: usize) {
        self.bar.set_message(format!(
            "ok {} / err {}",
            format_number(success as u64),
            format_number(errors as u64)
        ));
    }

    /// Finish with success message
    pub fn finish_success(&self, msg: &str) {
        self.bar.finish_with_message(format!("✓ {}", msg));
    }

    /// Finish with error message
    pub fn finish_error(&self, msg: &str) {
        self.bar.abandon_with_message(format!("✗ {}", msg));
    }

    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }
}

/// Format a number with thousand separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
