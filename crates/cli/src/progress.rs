//! Progress indicators
//!
//! One progress bar per simulated journey, kept in a shared multi-bar board.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;

fn journey_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:>16.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// Live board of journey progress bars keyed by journey id
pub struct JourneyBoard {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl JourneyBoard {
    /// Board drawing to stderr
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: HashMap::new(),
        }
    }

    /// Board that never draws (for non-interactive output and tests)
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            bars: HashMap::new(),
        }
    }

    /// Set a journey's progress (0-100), creating its bar on first sight
    pub fn update(&mut self, journey_id: &str, progress_percentage: f64, message: &str) {
        let bar = self.bar_for(journey_id);
        bar.set_position(progress_percentage.clamp(0.0, 100.0).round() as u64);
        bar.set_message(message.to_string());
    }

    /// Mark a journey's bar as finished
    pub fn finish(&mut self, journey_id: &str, message: &str) {
        let bar = self.bar_for(journey_id);
        bar.set_position(100);
        bar.finish_with_message(format!("✓ {}", message));
    }

    /// Number of journeys shown
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// True if no journey has been shown yet
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Current position of a journey's bar, if it exists
    pub fn position(&self, journey_id: &str) -> Option<u64> {
        self.bars.get(journey_id).map(ProgressBar::position)
    }

    fn bar_for(&mut self, journey_id: &str) -> &ProgressBar {
        let multi = &self.multi;
        self.bars.entry(journey_id.to_string()).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(100));
            bar.set_style(journey_style());
            bar.set_prefix(journey_id.to_string());
            bar
        })
    }
}

impl Default for JourneyBoard {
    fn default() -> Self {
        Self::new()
    }
}
