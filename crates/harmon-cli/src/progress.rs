//! Terminal progress rendering for pipeline runs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use harmon_core::StatusChannel;
use harmon_model::Diagnostic;

/// An indicatif-backed status channel: one tick per rule, diagnostics
/// printed above the bar.
pub struct BarChannel {
    bar: ProgressBar,
}

impl BarChannel {
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} rules {msg}")
        {
            bar.set_style(style);
        }
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for BarChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusChannel for BarChannel {
    fn send_reset(&self, total: usize) {
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn send_progress(&self, count: usize, _total: usize) {
        self.bar.set_position(count as u64);
    }

    fn send_message(&self, diagnostic: &Diagnostic) {
        self.bar.println(format!(
            "{}.{}: {}",
            diagnostic.schema, diagnostic.variable, diagnostic.message
        ));
    }
}
