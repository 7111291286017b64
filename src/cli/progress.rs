//! Multi-progress display for concurrent image downloads.

use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::services::DownloadEvent;

fn bar_style(template: &str, chars: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(chars)
}

/// One summary bar plus a spinner line per in-flight image.
pub struct DownloadProgress {
    multi: MultiProgress,
    summary_bar: ProgressBar,
    active: HashMap<usize, ProgressBar>,
    saved: usize,
    failed: usize,
}

impl DownloadProgress {
    pub fn new(total: usize) -> Self {
        let multi = MultiProgress::new();

        let summary_bar = multi.add(ProgressBar::new(total as u64));
        summary_bar.set_style(bar_style(
            "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}",
            "█▓░",
        ));
        summary_bar.set_message("Downloading");
        summary_bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            multi,
            summary_bar,
            active: HashMap::new(),
            saved: 0,
            failed: 0,
        }
    }

    /// Update the display for one coordinator event.
    pub fn handle(&mut self, event: &DownloadEvent) {
        match event {
            DownloadEvent::Started { index, url } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(bar_style("  {spinner:.cyan} {wide_msg}", "━╸─"));
                bar.set_message(format!("{:03} {}", index + 1, truncate_url(url, 60)));
                bar.enable_steady_tick(Duration::from_millis(100));
                self.active.insert(*index, bar);
            }
            DownloadEvent::Completed { index, .. } => {
                self.saved += 1;
                self.finish_line(*index);
            }
            DownloadEvent::Failed { index, .. } => {
                self.failed += 1;
                self.finish_line(*index);
            }
        }
    }

    fn finish_line(&mut self, index: usize) {
        if let Some(bar) = self.active.remove(&index) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
        self.summary_bar.inc(1);
        self.summary_bar
            .set_message(format!("Saved: {} | Failed: {}", self.saved, self.failed));
    }

    /// Finish all progress bars and clear the display.
    pub fn finish(self) {
        for bar in self.active.values() {
            bar.finish_and_clear();
        }
        self.summary_bar.finish_and_clear();
    }
}

/// Shorten a URL for display, keeping its tail (the filename) visible.
fn truncate_url(url: &str, max_len: usize) -> String {
    let chars: Vec<char> = url.chars().collect();
    if chars.len() <= max_len {
        return url.to_string();
    }

    let keep = max_len.saturating_sub(3);
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("...{}", tail)
}
