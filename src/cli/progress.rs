//! Terminal progress bar for batch runs

use crate::batch::{BatchProgress, BatchSummary};
use crate::error::Result;
use crate::processor::ItemOutcome;
use indicatif::{ProgressBar, ProgressStyle};

pub(crate) struct CliBatchProgress {
    bar: ProgressBar,
}

impl CliBatchProgress {
    pub(crate) fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }
}

fn item_message(key: &str, result: &Result<ItemOutcome>) -> String {
    match result {
        Ok(outcome @ ItemOutcome::Written { .. }) => format!("✅ {}", outcome.path().display()),
        Ok(outcome @ ItemOutcome::Skipped(_)) => format!("⏭️  {}", outcome.path().display()),
        Err(_) => format!("❌ {key}"),
    }
}

impl BatchProgress for CliBatchProgress {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_item(&self, _index: usize, key: &str, result: &Result<ItemOutcome>) {
        self.bar.set_message(item_message(key, result));
        self.bar.inc(1);
    }

    fn on_finish(&self, summary: &BatchSummary) {
        self.bar.finish_with_message(format!(
            "Completed! Written: {}, Skipped: {}, Failed: {}",
            summary.written,
            summary.skipped,
            summary.failed()
        ));
    }
}
