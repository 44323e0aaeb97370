use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use three_strikes_core::ProgressReporter;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif.
///
/// - Walk phase: spinner (tree size unknown upfront)
/// - Audit phase: progress bar over the flattened accounts
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_walk_start(&self, root_id: &str) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICKS));
        }
        pb.set_message(format!("Walking account tree under {}...", root_id));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_walk_complete(&self, accounts: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Account tree: {} accounts in {:.2}s",
            accounts, duration_secs
        );
    }

    fn on_audit_start(&self, accounts: usize) {
        let pb = ProgressBar::new(accounts as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Auditing [{bar:30.cyan/dim}] {pos}/{len} accounts ({eta} remaining) {msg}",
        ) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICKS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_account_complete(&self, account_id: &str, ads_to_remove: usize) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.inc(1);
                if ads_to_remove > 0 {
                    pb.set_message(format!("{}: {} ads", account_id, ads_to_remove));
                }
            }
        }
    }

    fn on_audit_complete(&self, total_ads_to_remove: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Audit complete: {} ads to remove in {:.2}s",
            total_ads_to_remove, duration_secs
        );
    }
}
