/// Trait for reporting run progress.
///
/// The CLI implements it with indicatif; tests use the silent reporter.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_walk_start(&self, _root_id: &str) {}
    fn on_walk_complete(&self, _accounts: usize, _duration_secs: f64) {}
    fn on_audit_start(&self, _accounts: usize) {}
    fn on_account_complete(&self, _account_id: &str, _ads_to_remove: usize) {}
    fn on_audit_complete(&self, _total_ads_to_remove: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
