use crate::accounts::{normalize_account_id, AccountTreeWalker};
use crate::ads::AdsApi;
use crate::auditor::{AccountAudit, AdAuditor};
use crate::config::AppConfig;
use crate::error::Error;
use crate::model::{AccountRecord, MccSummary};
use crate::policy::TopicPolicy;
use crate::progress::ProgressReporter;
use crate::sink::{Recorder, Table, Warehouse};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct SweepEngine {
    config: AppConfig,
    api: Arc<dyn AdsApi>,
    policy: TopicPolicy,
    recorder: Recorder,
    remove_ads: bool,
    parallel: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub mcc: MccSummary,
    pub removed: usize,
    pub failed: usize,
    pub walk_duration: Duration,
    pub audit_duration: Duration,
}

impl SweepEngine {
    pub fn new(
        config: AppConfig,
        api: Arc<dyn AdsApi>,
        policy: TopicPolicy,
        recorder: Recorder,
    ) -> Self {
        Self {
            config,
            api,
            policy,
            recorder,
            remove_ads: false,
            parallel: true,
        }
    }

    pub fn with_removal(mut self, remove_ads: bool) -> Self {
        self.remove_ads = remove_ads;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Run the whole sweep for the tree under `root_id`:
    /// 1. Flatten the account tree and persist it
    /// 2. Audit every account, sequentially or fanned out over a rayon pool
    /// 3. Aggregate and persist the MCC summary
    pub fn run(&self, root_id: &str, reporter: &dyn ProgressReporter) -> Result<RunSummary, Error> {
        let root_id = normalize_account_id(root_id);
        self.recorder.prepare()?;

        // Phase 1: Walk
        reporter.on_walk_start(&root_id);
        let walk_start = Instant::now();
        let accounts = AccountTreeWalker::new(self.api.as_ref())
            .with_max_depth(self.config.max_depth)
            .flatten(&root_id)?;
        let walk_duration = walk_start.elapsed();
        reporter.on_walk_complete(accounts.len(), walk_duration.as_secs_f64());
        self.recorder.record_accounts(&accounts)?;

        // Phase 2: Audit
        reporter.on_audit_start(accounts.len());
        let audit_start = Instant::now();
        let audits = self.audit_accounts(&accounts, reporter)?;
        let audit_duration = audit_start.elapsed();

        // Phase 3: Summarize
        let mut mcc = MccSummary::new(&root_id);
        let mut removed = 0;
        let mut failed = 0;
        for audit in &audits {
            mcc.add(audit.ads_to_remove_count);
            removed += audit.removed_count;
            failed += audit.failed_count;
        }
        reporter.on_audit_complete(mcc.total_ads_to_remove, audit_duration.as_secs_f64());
        info!(
            "top_mcc_total_accounts = {}, accounts_with_ads_to_remove = {}, \
             accounts_without_ads_to_remove = {}, top_mcc_total_ads_to_remove = {}",
            mcc.total_sub_accounts,
            mcc.accounts_with_ads_to_remove,
            mcc.accounts_without_ads_to_remove,
            mcc.total_ads_to_remove
        );
        self.recorder.record_mcc_summary(&mcc)?;

        Ok(RunSummary {
            mcc,
            removed,
            failed,
            walk_duration,
            audit_duration,
        })
    }

    fn audit_accounts(
        &self,
        accounts: &[AccountRecord],
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<AccountAudit>, Error> {
        let auditor = AdAuditor::new(self.api.as_ref(), &self.policy, &self.recorder)
            .with_removal(self.remove_ads)
            .with_batch_size(self.config.remove_batch_size);

        let audit_one = |account: &AccountRecord| -> Result<AccountAudit, Error> {
            let mut audit = auditor.process_account(account)?;
            reporter.on_account_complete(&audit.account_id, audit.ads_to_remove_count);
            // Only the counts are needed past this point.
            audit.candidates = Vec::new();
            Ok(audit)
        };

        if !self.parallel {
            return accounts.iter().map(audit_one).collect();
        }

        match self.config.workers {
            Some(workers) => {
                debug!("Auditing accounts on {} worker threads", workers);
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| Error::Other(format!("Failed to build worker pool: {}", e)))?;
                pool.install(|| accounts.par_iter().map(audit_one).collect())
            }
            None => accounts.par_iter().map(audit_one).collect(),
        }
    }
}

/// Re-run `attempt` from scratch while it fails with a retryable error, up to `attempts`
/// times in total. Every failure is logged with its full details first.
pub fn run_with_retries<T, F>(attempts: usize, mut attempt: F) -> Result<T, Error>
where
    F: FnMut(usize) -> Result<T, Error>,
{
    let attempts = attempts.max(1);
    let mut number = 1;
    loop {
        match attempt(number) {
            Ok(value) => return Ok(value),
            Err(err) => {
                match &err {
                    Error::AdsApi(api_err) => api_err.log_details(),
                    other => error!("Run failed: {}", other),
                }
                if !err.is_retryable() || number >= attempts {
                    return Err(err);
                }
                warn!("Attempt {}/{} failed, restarting the run", number, attempts);
                number += 1;
            }
        }
    }
}

/// Drop every output table.
pub fn delete_tables(warehouse: &dyn Warehouse) -> Result<(), Error> {
    for table in [
        Table::PerMccSummary,
        Table::AdsToRemove,
        Table::AllAccounts,
        Table::PerAccountSummary,
    ] {
        warehouse.delete_table(table)?;
    }
    Ok(())
}

/// Delete superseded rows from the ads table.
pub fn clean_outdated(warehouse: &dyn Warehouse) -> Result<u64, Error> {
    let affected = warehouse.remove_outdated_rows(Table::AdsToRemove)?;
    info!("Removed {} outdated rows from {}", affected, Table::AdsToRemove);
    Ok(affected)
}
