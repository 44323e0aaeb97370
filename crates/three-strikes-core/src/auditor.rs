use crate::ads::{AdsApi, MutateOutcome};
use crate::batch;
use crate::error::Error;
use crate::model::{AccountRecord, AccountSummary, RemovalCandidate, RemovalStatus};
use crate::policy::TopicPolicy;
use crate::sink::Recorder;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const DEFAULT_REMOVE_BATCH_SIZE: usize = 5000;

/// What one account's audit produced.
#[derive(Debug, Clone)]
pub struct AccountAudit {
    pub account_id: String,
    pub candidates: Vec<RemovalCandidate>,
    /// Eligible ads, whether or not removal ran.
    pub ads_to_remove_count: usize,
    pub removed_count: usize,
    pub failed_count: usize,
}

/// Finds removable disapproved ads in one account and optionally removes them.
pub struct AdAuditor<'a> {
    api: &'a dyn AdsApi,
    policy: &'a TopicPolicy,
    recorder: &'a Recorder,
    remove_ads: bool,
    batch_size: usize,
}

impl<'a> AdAuditor<'a> {
    pub fn new(api: &'a dyn AdsApi, policy: &'a TopicPolicy, recorder: &'a Recorder) -> Self {
        Self {
            api,
            policy,
            recorder,
            remove_ads: false,
            batch_size: DEFAULT_REMOVE_BATCH_SIZE,
        }
    }

    pub fn with_removal(mut self, remove_ads: bool) -> Self {
        self.remove_ads = remove_ads;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Fetch, filter, stage, then (if enabled) remove and reconcile.
    ///
    /// Staged candidates are persisted before any removal request is sent, so the audit
    /// trail survives a failed or interrupted removal.
    pub fn process_account(&self, account: &AccountRecord) -> Result<AccountAudit, Error> {
        info!("Processing account {} ({})", account.account_id, account.hierarchy);

        let ads = self
            .api
            .disapproved_ads(&account.account_id, &account.hierarchy)?;
        let fetched = ads.len();

        let staged: Vec<RemovalCandidate> = ads
            .into_iter()
            .filter(|ad| {
                let eligible = self.policy.is_eligible(&ad.policy_topics);
                if eligible {
                    debug!(
                        ad_id = %ad.ad_id,
                        "Eligible for removal, topics: {:?}",
                        ad.policy_topics
                    );
                }
                eligible
            })
            .map(RemovalCandidate::scanned)
            .collect();
        let ads_to_remove_count = staged.len();

        self.recorder.record_candidates(&staged)?;

        let candidates = if self.remove_ads && !staged.is_empty() {
            self.remove(&account.account_id, staged)?
        } else {
            staged
        };

        let removed_count = count_status(&candidates, RemovalStatus::Removed);
        let failed_count = count_status(&candidates, RemovalStatus::FailedToRemove);

        self.recorder.record_account_summary(&AccountSummary {
            account_id: account.account_id.clone(),
            ads_to_remove_count,
        })?;

        info!(
            "Account {} finished: {} disapproved ads, {} relevant, {} removed, {} failed",
            account.account_id, fetched, ads_to_remove_count, removed_count, failed_count
        );

        Ok(AccountAudit {
            account_id: account.account_id.clone(),
            candidates,
            ads_to_remove_count,
            removed_count,
            failed_count,
        })
    }

    fn remove(
        &self,
        customer_id: &str,
        staged: Vec<RemovalCandidate>,
    ) -> Result<Vec<RemovalCandidate>, Error> {
        let mut resolved = Vec::with_capacity(staged.len());
        let chunks = batch::chunk(staged, self.batch_size);
        let chunk_count = chunks.len();

        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            let resource_names: Vec<String> =
                chunk.iter().map(|c| c.ad.resource_name()).collect();
            info!(
                customer_id,
                "Removing chunk {}/{} ({} ads)",
                chunk_index + 1,
                chunk_count,
                resource_names.len()
            );

            let outcome = self.api.remove_ads(customer_id, &resource_names)?;
            let reconciled = reconcile(chunk, &outcome);
            self.recorder.record_reconciled(&reconciled)?;
            resolved.extend(reconciled);
        }

        Ok(resolved)
    }
}

fn count_status(candidates: &[RemovalCandidate], status: RemovalStatus) -> usize {
    candidates.iter().filter(|c| c.status == status).count()
}

/// Resolve every candidate of a submitted chunk from the mutate outcome.
///
/// Candidates at failed indices become FAILED_TO_REMOVE carrying the reported errors;
/// everything else in the chunk is REMOVED. Removed candidates come first in the result.
pub fn reconcile(mut chunk: Vec<RemovalCandidate>, outcome: &MutateOutcome) -> Vec<RemovalCandidate> {
    let mut errors: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for failure in &outcome.failures {
        if failure.index < chunk.len() {
            errors.entry(failure.index).or_default().push(failure.to_string());
        } else {
            warn!(
                "Partial failure index {} is outside a chunk of {}: {}",
                failure.index,
                chunk.len(),
                failure
            );
        }
    }

    let indices: Vec<usize> = errors.keys().copied().collect();
    // Extracted highest index first, so pair with the errors in reverse.
    let mut failed = batch::extract_by_indices(&mut chunk, &indices);
    for (candidate, (index, messages)) in failed.iter_mut().zip(errors.iter().rev()) {
        let message = messages.join("; ");
        warn!(
            ad_id = %candidate.ad.ad_id,
            "A partial failure at index {} occurred: {}",
            index,
            message
        );
        candidate.mark_failed(message);
    }

    for candidate in chunk.iter_mut() {
        candidate.mark_removed();
    }
    chunk.extend(failed);
    chunk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::OperationFailure;
    use crate::model::{AdDetails, DisapprovedAd};

    fn candidate(ad_id: &str) -> RemovalCandidate {
        RemovalCandidate::scanned(DisapprovedAd {
            account_id: "1".to_string(),
            hierarchy: "1".to_string(),
            campaign_id: "2".to_string(),
            ad_group_id: "3".to_string(),
            ad_id: ad_id.to_string(),
            ad_type: "TEXT_AD".to_string(),
            final_urls: vec![],
            policy_topics: vec!["tobacco".to_string()],
            evidences: vec![],
            details: AdDetails::Unknown {
                ad_type: "TEXT_AD".to_string(),
            },
        })
    }

    fn failure(index: usize, message: &str) -> OperationFailure {
        OperationFailure {
            index,
            error_code: "mutateError.RESOURCE_NOT_FOUND".to_string(),
            message: message.to_string(),
        }
    }

    fn status_of<'c>(candidates: &'c [RemovalCandidate], ad_id: &str) -> &'c RemovalCandidate {
        candidates.iter().find(|c| c.ad.ad_id == ad_id).unwrap()
    }

    #[test]
    fn test_reconcile_marks_failed_index_only() {
        let chunk = vec![candidate("a"), candidate("b"), candidate("c")];
        let outcome = MutateOutcome {
            results: vec![Some("r0".to_string()), None, Some("r2".to_string())],
            failures: vec![failure(1, "gone")],
        };
        let resolved = reconcile(chunk, &outcome);
        assert_eq!(resolved.len(), 3);
        assert_eq!(status_of(&resolved, "a").status, RemovalStatus::Removed);
        assert_eq!(status_of(&resolved, "c").status, RemovalStatus::Removed);
        let b = status_of(&resolved, "b");
        assert_eq!(b.status, RemovalStatus::FailedToRemove);
        assert_eq!(
            b.removal_error.as_deref(),
            Some("mutateError.RESOURCE_NOT_FOUND: gone")
        );
    }

    #[test]
    fn test_reconcile_pairs_errors_with_their_items() {
        let chunk = vec![candidate("a"), candidate("b"), candidate("c"), candidate("d")];
        let outcome = MutateOutcome {
            results: vec![None, Some("r1".to_string()), None, Some("r3".to_string())],
            failures: vec![failure(0, "first"), failure(2, "third"), failure(2, "again")],
        };
        let resolved = reconcile(chunk, &outcome);
        assert_eq!(resolved.len(), 4);
        assert_eq!(
            status_of(&resolved, "a").removal_error.as_deref(),
            Some("mutateError.RESOURCE_NOT_FOUND: first")
        );
        assert_eq!(
            status_of(&resolved, "c").removal_error.as_deref(),
            Some("mutateError.RESOURCE_NOT_FOUND: third; mutateError.RESOURCE_NOT_FOUND: again")
        );
        assert_eq!(status_of(&resolved, "b").status, RemovalStatus::Removed);
        assert_eq!(status_of(&resolved, "d").status, RemovalStatus::Removed);
    }

    #[test]
    fn test_reconcile_ignores_out_of_range_failures() {
        let chunk = vec![candidate("a")];
        let outcome = MutateOutcome {
            results: vec![Some("r0".to_string())],
            failures: vec![failure(5, "phantom")],
        };
        let resolved = reconcile(chunk, &outcome);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].status, RemovalStatus::Removed);
    }
}
