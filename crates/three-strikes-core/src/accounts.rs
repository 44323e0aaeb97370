use crate::ads::{AdsApi, AdsApiError};
use crate::model::AccountRecord;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Strip formatting separators from an account id (`123-456-7890` -> `1234567890`).
pub fn normalize_account_id(id: &str) -> String {
    id.trim().chars().filter(|c| *c != '-' && !c.is_whitespace()).collect()
}

/// Flattens a manager-account hierarchy into one record per reachable account.
pub struct AccountTreeWalker<'a> {
    api: &'a dyn AdsApi,
    max_depth: usize,
}

impl<'a> AccountTreeWalker<'a> {
    pub fn new(api: &'a dyn AdsApi) -> Self {
        Self {
            api,
            max_depth: usize::MAX,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Walk the tree below `root_id`, root included.
    ///
    /// Each manager contributes its direct leaf children, then itself, then its manager
    /// subtrees in the order the API listed them. An account id is emitted at most once:
    /// a child already seen elsewhere in the walk is skipped, which also stops cycles.
    pub fn flatten(&self, root_id: &str) -> Result<Vec<AccountRecord>, AdsApiError> {
        let root = AccountRecord::root(&normalize_account_id(root_id));
        let mut seen: HashSet<String> = HashSet::from([root.account_id.clone()]);
        let mut accounts = Vec::new();
        let mut pending = vec![root];

        while let Some(manager) = pending.pop() {
            debug!("Listing sub accounts of {}", manager.hierarchy);

            for leaf_id in self.api.sub_accounts(&manager.account_id, false)? {
                if leaf_id == manager.account_id {
                    continue;
                }
                if !seen.insert(leaf_id.clone()) {
                    warn!(
                        "Account {} already reached, skipping it under {}",
                        leaf_id, manager.hierarchy
                    );
                    continue;
                }
                accounts.push(manager.child(&leaf_id));
            }

            let sub_mccs = self.api.sub_accounts(&manager.account_id, true)?;
            accounts.push(manager.clone());

            let mut children = Vec::with_capacity(sub_mccs.len());
            for mcc_id in sub_mccs {
                if mcc_id == manager.account_id {
                    continue;
                }
                if !seen.insert(mcc_id.clone()) {
                    warn!(
                        "Manager {} already reached, skipping it under {}",
                        mcc_id, manager.hierarchy
                    );
                    continue;
                }
                let child = manager.child(&mcc_id);
                if child.depth() > self.max_depth {
                    warn!(
                        "Manager {} is deeper than {} levels, not descending",
                        child.hierarchy, self.max_depth
                    );
                    continue;
                }
                children.push(child);
            }
            // Reversed so the first-listed manager is expanded first.
            pending.extend(children.into_iter().rev());
        }

        info!("Found {} accounts under {}", accounts.len(), root_id);
        Ok(accounts)
    }
}
