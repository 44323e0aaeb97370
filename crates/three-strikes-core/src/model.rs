use serde::Serialize;
use std::fmt;

/// A node of the manager-account tree, flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRecord {
    pub account_id: String,
    /// Underscore-joined account ids from the root down to this account.
    pub hierarchy: String,
}

impl AccountRecord {
    pub fn root(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            hierarchy: account_id.to_string(),
        }
    }

    pub fn child(&self, account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            hierarchy: format!("{}_{}", self.hierarchy, account_id),
        }
    }

    /// Number of ancestors between this account and the root.
    pub fn depth(&self) -> usize {
        self.hierarchy.matches('_').count()
    }
}

/// One policy topic entry attached to a disapproved ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyEvidence {
    pub topic: String,
    #[serde(rename = "type")]
    pub topic_type: String,
    pub texts: Vec<String>,
}

/// Type-specific creative fields kept for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdDetails {
    TextAd {
        headline: String,
        description1: String,
        description2: String,
    },
    ExpandedTextAd {
        headline_part1: String,
        headline_part2: String,
        headline_part3: String,
        description: String,
        description2: String,
    },
    ResponsiveSearchAd {
        headlines: Vec<String>,
        descriptions: Vec<String>,
        path1: String,
        path2: String,
    },
    Unknown {
        ad_type: String,
    },
}

/// A disapproved ad as returned by the ads API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisapprovedAd {
    pub account_id: String,
    pub hierarchy: String,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub ad_id: String,
    pub ad_type: String,
    pub final_urls: Vec<String>,
    /// Lowercased policy topics.
    pub policy_topics: Vec<String>,
    pub evidences: Vec<PolicyEvidence>,
    pub details: AdDetails,
}

impl DisapprovedAd {
    /// Resource name used by the mutate endpoint to address this ad.
    pub fn resource_name(&self) -> String {
        format!(
            "customers/{}/adGroupAds/{}~{}",
            self.account_id, self.ad_group_id, self.ad_id
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemovalStatus {
    Scanned,
    Removed,
    FailedToRemove,
}

impl RemovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scanned => "SCANNED",
            Self::Removed => "REMOVED",
            Self::FailedToRemove => "FAILED_TO_REMOVE",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Scanned)
    }
}

impl fmt::Display for RemovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ad eligible for removal and where it stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalCandidate {
    pub ad: DisapprovedAd,
    pub status: RemovalStatus,
    pub removal_error: Option<String>,
}

impl RemovalCandidate {
    pub fn scanned(ad: DisapprovedAd) -> Self {
        Self {
            ad,
            status: RemovalStatus::Scanned,
            removal_error: None,
        }
    }

    /// Terminal statuses are written once; later calls are ignored.
    pub fn mark_removed(&mut self) {
        if !self.status.is_terminal() {
            self.status = RemovalStatus::Removed;
        }
    }

    pub fn mark_failed(&mut self, error: String) {
        if !self.status.is_terminal() {
            self.status = RemovalStatus::FailedToRemove;
            self.removal_error = Some(error);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub account_id: String,
    pub ads_to_remove_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MccSummary {
    pub account_id: String,
    pub total_sub_accounts: usize,
    pub accounts_with_ads_to_remove: usize,
    pub accounts_without_ads_to_remove: usize,
    pub total_ads_to_remove: usize,
}

impl MccSummary {
    pub fn new(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            ..Self::default()
        }
    }

    pub fn add(&mut self, ads_to_remove_count: usize) {
        self.total_sub_accounts += 1;
        self.total_ads_to_remove += ads_to_remove_count;
        if ads_to_remove_count > 0 {
            self.accounts_with_ads_to_remove += 1;
        } else {
            self.accounts_without_ads_to_remove += 1;
        }
    }
}
