use crate::model::RemovalCandidate;
use serde::Serialize;

/// Flat shape of a removal candidate in the `AdsToRemove` table.
#[derive(Debug, Clone, Serialize)]
pub struct AdRow<'a> {
    pub ad_id: &'a str,
    pub ad_type: &'a str,
    pub ad_group_id: &'a str,
    pub campaign_id: &'a str,
    pub hierarchy: &'a str,
    pub account_id: &'a str,
    pub final_urls: String,
    pub policy_topics: String,
    pub evidences: String,
    pub mandatory_data: String,
    pub removal_status: &'static str,
    pub removal_error: Option<&'a str>,
}

impl<'a> AdRow<'a> {
    pub fn from_candidate(candidate: &'a RemovalCandidate) -> Result<Self, serde_json::Error> {
        let ad = &candidate.ad;
        Ok(Self {
            ad_id: &ad.ad_id,
            ad_type: &ad.ad_type,
            ad_group_id: &ad.ad_group_id,
            campaign_id: &ad.campaign_id,
            hierarchy: &ad.hierarchy,
            account_id: &ad.account_id,
            final_urls: ad.final_urls.join(", "),
            policy_topics: serde_json::to_string(&ad.policy_topics)?,
            evidences: serde_json::to_string(&ad.evidences)?,
            mandatory_data: serde_json::to_string(&ad.details)?,
            removal_status: candidate.status.as_str(),
            removal_error: candidate.removal_error.as_deref(),
        })
    }
}
