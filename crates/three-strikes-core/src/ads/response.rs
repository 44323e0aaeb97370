//! JSON shapes of the Google Ads REST endpoints and their mapping onto the domain model.

use super::{AdsApiError, ApiErrorDetail, MutateOutcome, OperationFailure};
use crate::model::{AdDetails, DisapprovedAd, PolicyEvidence};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

/// int64 fields arrive as JSON strings, but tolerate plain numbers too.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(u64),
    }
    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Str(s)) => s,
        Some(Id::Num(n)) => n.to_string(),
        None => String::new(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStreamBatch {
    #[serde(default)]
    pub results: Vec<GoogleAdsRow>,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAdsRow {
    pub customer_client: Option<CustomerClient>,
    pub campaign: Option<Campaign>,
    pub ad_group_ad: Option<AdGroupAd>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerClient {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Campaign {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupAd {
    #[serde(default)]
    pub ad_group: String,
    #[serde(default)]
    pub ad: Ad,
    #[serde(default)]
    pub policy_summary: PolicySummary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, rename = "type")]
    pub ad_type: String,
    #[serde(default)]
    pub final_urls: Vec<String>,
    pub text_ad: Option<TextAdInfo>,
    pub expanded_text_ad: Option<ExpandedTextAdInfo>,
    pub responsive_search_ad: Option<ResponsiveSearchAdInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TextAdInfo {
    pub headline: String,
    pub description1: String,
    pub description2: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpandedTextAdInfo {
    pub headline_part1: String,
    pub headline_part2: String,
    pub headline_part3: String,
    pub description: String,
    pub description2: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResponsiveSearchAdInfo {
    pub headlines: Vec<AdTextAsset>,
    pub descriptions: Vec<AdTextAsset>,
    pub path1: String,
    pub path2: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdTextAsset {
    pub text: String,
    pub pinned_field: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicySummary {
    pub approval_status: String,
    pub policy_topic_entries: Vec<PolicyTopicEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PolicyTopicEntry {
    pub topic: String,
    #[serde(rename = "type")]
    pub topic_type: String,
    pub evidences: Vec<PolicyTopicEvidence>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyTopicEvidence {
    pub text_list: Option<TextList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TextList {
    pub texts: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MutateAdGroupAdsResponse {
    pub results: Vec<MutateResult>,
    pub partial_failure_error: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MutateResult {
    pub resource_name: Option<String>,
}

/// `google.rpc.Status`, as found in partial failures and error bodies.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Status {
    pub code: i64,
    pub message: String,
    pub status: String,
    pub details: Vec<GoogleAdsFailure>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoogleAdsFailure {
    pub errors: Vec<GoogleAdsError>,
    pub request_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoogleAdsError {
    /// A one-key object such as `{"mutateError": "RESOURCE_NOT_FOUND"}`.
    pub error_code: serde_json::Map<String, serde_json::Value>,
    pub message: String,
    pub location: Option<ErrorLocation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorLocation {
    pub field_path_elements: Vec<FieldPathElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldPathElement {
    pub field_name: String,
    pub index: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

impl GoogleAdsError {
    pub fn error_code_string(&self) -> String {
        self.error_code
            .iter()
            .map(|(kind, value)| match value.as_str() {
                Some(v) => format!("{}.{}", kind, v),
                None => format!("{}.{}", kind, value),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    fn field_paths(&self) -> Vec<String> {
        self.location
            .iter()
            .flat_map(|l| l.field_path_elements.iter())
            .map(|e| match e.index {
                Some(i) => format!("{}[{}]", e.field_name, i),
                None => e.field_name.clone(),
            })
            .collect()
    }
}

/// Ids of the customer clients in a stream, minus the queried customer itself.
pub fn customer_ids(batches: &[SearchStreamBatch], queried_id: &str) -> Vec<String> {
    batches
        .iter()
        .flat_map(|b| b.results.iter())
        .filter_map(|row| row.customer_client.as_ref())
        .map(|c| c.id.clone())
        .filter(|id| !id.is_empty() && id != queried_id)
        .collect()
}

pub fn disapproved_ads(
    batches: Vec<SearchStreamBatch>,
    account_id: &str,
    hierarchy: &str,
) -> Vec<DisapprovedAd> {
    let mut ads = Vec::new();
    for batch in batches {
        for row in batch.results {
            let Some(ad_group_ad) = row.ad_group_ad else {
                continue;
            };
            let campaign_id = row.campaign.map(|c| c.id).unwrap_or_default();
            ads.push(to_disapproved_ad(ad_group_ad, campaign_id, account_id, hierarchy));
        }
    }
    ads
}

fn to_disapproved_ad(
    ad_group_ad: AdGroupAd,
    campaign_id: String,
    account_id: &str,
    hierarchy: &str,
) -> DisapprovedAd {
    let AdGroupAd {
        ad_group,
        ad,
        policy_summary,
    } = ad_group_ad;

    let policy_topics: Vec<String> = policy_summary
        .policy_topic_entries
        .iter()
        .map(|e| e.topic.to_lowercase())
        .collect();

    let evidences = policy_summary
        .policy_topic_entries
        .into_iter()
        .map(|entry| {
            debug!("\ttopic: \"{}\", type \"{}\"", entry.topic, entry.topic_type);
            PolicyEvidence {
                topic: entry.topic,
                topic_type: entry.topic_type,
                texts: entry
                    .evidences
                    .into_iter()
                    .filter_map(|e| e.text_list)
                    .flat_map(|t| t.texts)
                    .collect(),
            }
        })
        .collect();

    let details = ad_details(&ad);

    DisapprovedAd {
        account_id: account_id.to_string(),
        hierarchy: hierarchy.to_string(),
        campaign_id,
        ad_group_id: ad_group_id(&ad_group),
        ad_id: ad.id,
        ad_type: ad.ad_type,
        final_urls: ad.final_urls,
        policy_topics,
        evidences,
        details,
    }
}

/// Pull the ad group id out of `customers/{cid}/adGroups/{id}`; anything else is kept as is.
pub fn ad_group_id(resource_name: &str) -> String {
    let parts: Vec<&str> = resource_name.split('/').collect();
    match parts.as_slice() {
        ["customers", cid, "adGroups", id]
            if !cid.is_empty() && !id.is_empty() && is_word(cid) && is_word(id) =>
        {
            id.to_string()
        }
        _ => resource_name.to_string(),
    }
}

fn is_word(s: &str) -> bool {
    s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn ad_details(ad: &Ad) -> AdDetails {
    match ad.ad_type.to_uppercase().as_str() {
        "TEXT_AD" => {
            let info = ad.text_ad.as_ref();
            AdDetails::TextAd {
                headline: info.map(|i| i.headline.clone()).unwrap_or_default(),
                description1: info.map(|i| i.description1.clone()).unwrap_or_default(),
                description2: info.map(|i| i.description2.clone()).unwrap_or_default(),
            }
        }
        "EXPANDED_TEXT_AD" => {
            let default = ExpandedTextAdInfo::default();
            let info = ad.expanded_text_ad.as_ref().unwrap_or(&default);
            AdDetails::ExpandedTextAd {
                headline_part1: info.headline_part1.clone(),
                headline_part2: info.headline_part2.clone(),
                headline_part3: info.headline_part3.clone(),
                description: info.description.clone(),
                description2: info.description2.clone(),
            }
        }
        "RESPONSIVE_SEARCH_AD" => {
            let default = ResponsiveSearchAdInfo::default();
            let info = ad.responsive_search_ad.as_ref().unwrap_or(&default);
            AdDetails::ResponsiveSearchAd {
                headlines: info.headlines.iter().map(asset_text).collect(),
                descriptions: info.descriptions.iter().map(asset_text).collect(),
                path1: info.path1.clone(),
                path2: info.path2.clone(),
            }
        }
        other => AdDetails::Unknown {
            ad_type: other.to_string(),
        },
    }
}

fn asset_text(asset: &AdTextAsset) -> String {
    match asset.pinned_field.as_deref() {
        Some(pin) if pin != "UNSPECIFIED" && pin != "UNKNOWN" && !pin.is_empty() => {
            format!("{}: {}", pin, asset.text)
        }
        _ => asset.text.clone(),
    }
}

pub fn mutate_outcome(response: MutateAdGroupAdsResponse) -> MutateOutcome {
    let results = response
        .results
        .into_iter()
        .map(|r| r.resource_name.filter(|n| !n.is_empty()))
        .collect();

    let mut failures = Vec::new();
    if let Some(status) = response.partial_failure_error.filter(|s| s.code != 0) {
        for failure in status.details {
            for error in failure.errors {
                let index = error
                    .location
                    .as_ref()
                    .and_then(|l| l.field_path_elements.first())
                    .and_then(|e| e.index);
                match index {
                    Some(index) => failures.push(OperationFailure {
                        index,
                        error_code: error.error_code_string(),
                        message: error.message,
                    }),
                    None => warn!(
                        request_id = %failure.request_id,
                        "Partial failure without an operation index: {}",
                        error.message
                    ),
                }
            }
        }
    }

    MutateOutcome { results, failures }
}

/// Map a non-success response body onto a structured error.
pub fn api_error(http_status: u16, body: &str) -> AdsApiError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok().or_else(|| {
        serde_json::from_str::<Vec<ErrorEnvelope>>(body)
            .ok()
            .and_then(|v| v.into_iter().next())
    });

    match envelope {
        Some(ErrorEnvelope { error }) => {
            let request_id = error
                .details
                .iter()
                .map(|d| d.request_id.clone())
                .find(|id| !id.is_empty())
                .unwrap_or_default();
            let mut errors: Vec<ApiErrorDetail> = error
                .details
                .iter()
                .flat_map(|d| d.errors.iter())
                .map(|e| ApiErrorDetail {
                    message: e.message.clone(),
                    error_code: e.error_code_string(),
                    field_paths: e.field_paths(),
                })
                .collect();
            if errors.is_empty() {
                errors.push(ApiErrorDetail {
                    message: error.message.clone(),
                    ..ApiErrorDetail::default()
                });
            }
            AdsApiError::Api {
                http_status,
                status: error.status,
                request_id,
                errors,
            }
        }
        None => AdsApiError::Api {
            http_status,
            status: String::new(),
            request_id: String::new(),
            errors: vec![ApiErrorDetail {
                message: body.chars().take(500).collect(),
                ..ApiErrorDetail::default()
            }],
        },
    }
}
