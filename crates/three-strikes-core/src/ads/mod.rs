pub mod query;
pub mod response;
pub mod rest;

use crate::model::DisapprovedAd;
use std::fmt;
use thiserror::Error;
use tracing::error;

pub use rest::GoogleAdsRestClient;

/// The slice of the ads-management API this tool needs.
///
/// Implementations are shared across worker threads for the whole run.
pub trait AdsApi: Send + Sync {
    /// Direct children of `customer_id`, either managers or non-managers.
    fn sub_accounts(&self, customer_id: &str, managers: bool) -> Result<Vec<String>, AdsApiError>;

    /// Disapproved, non-removed ads of one account with every page consumed.
    /// `hierarchy` is copied onto each ad.
    fn disapproved_ads(
        &self,
        customer_id: &str,
        hierarchy: &str,
    ) -> Result<Vec<DisapprovedAd>, AdsApiError>;

    /// Bulk remove with partial failure enabled. Per-operation failures are reported in
    /// the outcome; only request-level failures are errors.
    fn remove_ads(
        &self,
        customer_id: &str,
        resource_names: &[String],
    ) -> Result<MutateOutcome, AdsApiError>;
}

/// Result of a partial-failure mutate call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutateOutcome {
    /// One entry per submitted operation; `None` where the operation failed.
    pub results: Vec<Option<String>>,
    pub failures: Vec<OperationFailure>,
}

impl MutateOutcome {
    pub fn all_succeeded(resource_names: &[String]) -> Self {
        Self {
            results: resource_names.iter().cloned().map(Some).collect(),
            failures: Vec::new(),
        }
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    /// Position of the failed operation in the submitted batch.
    pub index: usize,
    pub error_code: String,
    pub message: String,
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiErrorDetail {
    pub message: String,
    pub error_code: String,
    pub field_paths: Vec<String>,
}

#[derive(Error, Debug)]
pub enum AdsApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request {request_id} failed with status {status} ({http_status}): {summary}", summary = summarize(.errors))]
    Api {
        http_status: u16,
        status: String,
        request_id: String,
        errors: Vec<ApiErrorDetail>,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

fn summarize(errors: &[ApiErrorDetail]) -> String {
    match errors {
        [] => "no error details".to_string(),
        [only] => only.message.clone(),
        [first, rest @ ..] => format!("{} (+{} more)", first.message, rest.len()),
    }
}

impl AdsApiError {
    /// Log every detail the API returned for a failed request.
    pub fn log_details(&self) {
        match self {
            AdsApiError::Api {
                http_status,
                status,
                request_id,
                errors,
            } => {
                error!(
                    request_id = %request_id,
                    status = %status,
                    http_status = *http_status,
                    "Request with ID \"{}\" failed with status \"{}\" and includes {} error(s)",
                    request_id,
                    status,
                    errors.len()
                );
                for detail in errors {
                    error!(
                        request_id = %request_id,
                        error_code = %detail.error_code,
                        "Error with message \"{}\"",
                        detail.message
                    );
                    for field in &detail.field_paths {
                        error!(request_id = %request_id, "On field: {}", field);
                    }
                }
            }
            other => error!("Ads API call failed: {}", other),
        }
    }
}
