use super::response::{self, MutateAdGroupAdsResponse, SearchStreamBatch};
use super::{query, AdsApi, AdsApiError, MutateOutcome};
use crate::config::AdsApiConfig;
use crate::model::DisapprovedAd;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

/// Google Ads API over its REST transport.
///
/// Credentials are taken as-is from configuration; minting the OAuth access token is
/// left to whatever runs this tool.
pub struct GoogleAdsRestClient {
    http: Client,
    base_url: String,
    developer_token: String,
    access_token: String,
    login_customer_id: Option<String>,
}

impl GoogleAdsRestClient {
    pub fn new(config: &AdsApiConfig) -> Result<Self, AdsApiError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: format!(
                "{}/{}",
                config.endpoint.trim_end_matches('/'),
                config.api_version
            ),
            developer_token: config.developer_token.clone(),
            access_token: config.access_token.clone(),
            login_customer_id: config
                .login_customer_id
                .as_deref()
                .map(crate::accounts::normalize_account_id),
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request = self
            .http
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .header("developer-token", &self.developer_token);
        match &self.login_customer_id {
            Some(id) => request.header("login-customer-id", id),
            None => request,
        }
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AdsApiError> {
        let resp = request.send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(response::api_error(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|e| AdsApiError::Decode(e.to_string()))
    }

    fn search_stream(
        &self,
        customer_id: &str,
        query: &str,
    ) -> Result<Vec<SearchStreamBatch>, AdsApiError> {
        let request = self
            .post(&format!("customers/{}/googleAds:searchStream", customer_id))
            .json(&json!({ "query": query }));
        let batches: Vec<SearchStreamBatch> = self.send(request)?;
        debug!(
            customer_id,
            batches = batches.len(),
            request_id = batches.first().map(|b| b.request_id.as_str()).unwrap_or(""),
            "searchStream completed"
        );
        Ok(batches)
    }
}

impl AdsApi for GoogleAdsRestClient {
    fn sub_accounts(&self, customer_id: &str, managers: bool) -> Result<Vec<String>, AdsApiError> {
        let batches = self.search_stream(customer_id, &query::sub_accounts(managers))?;
        Ok(response::customer_ids(&batches, customer_id))
    }

    fn disapproved_ads(
        &self,
        customer_id: &str,
        hierarchy: &str,
    ) -> Result<Vec<DisapprovedAd>, AdsApiError> {
        let batches = self.search_stream(customer_id, query::DISAPPROVED_ADS)?;
        Ok(response::disapproved_ads(batches, customer_id, hierarchy))
    }

    fn remove_ads(
        &self,
        customer_id: &str,
        resource_names: &[String],
    ) -> Result<MutateOutcome, AdsApiError> {
        let operations: Vec<_> = resource_names
            .iter()
            .map(|name| json!({ "remove": name }))
            .collect();
        let request = self
            .post(&format!("customers/{}/adGroupAds:mutate", customer_id))
            .json(&json!({
                "operations": operations,
                "partialFailure": true,
            }));
        let mutated: MutateAdGroupAdsResponse = self.send(request)?;
        let outcome = response::mutate_outcome(mutated);
        if outcome.failures.is_empty() {
            info!(
                customer_id,
                "All {} remove operations completed successfully",
                resource_names.len()
            );
        }
        for removed in outcome.results.iter().flatten() {
            debug!("Removed ad group ad with resource_name: {}", removed);
        }
        Ok(outcome)
    }
}
