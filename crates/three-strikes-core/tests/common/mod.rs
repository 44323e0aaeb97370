#![allow(dead_code)]

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use three_strikes_core::ads::{AdsApi, AdsApiError, ApiErrorDetail, MutateOutcome, OperationFailure};
use three_strikes_core::model::{AdDetails, DisapprovedAd};
use three_strikes_core::sink::{JsonFileSink, Recorder, Table, Warehouse, WarehouseError};
use three_strikes_core::Session;

/// In-memory ads API serving a fixed account tree and fixed ads.
#[derive(Default)]
pub struct FakeAdsApi {
    leaves: HashMap<String, Vec<String>>,
    managers: HashMap<String, Vec<String>>,
    ads: HashMap<String, Vec<DisapprovedAd>>,
    failing_indices: Vec<usize>,
    mutate_errors_left: Mutex<usize>,
    pub mutate_calls: Mutex<Vec<(String, Vec<String>)>>,
    pub fetch_calls: Mutex<usize>,
}

impl FakeAdsApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leaves(mut self, parent: &str, children: &[&str]) -> Self {
        self.leaves
            .insert(parent.to_string(), children.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_managers(mut self, parent: &str, children: &[&str]) -> Self {
        self.managers
            .insert(parent.to_string(), children.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_ads(mut self, account_id: &str, ads: Vec<DisapprovedAd>) -> Self {
        self.ads.insert(account_id.to_string(), ads);
        self
    }

    /// Every mutate call reports a partial failure at these indices.
    pub fn failing_at(mut self, indices: &[usize]) -> Self {
        self.failing_indices = indices.to_vec();
        self
    }

    /// The next `count` mutate calls fail at the request level.
    pub fn failing_mutates(self, count: usize) -> Self {
        *self.mutate_errors_left.lock().unwrap() = count;
        self
    }

    pub fn mutate_call_count(&self) -> usize {
        self.mutate_calls.lock().unwrap().len()
    }
}

pub fn request_error() -> AdsApiError {
    AdsApiError::Api {
        http_status: 500,
        status: "INTERNAL".to_string(),
        request_id: "req-fake".to_string(),
        errors: vec![ApiErrorDetail {
            message: "Internal error encountered.".to_string(),
            error_code: "internalError.INTERNAL_ERROR".to_string(),
            field_paths: vec!["operations".to_string()],
        }],
    }
}

impl AdsApi for FakeAdsApi {
    fn sub_accounts(&self, customer_id: &str, managers: bool) -> Result<Vec<String>, AdsApiError> {
        let source = if managers { &self.managers } else { &self.leaves };
        Ok(source.get(customer_id).cloned().unwrap_or_default())
    }

    fn disapproved_ads(
        &self,
        customer_id: &str,
        hierarchy: &str,
    ) -> Result<Vec<DisapprovedAd>, AdsApiError> {
        *self.fetch_calls.lock().unwrap() += 1;
        Ok(self
            .ads
            .get(customer_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|mut ad| {
                ad.hierarchy = hierarchy.to_string();
                ad
            })
            .collect())
    }

    fn remove_ads(
        &self,
        customer_id: &str,
        resource_names: &[String],
    ) -> Result<MutateOutcome, AdsApiError> {
        self.mutate_calls
            .lock()
            .unwrap()
            .push((customer_id.to_string(), resource_names.to_vec()));

        {
            let mut left = self.mutate_errors_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(request_error());
            }
        }

        let mut outcome = MutateOutcome::all_succeeded(resource_names);
        for &index in &self.failing_indices {
            if index < resource_names.len() {
                outcome.results[index] = None;
                outcome.failures.push(OperationFailure {
                    index,
                    error_code: "mutateError.RESOURCE_NOT_FOUND".to_string(),
                    message: format!("Resource {} was not found.", resource_names[index]),
                });
            }
        }
        Ok(outcome)
    }
}

/// Warehouse keeping every call in memory.
#[derive(Default)]
pub struct FakeWarehouse {
    pub ensured: Mutex<Vec<Table>>,
    pub inserted: Mutex<HashMap<Table, Vec<Value>>>,
    pub inserted_by_query: Mutex<HashMap<Table, Vec<Value>>>,
    pub updated: Mutex<Vec<(Table, Vec<String>, Value)>>,
    pub deleted: Mutex<Vec<Table>>,
    pub cleaned: Mutex<Vec<Table>>,
}

impl FakeWarehouse {
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.inserted
            .lock()
            .unwrap()
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn rows_by_query(&self, table: Table) -> Vec<Value> {
        self.inserted_by_query
            .lock()
            .unwrap()
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }
}

impl Warehouse for FakeWarehouse {
    fn ensure_table(&self, table: Table) -> Result<(), WarehouseError> {
        self.ensured.lock().unwrap().push(table);
        Ok(())
    }

    fn insert_rows(&self, table: Table, rows: &[Value]) -> Result<usize, WarehouseError> {
        self.inserted
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows.len())
    }

    fn insert_rows_by_query(&self, table: Table, rows: &[Value]) -> Result<usize, WarehouseError> {
        self.inserted_by_query
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows.len())
    }

    fn update_rows_by_key(
        &self,
        table: Table,
        key_columns: &[&str],
        rows: &[Value],
    ) -> Result<usize, WarehouseError> {
        let keys: Vec<String> = key_columns.iter().map(|k| k.to_string()).collect();
        let mut updated = self.updated.lock().unwrap();
        for row in rows {
            updated.push((table, keys.clone(), row.clone()));
        }
        Ok(rows.len())
    }

    fn delete_table(&self, table: Table) -> Result<(), WarehouseError> {
        self.deleted.lock().unwrap().push(table);
        Ok(())
    }

    fn remove_outdated_rows(&self, table: Table) -> Result<u64, WarehouseError> {
        self.cleaned.lock().unwrap().push(table);
        Ok(7)
    }
}

pub fn ad(account_id: &str, ad_id: &str, topics: &[&str]) -> DisapprovedAd {
    DisapprovedAd {
        account_id: account_id.to_string(),
        hierarchy: account_id.to_string(),
        campaign_id: "900".to_string(),
        ad_group_id: "800".to_string(),
        ad_id: ad_id.to_string(),
        ad_type: "EXPANDED_TEXT_AD".to_string(),
        final_urls: vec![format!("https://example.com/{}", ad_id)],
        policy_topics: topics.iter().map(|t| t.to_lowercase()).collect(),
        evidences: vec![],
        details: AdDetails::ExpandedTextAd {
            headline_part1: "Great".to_string(),
            headline_part2: "Deals".to_string(),
            headline_part3: String::new(),
            description: "Buy".to_string(),
            description2: String::new(),
        },
    }
}

pub fn recorder(dir: &Path) -> Recorder {
    let session = Session::new();
    let files = JsonFileSink::create(dir, &session.file_suffix()).unwrap();
    Recorder::new(session, files)
}

pub fn recorder_with_warehouse(dir: &Path, warehouse: Arc<FakeWarehouse>, in_place: bool) -> Recorder {
    recorder(dir).with_warehouse(warehouse, in_place)
}

/// Every write event of a table's output file, one row array per line.
pub fn file_events(recorder: &Recorder, table: Table) -> Vec<Vec<Value>> {
    let path = recorder.files().path_for(table);
    match std::fs::read_to_string(path) {
        Ok(text) => text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).unwrap())
            .collect(),
        Err(_) => Vec::new(),
    }
}
