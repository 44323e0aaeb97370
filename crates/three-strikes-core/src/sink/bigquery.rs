use super::schema::{self, parameter_type};
use super::{Table, Warehouse, WarehouseError};
use crate::batch;
use crate::config::WarehouseConfig;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// BigQuery's cap on named parameters in one query.
const MAX_QUERY_PARAMETERS: usize = 10_000;
/// Server-side wait for each `queries` call; longer jobs are polled.
const POLL_WAIT: Duration = Duration::from_secs(10);

/// BigQuery through its v2 REST API.
pub struct BigQueryClient {
    http: Client,
    project_url: String,
    project_id: String,
    dataset: String,
    location: String,
    access_token: String,
    insert_chunk_size: usize,
    query_timeout: Duration,
    max_rows_to_delete: usize,
    outdated_after_minutes: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InsertAllResponse {
    insert_errors: Vec<InsertError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InsertError {
    index: usize,
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorProto {
    reason: String,
    message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryResponse {
    pub job_complete: bool,
    pub job_reference: Option<JobReference>,
    pub num_dml_affected_rows: Option<String>,
}

impl QueryResponse {
    pub fn affected_rows(&self) -> u64 {
        self.num_dml_affected_rows
            .as_deref()
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }
}

impl BigQueryClient {
    /// Connect and make sure the dataset exists.
    pub fn connect(config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_secs.max(config.query_timeout_secs),
            ))
            .build()?;
        let client = Self {
            http,
            project_url: format!(
                "{}/projects/{}",
                config.endpoint.trim_end_matches('/'),
                config.project_id
            ),
            project_id: config.project_id.clone(),
            dataset: config.dataset.clone(),
            location: config.location.clone(),
            access_token: config.access_token.clone(),
            insert_chunk_size: config.insert_chunk_size,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
            max_rows_to_delete: config.max_rows_to_delete,
            outdated_after_minutes: config.outdated_after_minutes,
        };
        client.ensure_dataset()?;
        Ok(client)
    }

    pub fn table_full_name(&self, table: Table) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset, table.name())
    }

    fn table_url(&self, table: Table) -> String {
        format!(
            "{}/datasets/{}/tables/{}",
            self.project_url,
            self.dataset,
            table.name()
        )
    }

    /// Send a request; a 404 comes back as `None`.
    fn call(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<Option<Value>, WarehouseError> {
        let resp = request.bearer_auth(&self.access_token).send()?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.text()?;
        if !status.is_success() {
            return Err(WarehouseError::Api {
                operation: operation.to_string(),
                http_status: status.as_u16(),
                message: body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Some(Value::Null));
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| WarehouseError::Decode(format!("{}: {}", operation, e)))
    }

    fn ensure_dataset(&self) -> Result<(), WarehouseError> {
        let url = format!("{}/datasets/{}", self.project_url, self.dataset);
        if self.call("get dataset", self.http.get(&url))?.is_some() {
            debug!("Dataset {}.{} already exists", self.project_id, self.dataset);
            return Ok(());
        }
        info!("Dataset {}.{} is not found", self.project_id, self.dataset);
        let body = json!({
            "datasetReference": {"projectId": self.project_id, "datasetId": self.dataset},
            "location": self.location,
        });
        self.call(
            "create dataset",
            self.http
                .post(format!("{}/datasets", self.project_url))
                .json(&body),
        )?;
        info!("Created dataset {}.{}", self.project_id, self.dataset);
        Ok(())
    }

    fn run_query(
        &self,
        query: &str,
        parameters: Vec<Value>,
    ) -> Result<QueryResponse, WarehouseError> {
        let mut body = json!({
            "query": query,
            "useLegacySql": false,
            "timeoutMs": POLL_WAIT.as_millis() as u64,
            "location": self.location,
        });
        if !parameters.is_empty() {
            body["parameterMode"] = json!("NAMED");
            body["queryParameters"] = Value::Array(parameters);
        }
        let value = self
            .call(
                "query",
                self.http
                    .post(format!("{}/queries", self.project_url))
                    .json(&body),
            )?
            .ok_or_else(|| WarehouseError::Decode("query endpoint not found".to_string()))?;
        let first = decode_query_response(value)?;
        wait_for_job(first, self.query_timeout, |job| self.query_results(job))
    }

    fn query_results(&self, job: &JobReference) -> Result<QueryResponse, WarehouseError> {
        let location = job.location.as_deref().unwrap_or(&self.location);
        let url = format!(
            "{}/queries/{}?location={}&timeoutMs={}&maxResults=0",
            self.project_url,
            job.job_id,
            location,
            POLL_WAIT.as_millis()
        );
        let value = self
            .call("get query results", self.http.get(url))?
            .ok_or_else(|| WarehouseError::Api {
                operation: "get query results".to_string(),
                http_status: 404,
                message: format!("job {} not found", job.job_id),
            })?;
        decode_query_response(value)
    }

    pub fn outdated_rows_query(&self, table: Table) -> String {
        outdated_rows_statement(
            &self.table_full_name(table),
            self.outdated_after_minutes,
            self.max_rows_to_delete,
        )
    }

    fn rows_per_insert_query(&self, table: Table) -> usize {
        let columns = schema::fields(table).len().max(1);
        (MAX_QUERY_PARAMETERS / columns).clamp(1, self.insert_chunk_size.max(1))
    }
}

fn decode_insert_response(value: Value) -> Result<InsertAllResponse, WarehouseError> {
    serde_json::from_value(value).map_err(|e| WarehouseError::Decode(format!("insert rows: {}", e)))
}

fn decode_query_response(value: Value) -> Result<QueryResponse, WarehouseError> {
    serde_json::from_value(value).map_err(|e| WarehouseError::Decode(format!("query: {}", e)))
}

/// Poll an unfinished query job through `poll` until it completes or `timeout` elapses.
pub fn wait_for_job<F>(
    first: QueryResponse,
    timeout: Duration,
    mut poll: F,
) -> Result<QueryResponse, WarehouseError>
where
    F: FnMut(&JobReference) -> Result<QueryResponse, WarehouseError>,
{
    let started = Instant::now();
    let mut response = first;
    while !response.job_complete {
        let job = response.job_reference.clone().ok_or_else(|| {
            WarehouseError::Decode("unfinished query without a job reference".to_string())
        })?;
        if started.elapsed() >= timeout {
            return Err(WarehouseError::Api {
                operation: "query".to_string(),
                http_status: 200,
                message: format!("job {} did not complete within {:?}", job.job_id, timeout),
            });
        }
        debug!("Waiting for query job {}", job.job_id);
        response = poll(&job)?;
        if response.job_reference.is_none() {
            response.job_reference = Some(job);
        }
    }
    Ok(response)
}

/// Delete rows older than `minutes` that are not their ad's newest row, oldest first and
/// at most `limit` of them.
pub fn outdated_rows_statement(full_name: &str, minutes: u64, limit: usize) -> String {
    format!(
        "DELETE FROM `{t}` \
         WHERE CONCAT(ad_id, '|', session_id, '|', CAST(timestamp AS STRING)) IN ( \
             SELECT CONCAT(ad_id, '|', session_id, '|', CAST(timestamp AS STRING)) \
             FROM ( \
                 SELECT ad_id, session_id, timestamp, \
                        MAX(timestamp) OVER (PARTITION BY ad_id) AS latest \
                 FROM `{t}`) \
             WHERE timestamp < latest \
               AND timestamp < TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL {m} MINUTE) \
             ORDER BY timestamp \
             LIMIT {n})",
        t = full_name,
        m = minutes,
        n = limit,
    )
}

fn query_parameter(table: Table, column: &str, value: &Value) -> Value {
    let value = match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    };
    json!({
        "name": column,
        "parameterType": {"type": parameter_type(table, column)},
        "parameterValue": {"value": value},
    })
}

/// A multi-row `INSERT` statement over the table's schema columns. Columns a row lacks
/// are bound as NULL.
pub fn insert_statement(
    full_name: &str,
    table: Table,
    rows: &[Value],
) -> Option<(String, Vec<Value>)> {
    if rows.is_empty() {
        return None;
    }
    let columns: Vec<&str> = schema::fields(table).iter().map(|f| f.name).collect();
    let mut tuples = Vec::with_capacity(rows.len());
    let mut parameters = Vec::with_capacity(rows.len() * columns.len());

    for (i, row) in rows.iter().enumerate() {
        let object = row.as_object()?;
        let mut placeholders = Vec::with_capacity(columns.len());
        for column in &columns {
            let name = format!("{}_{}", column, i);
            let value = object.get(*column).unwrap_or(&Value::Null);
            let mut parameter = query_parameter(table, column, value);
            parameter["name"] = json!(name);
            placeholders.push(format!("@{}", name));
            parameters.push(parameter);
        }
        tuples.push(format!("({})", placeholders.join(", ")));
    }

    let statement = format!(
        "INSERT INTO `{}` ({}) VALUES {}",
        full_name,
        columns.join(", "),
        tuples.join(", ")
    );
    Some((statement, parameters))
}

/// An `UPDATE` statement and its parameters for one keyed row.
pub fn update_statement(
    full_name: &str,
    table: Table,
    key_columns: &[&str],
    row: &Value,
) -> Option<(String, Vec<Value>)> {
    let object = row.as_object()?;
    let mut assignments = Vec::new();
    let mut conditions = Vec::new();
    let mut parameters = Vec::new();

    for (column, value) in object {
        if key_columns.contains(&column.as_str()) {
            continue;
        }
        assignments.push(format!("{c} = @{c}", c = column));
        parameters.push(query_parameter(table, column, value));
    }
    for key in key_columns {
        let value = object.get(*key)?;
        conditions.push(format!("{k} = @{k}", k = key));
        parameters.push(query_parameter(table, key, value));
    }
    if assignments.is_empty() {
        return None;
    }

    let statement = format!(
        "UPDATE `{}` SET {} WHERE {}",
        full_name,
        assignments.join(", "),
        conditions.join(" AND ")
    );
    Some((statement, parameters))
}

impl Warehouse for BigQueryClient {
    fn ensure_table(&self, table: Table) -> Result<(), WarehouseError> {
        let full_name = self.table_full_name(table);
        if self
            .call("get table", self.http.get(self.table_url(table)))?
            .is_some()
        {
            debug!("Table {} already exists", full_name);
            return Ok(());
        }
        info!("Table {} is not found", full_name);
        let body = json!({
            "tableReference": {
                "projectId": self.project_id,
                "datasetId": self.dataset,
                "tableId": table.name(),
            },
            "schema": {"fields": schema::fields(table)},
        });
        self.call(
            "create table",
            self.http
                .post(format!("{}/datasets/{}/tables", self.project_url, self.dataset))
                .json(&body),
        )?;
        info!("Created table {}", full_name);
        Ok(())
    }

    fn insert_rows(&self, table: Table, rows: &[Value]) -> Result<usize, WarehouseError> {
        let mut accepted = 0;
        for rows_chunk in batch::chunk(rows.to_vec(), self.insert_chunk_size) {
            if rows_chunk.is_empty() {
                continue;
            }
            let body = json!({
                "rows": rows_chunk.iter().map(|r| json!({"json": r})).collect::<Vec<_>>(),
            });
            let value = self
                .call(
                    "insert rows",
                    self.http
                        .post(format!("{}/insertAll", self.table_url(table)))
                        .json(&body),
                )?
                .ok_or_else(|| WarehouseError::Api {
                    operation: "insert rows".to_string(),
                    http_status: 404,
                    message: format!("table {} not found", self.table_full_name(table)),
                })?;
            let response = decode_insert_response(value)?;
            if response.insert_errors.is_empty() {
                debug!("{} new rows have been added to {}", rows_chunk.len(), table);
                accepted += rows_chunk.len();
            } else {
                for insert_error in &response.insert_errors {
                    for e in &insert_error.errors {
                        error!(
                            table = %table,
                            row = insert_error.index,
                            reason = %e.reason,
                            "Encountered errors while inserting rows: {}",
                            e.message
                        );
                    }
                }
                accepted += rows_chunk.len().saturating_sub(response.insert_errors.len());
            }
        }
        Ok(accepted)
    }

    fn insert_rows_by_query(&self, table: Table, rows: &[Value]) -> Result<usize, WarehouseError> {
        let full_name = self.table_full_name(table);
        let mut inserted = 0;
        for rows_chunk in rows.chunks(self.rows_per_insert_query(table)) {
            let Some((statement, parameters)) = insert_statement(&full_name, table, rows_chunk)
            else {
                return Err(WarehouseError::Decode(format!(
                    "rows for {} are not JSON objects",
                    table
                )));
            };
            let response = self.run_query(&statement, parameters)?;
            inserted += response.affected_rows() as usize;
        }
        debug!("{} new rows have been added to {} by DML", inserted, table);
        Ok(inserted)
    }

    fn update_rows_by_key(
        &self,
        table: Table,
        key_columns: &[&str],
        rows: &[Value],
    ) -> Result<usize, WarehouseError> {
        let full_name = self.table_full_name(table);
        let mut updated = 0;
        for row in rows {
            let Some((statement, parameters)) =
                update_statement(&full_name, table, key_columns, row)
            else {
                error!(table = %table, "Row lacks key columns {:?}, not updated", key_columns);
                continue;
            };
            let response = self.run_query(&statement, parameters)?;
            updated += response.affected_rows() as usize;
        }
        debug!("Updated {} rows in {}", updated, table);
        Ok(updated)
    }

    fn delete_table(&self, table: Table) -> Result<(), WarehouseError> {
        let full_name = self.table_full_name(table);
        match self.call("delete table", self.http.delete(self.table_url(table)))? {
            Some(_) => info!("Deleted table '{}'", full_name),
            None => debug!("Table '{}' did not exist", full_name),
        }
        Ok(())
    }

    fn remove_outdated_rows(&self, table: Table) -> Result<u64, WarehouseError> {
        let response = self.run_query(&self.outdated_rows_query(table), Vec::new())?;
        let affected = response.affected_rows();
        info!("DML query modified {} rows", affected);
        Ok(affected)
    }
}
