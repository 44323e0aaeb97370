use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ADS_ENDPOINT: &str = "https://googleads.googleapis.com";
pub const DEFAULT_ADS_API_VERSION: &str = "v17";
pub const DEFAULT_WAREHOUSE_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_DATASET: &str = "google_3_strikes";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub topics_file: PathBuf,
    pub output_dir: PathBuf,
    pub remove_batch_size: usize,
    pub retry_attempts: usize,
    /// Worker threads for parallel mode; rayon picks when unset.
    pub workers: Option<usize>,
    pub max_depth: usize,
    pub ads: AdsApiConfig,
    pub warehouse: WarehouseConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdsApiConfig {
    pub endpoint: String,
    pub api_version: String,
    pub developer_token: String,
    pub access_token: String,
    pub login_customer_id: Option<String>,
    pub connect_timeout_secs: u64,
    /// Bound on a whole request, streamed body included; 0 disables it.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub endpoint: String,
    pub project_id: String,
    pub access_token: String,
    pub dataset: String,
    pub location: String,
    pub insert_chunk_size: usize,
    pub query_timeout_secs: u64,
    pub max_rows_to_delete: usize,
    pub outdated_after_minutes: u64,
    /// Reconciled removal statuses update the staged rows instead of appending new ones.
    pub update_status_in_place: bool,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            topics_file: PathBuf::from("./topics_substrings.json"),
            output_dir: PathBuf::from("./output"),
            remove_batch_size: 5000,
            retry_attempts: 2,
            workers: None,
            max_depth: 64,
            ads: AdsApiConfig::default(),
            warehouse: WarehouseConfig::default(),
        }
    }
}

impl Default for AdsApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ADS_ENDPOINT.to_string(),
            api_version: DEFAULT_ADS_API_VERSION.to_string(),
            developer_token: String::new(),
            access_token: String::new(),
            login_customer_id: None,
            connect_timeout_secs: 15,
            timeout_secs: 3600,
        }
    }
}

impl AdsApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WAREHOUSE_ENDPOINT.to_string(),
            project_id: String::new(),
            access_token: String::new(),
            dataset: DEFAULT_DATASET.to_string(),
            location: "EU".to_string(),
            insert_chunk_size: 1000,
            query_timeout_secs: 600,
            max_rows_to_delete: 2000,
            outdated_after_minutes: 120,
            update_status_in_place: false,
            timeout_secs: 30,
        }
    }
}

/// Load `<name>.toml` (optional) overridden by `THREE_STRIKES__*` environment variables.
pub fn load_configuration(name: &str) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name(name).required(false))
        .add_source(
            Environment::with_prefix("THREE_STRIKES")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
