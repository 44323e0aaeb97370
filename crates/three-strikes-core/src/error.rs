use crate::ads::AdsApiError;
use crate::sink::WarehouseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ads API error: {0}")]
    AdsApi(#[from] AdsApiError),

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a fresh run of the whole pipeline may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::AdsApi(_))
    }
}
