pub mod bigquery;
pub mod file;
pub mod recorder;
pub mod rows;
pub mod schema;

use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub use bigquery::BigQueryClient;
pub use file::JsonFileSink;
pub use recorder::Recorder;

/// The four logical output tables, shared by the file and warehouse sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    AllAccounts,
    AdsToRemove,
    PerAccountSummary,
    PerMccSummary,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::AllAccounts,
        Table::AdsToRemove,
        Table::PerAccountSummary,
        Table::PerMccSummary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::AllAccounts => "AllAccounts",
            Table::AdsToRemove => "AdsToRemove",
            Table::PerAccountSummary => "PerAccountSummary",
            Table::PerMccSummary => "PerMccSummary",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{operation} failed with HTTP {http_status}: {message}")]
    Api {
        operation: String,
        http_status: u16,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Tabular sink for audit rows.
///
/// A missing dataset or table is an expected state that `ensure_table` resolves by
/// creating it.
pub trait Warehouse: Send + Sync {
    fn ensure_table(&self, table: Table) -> Result<(), WarehouseError>;

    /// Append rows; returns how many were accepted.
    fn insert_rows(&self, table: Table, rows: &[Value]) -> Result<usize, WarehouseError>;

    /// Insert rows through a DML statement; returns how many were inserted. Unlike
    /// streamed rows, these can be updated straight away.
    fn insert_rows_by_query(&self, table: Table, rows: &[Value]) -> Result<usize, WarehouseError>;

    /// Overwrite the non-key columns of the rows matching each row's key columns.
    fn update_rows_by_key(
        &self,
        table: Table,
        key_columns: &[&str],
        rows: &[Value],
    ) -> Result<usize, WarehouseError>;

    fn delete_table(&self, table: Table) -> Result<(), WarehouseError>;

    /// Delete stale rows that have a newer row for the same ad; returns rows affected.
    fn remove_outdated_rows(&self, table: Table) -> Result<u64, WarehouseError>;
}
