use super::rows::AdRow;
use super::{JsonFileSink, Table, Warehouse};
use crate::error::Error;
use crate::model::{AccountRecord, AccountSummary, MccSummary, RemovalCandidate};
use crate::session::Session;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Keys identifying a staged ad row when statuses are updated in place.
pub const AD_ROW_KEY: [&str; 2] = ["session_id", "ad_id"];

/// Session-stamps rows and writes them to the file sink and, when enabled, the warehouse.
pub struct Recorder {
    session: Session,
    files: JsonFileSink,
    warehouse: Option<Arc<dyn Warehouse>>,
    update_status_in_place: bool,
}

impl Recorder {
    pub fn new(session: Session, files: JsonFileSink) -> Self {
        Self {
            session,
            files,
            warehouse: None,
            update_status_in_place: false,
        }
    }

    pub fn with_warehouse(mut self, warehouse: Arc<dyn Warehouse>, update_in_place: bool) -> Self {
        self.warehouse = Some(warehouse);
        self.update_status_in_place = update_in_place;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn files(&self) -> &JsonFileSink {
        &self.files
    }

    /// Create any missing warehouse tables.
    pub fn prepare(&self) -> Result<(), Error> {
        if let Some(warehouse) = &self.warehouse {
            for table in Table::ALL {
                warehouse.ensure_table(table)?;
            }
        }
        Ok(())
    }

    fn stamp_all<T: Serialize>(&self, rows: &[T]) -> Result<Vec<Value>, Error> {
        rows.iter()
            .map(|row| serde_json::to_value(self.session.stamp(row)).map_err(Error::from))
            .collect()
    }

    fn write(&self, table: Table, rows: Vec<Value>) -> Result<(), Error> {
        if rows.is_empty() {
            return Ok(());
        }
        self.files.append(table, &rows)?;
        if let Some(warehouse) = &self.warehouse {
            warehouse.insert_rows(table, &rows)?;
        }
        Ok(())
    }

    fn ad_rows(&self, candidates: &[RemovalCandidate]) -> Result<Vec<Value>, Error> {
        let rows = candidates
            .iter()
            .map(AdRow::from_candidate)
            .collect::<Result<Vec<_>, _>>()?;
        self.stamp_all(&rows)
    }

    pub fn record_accounts(&self, accounts: &[AccountRecord]) -> Result<(), Error> {
        let rows = self.stamp_all(accounts)?;
        self.write(Table::AllAccounts, rows)
    }

    /// Staged candidates, written before any removal is attempted. When statuses are
    /// updated in place the warehouse rows go in by DML, since streamed rows cannot be
    /// updated while they sit in the streaming buffer.
    pub fn record_candidates(&self, candidates: &[RemovalCandidate]) -> Result<(), Error> {
        let rows = self.ad_rows(candidates)?;
        match &self.warehouse {
            Some(warehouse) if self.update_status_in_place && !rows.is_empty() => {
                self.files.append(Table::AdsToRemove, &rows)?;
                let inserted = warehouse.insert_rows_by_query(Table::AdsToRemove, &rows)?;
                debug!("Staged {} warehouse rows for in-place updates", inserted);
                Ok(())
            }
            _ => self.write(Table::AdsToRemove, rows),
        }
    }

    /// Candidates after reconciliation. The file always gets a second entry; the warehouse
    /// gets one too unless statuses are updated in place.
    pub fn record_reconciled(&self, candidates: &[RemovalCandidate]) -> Result<(), Error> {
        let rows = self.ad_rows(candidates)?;
        if rows.is_empty() {
            return Ok(());
        }
        match &self.warehouse {
            Some(warehouse) if self.update_status_in_place => {
                self.files.append(Table::AdsToRemove, &rows)?;
                let updated = warehouse.update_rows_by_key(Table::AdsToRemove, &AD_ROW_KEY, &rows)?;
                info!("Updated removal status of {} warehouse rows", updated);
                Ok(())
            }
            _ => self.write(Table::AdsToRemove, rows),
        }
    }

    pub fn record_account_summary(&self, summary: &AccountSummary) -> Result<(), Error> {
        let rows = self.stamp_all(std::slice::from_ref(summary))?;
        self.write(Table::PerAccountSummary, rows)
    }

    pub fn record_mcc_summary(&self, summary: &MccSummary) -> Result<(), Error> {
        let rows = self.stamp_all(std::slice::from_ref(summary))?;
        self.write(Table::PerMccSummary, rows)
    }
}
