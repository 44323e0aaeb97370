use super::Table;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::trace;

/// Appends write events to one JSON file per table.
///
/// Each event is a single line holding a JSON array of rows. Files are named
/// `{table}_{suffix}.json`, with the suffix fixed for the session.
pub struct JsonFileSink {
    dir: PathBuf,
    suffix: String,
    write_lock: Mutex<()>,
}

impl JsonFileSink {
    pub fn create(dir: &Path, suffix: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            suffix: suffix.to_string(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path_for(&self, table: Table) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", table.name(), self.suffix))
    }

    pub fn append(&self, table: Table, rows: &[Value]) -> io::Result<()> {
        let line = serde_json::to_string(rows)?;
        let path = self.path_for(table);

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Failed to lock sink: {}", e)))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;
        trace!("Appended {} rows to {}", rows.len(), path.display());
        Ok(())
    }
}
