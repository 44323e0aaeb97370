use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Run-scoped identifiers stamped onto every persisted row.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Stamped<'a, T: Serialize> {
    #[serde(flatten)]
    pub row: &'a T,
    pub timestamp: String,
    pub session_id: &'a str,
}

impl Session {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn with_id(session_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.to_string(),
            started_at,
        }
    }

    /// Suffix used for output file names, fixed for the whole session.
    pub fn file_suffix(&self) -> String {
        self.started_at.format("%Y%m%d-%H%M%S").to_string()
    }

    /// Wrap `row` with the session id and the current time. BigQuery TIMESTAMP holds
    /// microseconds at most, so the time is rendered at that precision.
    pub fn stamp<'a, T: Serialize>(&'a self, row: &'a T) -> Stamped<'a, T> {
        Stamped {
            row,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            session_id: &self.session_id,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
