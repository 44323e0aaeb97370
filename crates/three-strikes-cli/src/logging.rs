use std::env;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LEVEL: &str = "info";
const DEFAULT_LOG_FILE: &str = "./logs/three-strikes.log";

/// Where and how verbosely to log, read from `TRACING_LEVEL` and `LOG_FILE_PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub file_path: PathBuf,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_values(env::var("TRACING_LEVEL").ok(), env::var("LOG_FILE_PATH").ok())
    }

    fn from_values(level: Option<String>, file_path: Option<String>) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            filter: non_empty(level).unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
            file_path: PathBuf::from(non_empty(file_path).unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())),
        }
    }

    /// Directory and file name for the appender.
    fn split_path(&self) -> (PathBuf, PathBuf) {
        let dir = match self.file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file = self
            .file_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("three-strikes.log"));
        (dir, file)
    }
}

/// Pretty stdout output plus a plain-text file copy. The returned guard flushes the
/// file writer when dropped.
pub fn init_logger(settings: &LogSettings) -> WorkerGuard {
    let (dir, file) = settings.split_path();
    let file_appender = tracing_appender::rolling::never(&dir, &file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::new(&settings.filter))
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .with_line_number(false)
                .with_target(false)
                .with_thread_names(true),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_thread_names(true),
        )
        .init();

    info!(
        filter = %settings.filter,
        log_file = %Path::new(&dir).join(&file).display(),
        "Logging to stdout and file"
    );

    guard
}
