pub mod accounts;
pub mod ads;
pub mod auditor;
pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod policy;
pub mod progress;
pub mod session;
pub mod sink;

pub use config::AppConfig;
pub use engine::{RunSummary, SweepEngine};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
pub use session::Session;
