mod commands;
mod logging;
mod progress;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::*;
use commands::Cli;
use dotenv::dotenv;
use progress::CliReporter;
use three_strikes_core::accounts::normalize_account_id;
use three_strikes_core::ads::GoogleAdsRestClient;
use three_strikes_core::engine::{clean_outdated, delete_tables, run_with_retries};
use three_strikes_core::policy::TopicPolicy;
use three_strikes_core::sink::{BigQueryClient, JsonFileSink, Recorder, Warehouse};
use three_strikes_core::{AppConfig, RunSummary, Session, SweepEngine};
use tracing::{error, info};

fn main() -> ExitCode {
    dotenv().ok();

    // Dropped when main returns, flushing buffered file logs.
    let _guard = logging::init_logger(&logging::LogSettings::from_env());

    let args = Cli::parse();

    let config = match three_strikes_core::config::load_configuration(&args.config) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    exit_code(run(&args, &config))
}

/// Log a failed run and map it to the process exit code.
fn exit_code(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Cli, config: &AppConfig) -> anyhow::Result<()> {
    let top_id = normalize_account_id(&args.top_id);

    let warehouse: Option<Arc<dyn Warehouse>> = if args.write_to_bq {
        let client = BigQueryClient::connect(&config.warehouse)
            .context("Failed to connect to BigQuery")?;
        Some(Arc::new(client))
    } else {
        None
    };

    if let Some(warehouse) = &warehouse {
        if args.delete_db {
            delete_tables(warehouse.as_ref())?;
            println!("All tables deleted");
            return Ok(());
        }
        if args.clean_outdated_bq {
            clean_outdated(warehouse.as_ref())?;
        }
    }

    let policy = TopicPolicy::load(&config.topics_file).with_context(|| {
        format!("Failed to load topics from {}", config.topics_file.display())
    })?;
    info!(
        "Topic policy: {} included, {} excluded",
        policy.included().len(),
        policy.excluded().len()
    );

    let session = Session::new();
    info!("Session {}", session.session_id);
    let files = JsonFileSink::create(&config.output_dir, &session.file_suffix())
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;
    let mut recorder = Recorder::new(session, files);
    if let Some(warehouse) = warehouse {
        recorder = recorder.with_warehouse(warehouse, config.warehouse.update_status_in_place);
    }

    let api = GoogleAdsRestClient::new(&config.ads)?;
    let engine = SweepEngine::new(config.clone(), Arc::new(api), policy, recorder)
        .with_removal(args.remove_ads)
        .with_parallel(!args.sequential);

    let reporter = CliReporter::new();
    let summary = run_with_retries(config.retry_attempts, |attempt| {
        if attempt > 1 {
            info!("Starting attempt {}", attempt);
        }
        engine.run(&top_id, &reporter)
    })?;

    print_summary(&summary, args.remove_ads);
    Ok(())
}

fn print_summary(summary: &RunSummary, removed: bool) {
    println!();
    info!(
        "Walk: {}, Audit: {}",
        format!("{:.2}s", summary.walk_duration.as_secs_f64()).green(),
        format!("{:.2}s", summary.audit_duration.as_secs_f64()).green(),
    );
    info!(
        "{} accounts, {} with ads to remove, {} ads to remove",
        format!("{}", summary.mcc.total_sub_accounts).cyan(),
        format!("{}", summary.mcc.accounts_with_ads_to_remove).cyan(),
        format!("{}", summary.mcc.total_ads_to_remove).red(),
    );
    if removed {
        info!(
            "{} ads removed, {} failed to remove",
            format!("{}", summary.removed).green(),
            format!("{}", summary.failed).red(),
        );
    }
}
