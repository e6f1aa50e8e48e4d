//! parcopy - Parallel PostgreSQL Table Dump
//!
//! Dumps a large PostgreSQL table as a set of smaller files by splitting a
//! numeric key range into partitions and running one `psql \copy` worker
//! per partition, up to a configurable number of workers at a time.
//!
//! # Usage
//!
//! ```bash
//! # Dump 'orders' into ./parcopy-<timestamp>/ as ~128MB CSV files
//! parcopy -t orders -d sales -U alice
//!
//! # Eight workers, 256MB text files, preselected split column
//! parcopy -t orders -c 8 -s 256 -f text --split-column id
//! ```

use tracing::Level;

mod cli;
mod client;
mod config;
mod error;
mod export;
mod prompt;
mod schema;
mod utils;

use cli::CliInterface;
use client::PsqlClient;
use error::Result;
use export::{ExportCoordinator, ExportSummary, PsqlWorkerFactory};
use prompt::TerminalPrompter;
use utils::time::format_duration;

/// Application entry point
#[tokio::main]
async fn main() {
    // Initialize the application and handle any errors
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// This function orchestrates the application startup:
/// 1. Parse command-line arguments
/// 2. Load configuration
/// 3. Initialize logging
/// 4. Handle subcommands or run the export
///
/// # Returns
/// * `Result<()>` - Success or error
async fn run() -> Result<()> {
    // Parse command-line arguments and load configuration
    let cli = CliInterface::new()?;

    // Initialize logging based on verbosity
    initialize_logging(&cli);

    // Handle subcommands (version, completion, config)
    if cli.handle_subcommand().await? {
        return Ok(());
    }

    // Print banner if not in quiet mode
    cli.print_banner();

    run_export(&cli).await
}

/// Run the parallel export
async fn run_export(cli: &CliInterface) -> Result<()> {
    // The whole tool is a psql driver; fail fast when it is missing.
    PsqlClient::check_binary().await?;

    let prompter = TerminalPrompter;
    let options = cli.export_options()?;
    let password = cli.resolve_password(&prompter)?;
    let params = cli.connection_params(password);

    let workers = PsqlWorkerFactory::new(
        params.clone(),
        options.table.clone(),
        options.directory.clone(),
        options.format,
    );

    let coordinator = ExportCoordinator::new(
        Box::new(PsqlClient::new(params)),
        Box::new(workers),
        Box::new(prompter),
        options,
    );

    let summary = coordinator.execute().await?;
    print_summary(cli, &summary);
    Ok(())
}

/// Print the end-of-run summary
fn print_summary(cli: &CliInterface, summary: &ExportSummary) {
    if cli.args().quiet {
        return;
    }

    if summary.partitions == 0 {
        println!("Nothing to export: the key range is empty.");
        return;
    }

    println!(
        "Submitted {} partitions ({} rows each) in {}.",
        summary.partitions,
        summary.rows_per_partition,
        format_duration(std::time::Duration::from_millis(summary.elapsed_ms))
    );

    let report = &summary.report;
    if report.detached > 0 {
        println!(
            "{} workers were still running on exit and will finish on their own.",
            report.detached
        );
    }
    if report.failed > 0 {
        println!(
            "{} of {} observed workers failed; check the server log.",
            report.failed,
            report.succeeded + report.failed
        );
    }
}

/// Initialize logging system based on verbosity level
///
/// # Arguments
/// * `cli` - CLI interface with verbosity settings
fn initialize_logging(cli: &CliInterface) {
    let level = if cli.args().very_verbose {
        Level::TRACE
    } else if cli.args().verbose {
        Level::DEBUG
    } else {
        cli.config().logging.level.to_tracing_level()
    };

    // Build subscriber with level filter
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    // Configure timestamps
    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
