//! Export coordinator for orchestrating the parallel dump
//!
//! Brings together the connectivity check, split-column selection, size
//! estimation, range probing, partition planning, and worker dispatch.
//! Everything that talks to the outside world (queries, worker processes,
//! the terminal) is injected, so the whole pipeline runs headless in tests.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::client::QueryExecutor;
use crate::config::OutputFormat;
use crate::error::{ConnectionError, ParcopyError, Result};
use crate::prompt::Prompter;
use crate::schema;
use crate::utils::convert::format_bytes;

use super::dispatcher::{DispatchReport, POLL_INTERVAL, WorkerDispatcher};
use super::planner::{PlanConfig, plan};
use super::progress::ProgressTracker;
use super::range::fetch_bounds;
use super::sampler::Sampler;
use super::worker::WorkerFactory;

/// Everything one export run needs to know
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Table to be dumped
    pub table: String,

    /// Split column pinned on the command line, if any
    pub split_column: Option<String>,

    /// Worker process cap
    pub concurrency: usize,

    /// Per-file byte budget
    pub target_bytes: u64,

    /// Rows sampled for the average-row-size estimate
    pub sample_size: u32,

    /// Override for the row-size inflation factor
    pub inflation: Option<f64>,

    /// Output format for dump files
    pub format: OutputFormat,

    /// Output directory
    pub directory: PathBuf,

    /// Reuse an existing output directory without asking
    pub assume_yes: bool,

    /// Await outstanding workers instead of detaching them
    pub wait_for_workers: bool,

    /// Display a progress bar while dispatching
    pub show_progress: bool,

    /// Dispatcher throttle poll interval
    pub poll_interval: Duration,
}

impl ExportOptions {
    /// Options for `table` with everything else at its default
    pub fn for_table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            split_column: None,
            concurrency: 1,
            target_bytes: 128 * 1024 * 1024,
            sample_size: 100,
            inflation: None,
            format: OutputFormat::Csv,
            directory: PathBuf::from("."),
            assume_yes: false,
            wait_for_workers: false,
            show_progress: false,
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// Result of an export run
#[derive(Debug, Clone, Copy)]
pub struct ExportSummary {
    /// Number of planned partitions
    pub partitions: u64,

    /// Partition width in rows
    pub rows_per_partition: i64,

    /// Estimated exported bytes per row
    pub average_row_size: f64,

    /// Wall-clock time of the run
    pub elapsed_ms: u64,

    /// What happened to the dispatched workers
    pub report: DispatchReport,
}

/// Coordinator for one parallel table dump
pub struct ExportCoordinator {
    /// Read-only query transport
    executor: Box<dyn QueryExecutor>,

    /// Worker process factory
    workers: Box<dyn WorkerFactory>,

    /// Interactive capabilities
    prompter: Box<dyn Prompter>,

    /// Run options
    options: ExportOptions,
}

impl ExportCoordinator {
    /// Create a new export coordinator
    pub fn new(
        executor: Box<dyn QueryExecutor>,
        workers: Box<dyn WorkerFactory>,
        prompter: Box<dyn Prompter>,
        options: ExportOptions,
    ) -> Self {
        Self {
            executor,
            workers,
            prompter,
            options,
        }
    }

    /// Execute the export
    ///
    /// Steps, in order:
    /// 1. Connectivity check (`SELECT 1`), failing before any planning work
    /// 2. Split-column discovery and selection
    /// 3. Row-size sampling and MIN/MAX range probe
    /// 4. Partition planning (a degenerate byte budget fails here, before
    ///    any directory or worker exists)
    /// 5. Output directory preparation, confirming reuse
    /// 6. Dispatch
    ///
    /// The returned summary reflects the dispatcher's completion policy:
    /// unless `wait_for_workers` is set, workers may still be writing
    /// output files after this returns.
    pub async fn execute(&self) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let options = &self.options;

        // Step 1: make sure the server is reachable at all.
        info!("Checking connectivity");
        self.ping().await?;

        // Step 2: pick the split column.
        let candidates = schema::discover_split_candidates(&*self.executor, &options.table).await?;
        let column = schema::select_split_column(
            &candidates,
            options.split_column.as_deref(),
            &*self.prompter,
            &options.table,
        )?;
        info!("Splitting '{}' on column '{}'", options.table, column);

        // Step 3: measure what planning needs.
        let mut sampler = Sampler::new(options.sample_size);
        if let Some(inflation) = options.inflation {
            sampler = sampler.with_inflation(inflation);
        }
        let average_row_size = sampler
            .estimate_average_row_size(&*self.executor, &options.table)
            .await?;
        let (global_min, global_max) =
            fetch_bounds(&*self.executor, &options.table, &column).await?;
        info!(
            "Average row size {:.1} bytes, '{}' spans [{}, {}]",
            average_row_size, column, global_min, global_max
        );

        // Step 4: plan the partitions.
        let plan = plan(&PlanConfig {
            target_bytes: options.target_bytes,
            average_row_size,
            global_min,
            global_max,
        })?;

        if plan.is_empty() {
            info!("Key range is empty, nothing to dispatch");
            return Ok(ExportSummary {
                partitions: 0,
                rows_per_partition: plan.rows_per_partition(),
                average_row_size,
                elapsed_ms: start_time.elapsed().as_millis() as u64,
                report: DispatchReport::default(),
            });
        }

        info!(
            "Planned {} partitions of {} rows (~{} per file)",
            plan.len(),
            plan.rows_per_partition(),
            format_bytes(options.target_bytes)
        );

        // Step 5: only now touch the filesystem.
        self.prepare_output_directory()?;

        // Step 6: hand the partitions to workers.
        let launcher = self.workers.launcher(&column);
        let tracker = ProgressTracker::new(plan.len() as u64, options.show_progress);
        let dispatcher =
            WorkerDispatcher::new(options.concurrency).with_poll_interval(options.poll_interval);
        let dispatch = dispatcher.run(&plan, &*launcher, &tracker).await?;
        tracker.finish();

        let partitions = plan.len() as u64;
        let rows_per_partition = plan.rows_per_partition();

        let report = if options.wait_for_workers {
            info!("Waiting for {} outstanding workers", dispatch.outstanding());
            dispatch.wait_remaining().await
        } else {
            dispatch.detach()
        };

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Dispatch complete: {} jobs, {} succeeded, {} failed, {} detached, {} ms",
            report.jobs_launched, report.succeeded, report.failed, report.detached, elapsed_ms
        );

        Ok(ExportSummary {
            partitions,
            rows_per_partition,
            average_row_size,
            elapsed_ms,
            report,
        })
    }

    /// Connectivity probe, mapped to a connection failure rather than a
    /// generic query failure
    async fn ping(&self) -> Result<()> {
        match self.executor.query("SELECT 1;").await {
            Ok(_) => Ok(()),
            Err(ParcopyError::Connection(ConnectionError::QueryFailed(msg))) => {
                Err(ConnectionError::ConnectFailed(msg).into())
            }
            Err(e) => Err(e),
        }
    }

    /// Create the output directory, confirming reuse of an existing one
    ///
    /// Concurrent creation by another process shows up as "already exists"
    /// and goes through the same confirmation path instead of erroring.
    fn prepare_output_directory(&self) -> Result<()> {
        let directory = &self.options.directory;

        if directory.exists() && !self.options.assume_yes {
            let confirmed = self.prompter.confirm(&format!(
                "Are you sure to dump to the existing directory '{}'?",
                directory.display()
            ))?;
            if !confirmed {
                return Err(ParcopyError::Cancelled);
            }
        }

        debug!("Creating output directory {}", directory.display());
        std::fs::create_dir_all(directory)?;
        Ok(())
    }
}
