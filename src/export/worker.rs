//! Export worker invocation
//!
//! Each planned partition becomes one `psql \copy` process that selects the
//! partition's key range and writes one output file. Workers are launched
//! detached: the dispatcher never blocks on a specific worker, and a worker
//! left running when parcopy exits keeps writing until COPY completes.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::client::ConnectionParams;
use crate::config::OutputFormat;
use crate::error::Result;

use super::planner::RangeBound;

/// One unit of export work: a partition plus its output sequence number
///
/// The sequence number starts at 1, increases strictly in dispatch order,
/// and exists only to name output files deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerJob {
    /// Position of this job in the plan, starting at 1
    pub sequence: u32,

    /// Key range this worker exports
    pub bound: RangeBound,
}

impl WorkerJob {
    /// Create a job for one partition
    pub fn new(sequence: u32, bound: RangeBound) -> Self {
        Self { sequence, bound }
    }

    /// Deterministic output file name, e.g. `dump-00042.csv`
    pub fn output_file_name(&self, format: OutputFormat) -> String {
        format!("dump-{:05}.{}", self.sequence, format.extension())
    }
}

/// What became of one worker process
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Sequence number of the job
    pub sequence: u32,

    /// Whether the worker exited successfully
    pub success: bool,

    /// Failure detail, when there is one
    pub detail: Option<String>,
}

/// Launches one worker per job and hands back a completion handle
///
/// The handle resolves to the worker's [`JobOutcome`]; the dispatcher uses
/// it only for non-blocking slot accounting and end-of-run reporting.
pub trait JobLauncher: Send + Sync {
    /// Start a worker for `job` and return its completion handle
    fn launch(&self, job: WorkerJob) -> Result<JoinHandle<JobOutcome>>;
}

/// Builds the launcher once the split column is known
///
/// The split column is chosen after discovery, midway through an export
/// run, so the coordinator creates the launcher through this seam instead
/// of receiving a finished one.
pub trait WorkerFactory: Send + Sync {
    /// Create the launcher for an export split on `column`
    fn launcher(&self, column: &str) -> Box<dyn JobLauncher>;
}

/// Worker factory producing [`PsqlLauncher`]s
pub struct PsqlWorkerFactory {
    params: ConnectionParams,
    table: String,
    directory: PathBuf,
    format: OutputFormat,
}

impl PsqlWorkerFactory {
    /// Create a factory for one export run
    pub fn new(
        params: ConnectionParams,
        table: String,
        directory: PathBuf,
        format: OutputFormat,
    ) -> Self {
        Self {
            params,
            table,
            directory,
            format,
        }
    }
}

impl WorkerFactory for PsqlWorkerFactory {
    fn launcher(&self, column: &str) -> Box<dyn JobLauncher> {
        Box::new(PsqlLauncher::new(
            self.params.clone(),
            self.table.clone(),
            column.to_string(),
            self.directory.clone(),
            self.format,
        ))
    }
}

/// Job launcher backed by detached `psql \copy` processes
pub struct PsqlLauncher {
    params: ConnectionParams,
    table: String,
    column: String,
    directory: PathBuf,
    format: OutputFormat,
}

impl PsqlLauncher {
    /// Create a launcher for one export run
    pub fn new(
        params: ConnectionParams,
        table: String,
        column: String,
        directory: PathBuf,
        format: OutputFormat,
    ) -> Self {
        Self {
            params,
            table,
            column,
            directory,
            format,
        }
    }

    /// The `\copy` command executed by the worker for `job`
    fn copy_sql(&self, job: &WorkerJob) -> String {
        let path = self.directory.join(job.output_file_name(self.format));
        format!(
            "\\copy (SELECT * FROM {table} WHERE {column} >= {first} AND {column} <= {last}) \
             TO '{path}' WITH {format}",
            table = self.table,
            column = self.column,
            first = job.bound.first,
            last = job.bound.last,
            path = path.display(),
            format = self.format.copy_clause(),
        )
    }
}

impl JobLauncher for PsqlLauncher {
    fn launch(&self, job: WorkerJob) -> Result<JoinHandle<JobOutcome>> {
        let mut command = Command::new("psql");
        command
            .args(self.params.base_args())
            .args(["-X", "-q", "-t", "-c"])
            .arg(self.copy_sql(&job))
            .env("PGPASSWORD", &self.params.password)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // kill_on_drop stays off: if the orchestrator exits first, the
        // worker keeps running and finishes its file.
        let mut child = command.spawn()?;
        let sequence = job.sequence;

        Ok(tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => JobOutcome {
                    sequence,
                    success: true,
                    detail: None,
                },
                Ok(status) => {
                    warn!("Export worker #{:05} exited with {}", sequence, status);
                    JobOutcome {
                        sequence,
                        success: false,
                        detail: Some(status.to_string()),
                    }
                }
                Err(e) => {
                    warn!("Export worker #{:05} could not be awaited: {}", sequence, e);
                    JobOutcome {
                        sequence,
                        success: false,
                        detail: Some(e.to_string()),
                    }
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher() -> PsqlLauncher {
        PsqlLauncher::new(
            ConnectionParams {
                host: "localhost".to_string(),
                port: 5432,
                dbname: "sales".to_string(),
                username: "alice".to_string(),
                password: "secret".to_string(),
            },
            "orders".to_string(),
            "id".to_string(),
            PathBuf::from("/tmp/out"),
            OutputFormat::Csv,
        )
    }

    #[test]
    fn test_output_file_name_is_zero_padded() {
        let job = WorkerJob::new(7, RangeBound { first: 0, last: 9 });
        assert_eq!(job.output_file_name(OutputFormat::Csv), "dump-00007.csv");
        assert_eq!(
            job.output_file_name(OutputFormat::Binary),
            "dump-00007.binary"
        );

        let job = WorkerJob::new(12345, RangeBound { first: 0, last: 9 });
        assert_eq!(job.output_file_name(OutputFormat::Text), "dump-12345.text");
    }

    #[test]
    fn test_copy_sql_covers_inclusive_range() {
        let sql = launcher().copy_sql(&WorkerJob::new(3, RangeBound { first: 20, last: 29 }));
        assert!(sql.starts_with("\\copy (SELECT * FROM orders"));
        assert!(sql.contains("id >= 20 AND id <= 29"));
        assert!(sql.contains("TO '/tmp/out/dump-00003.csv'"));
        assert!(sql.ends_with("WITH CSV"));
    }

    #[test]
    fn test_copy_sql_never_contains_credentials() {
        let sql = launcher().copy_sql(&WorkerJob::new(1, RangeBound { first: 0, last: 9 }));
        assert!(!sql.contains("secret"));
        assert!(!sql.contains("alice"));
    }
}
