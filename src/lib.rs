//! Parallel PostgreSQL Table Dump Library
//!
//! This library provides the core functionality for parcopy, a tool that
//! dumps a large PostgreSQL table as a set of smaller files by partitioning
//! a numeric key range and driving one `psql \copy` worker per partition.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `client`: Connection parameters and the `psql`-backed query transport
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: Partition planning and bounded-concurrency dispatch
//! - `prompt`: Interactive confirmation and selection capabilities
//! - `schema`: Split-column discovery
//! - `utils`: Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use parcopy::client::{ConnectionParams, PsqlClient};
//! use parcopy::export::{ExportCoordinator, ExportOptions, PsqlWorkerFactory};
//! use parcopy::prompt::TerminalPrompter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let params = ConnectionParams {
//!         host: "localhost".to_string(),
//!         port: 5432,
//!         dbname: "sales".to_string(),
//!         username: "alice".to_string(),
//!         password: std::env::var("PGPASSWORD")?,
//!     };
//!
//!     let options = ExportOptions::for_table("orders");
//!     let workers = PsqlWorkerFactory::new(
//!         params.clone(),
//!         options.table.clone(),
//!         options.directory.clone(),
//!         options.format,
//!     );
//!
//!     let coordinator = ExportCoordinator::new(
//!         Box::new(PsqlClient::new(params)),
//!         Box::new(workers),
//!         Box::new(TerminalPrompter),
//!         options,
//!     );
//!     let summary = coordinator.execute().await?;
//!     println!("{} partitions dispatched", summary.partitions);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod prompt;
pub mod schema;
pub mod utils;

// Re-export commonly used types
pub use client::{ConnectionParams, PsqlClient, QueryExecutor};
pub use config::{Config, OutputFormat};
pub use error::{ParcopyError, Result};
pub use export::{
    ExportCoordinator, ExportOptions, ExportSummary, Plan, PlanConfig, RangeBound,
    WorkerDispatcher,
};
pub use prompt::{Prompter, TerminalPrompter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
