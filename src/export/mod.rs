//! Export pipeline for parallel table dumps
//!
//! This module contains the planning and dispatch engine:
//!
//! 1. **Sampler** estimates the exported size of one row from a small prefix
//!    of the table.
//! 2. **Range probe** finds the split column's [min, max] across the whole
//!    table.
//! 3. **Planner** turns both into an ordered list of equal-width inclusive
//!    key ranges targeting the per-file byte budget.
//! 4. **Dispatcher** hands each range to a worker, capping how many run at
//!    once and observing slot availability through non-blocking handle
//!    checks.
//! 5. **Worker** is one detached `psql \copy` process writing one file.
//!
//! The **coordinator** wires these together behind injected `QueryExecutor`,
//! `JobLauncher`, and `Prompter` capabilities.

pub mod coordinator;
pub mod dispatcher;
pub mod planner;
pub mod progress;
pub mod range;
pub mod sampler;
pub mod worker;

pub use coordinator::{ExportCoordinator, ExportOptions, ExportSummary};
pub use dispatcher::{Dispatch, DispatchReport, POLL_INTERVAL, WorkerDispatcher};
pub use planner::{Plan, PlanConfig, RangeBound, plan};
pub use progress::ProgressTracker;
pub use range::fetch_bounds;
pub use sampler::{ROW_SIZE_INFLATION, Sampler};
pub use worker::{
    JobLauncher, JobOutcome, PsqlLauncher, PsqlWorkerFactory, WorkerFactory, WorkerJob,
};
