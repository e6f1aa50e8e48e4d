//! Bounded-concurrency worker dispatch
//!
//! Consumes a [`Plan`] in order, launching one worker per partition while
//! never letting more than `concurrency_limit` workers run at once. Slot
//! accounting is done in-process: every launched job yields a join handle,
//! and a non-blocking `is_finished()` sweep before each launch reclaims the
//! slots of workers that have exited. When all slots are busy the dispatcher
//! sleeps for one poll interval and re-checks; it never blocks on any
//! specific job.
//!
//! Completion policy: [`WorkerDispatcher::run`] returns once every planned
//! job has been *submitted*. "Finished" means "all jobs launched", not "all
//! output files written": in-flight workers are still running when `run`
//! returns. Callers pick what happens to them: [`Dispatch::detach`] leaves
//! them running unobserved (the classic fire-and-forget exit), while
//! [`Dispatch::wait_remaining`] awaits them and folds their exit status
//! into the final report.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::Result;

use super::planner::Plan;
use super::progress::ProgressTracker;
use super::worker::{JobLauncher, JobOutcome, WorkerJob};

/// How long the dispatcher sleeps between slot checks when throttled
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Dispatches planned partitions to export workers
#[derive(Debug, Clone, Copy)]
pub struct WorkerDispatcher {
    concurrency_limit: usize,
    poll_interval: Duration,
}

impl WorkerDispatcher {
    /// Create a dispatcher with the given worker cap
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the throttle poll interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Launch one worker per planned partition, in plan order
    ///
    /// Jobs get strictly increasing sequence numbers starting at 1. The
    /// call returns as soon as the last job has been submitted; see the
    /// module docs for the completion policy.
    pub async fn run(
        &self,
        plan: &Plan,
        launcher: &dyn JobLauncher,
        tracker: &ProgressTracker,
    ) -> Result<Dispatch> {
        let mut active: Vec<(u32, JoinHandle<JobOutcome>)> = Vec::new();
        let mut completed: Vec<JobOutcome> = Vec::new();
        let mut sequence: u32 = 0;

        for bound in plan.bounds() {
            loop {
                Self::reap_finished(&mut active, &mut completed).await;
                if active.len() < self.concurrency_limit {
                    break;
                }
                sleep(self.poll_interval).await;
            }

            sequence += 1;
            let job = WorkerJob::new(sequence, *bound);
            debug!(
                "Dispatching worker #{:05} for range [{}, {}]",
                sequence, bound.first, bound.last
            );
            let handle = launcher.launch(job)?;
            active.push((sequence, handle));
            tracker.update(sequence as u64);
        }

        // One last non-blocking sweep so the report reflects everything
        // that already finished; deliberately no waiting beyond that.
        Self::reap_finished(&mut active, &mut completed).await;

        info!(
            "All {} partitions submitted, {} workers still running",
            sequence,
            active.len()
        );

        Ok(Dispatch {
            jobs_launched: u64::from(sequence),
            completed,
            outstanding: active,
        })
    }

    /// Collect the outcomes of workers that have already exited
    ///
    /// `is_finished()` keeps this non-blocking; awaiting a finished handle
    /// returns immediately.
    async fn reap_finished(
        active: &mut Vec<(u32, JoinHandle<JobOutcome>)>,
        completed: &mut Vec<JobOutcome>,
    ) {
        let mut i = 0;
        while i < active.len() {
            if active[i].1.is_finished() {
                let (sequence, handle) = active.swap_remove(i);
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => JobOutcome {
                        sequence,
                        success: false,
                        detail: Some(format!("worker task failed: {e}")),
                    },
                };
                completed.push(outcome);
            } else {
                i += 1;
            }
        }
    }
}

/// Result of a dispatch run, with the still-running workers attached
#[derive(Debug)]
pub struct Dispatch {
    jobs_launched: u64,
    completed: Vec<JobOutcome>,
    outstanding: Vec<(u32, JoinHandle<JobOutcome>)>,
}

impl Dispatch {
    /// Number of jobs that were launched
    pub fn jobs_launched(&self) -> u64 {
        self.jobs_launched
    }

    /// Outcomes observed so far, in completion order
    pub fn completed(&self) -> &[JobOutcome] {
        &self.completed
    }

    /// Number of workers still running when dispatch finished
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Leave the remaining workers running unobserved
    ///
    /// Dropping the handles detaches the tasks; the underlying processes
    /// keep running to completion on their own.
    pub fn detach(self) -> DispatchReport {
        let detached = self.outstanding.len() as u64;
        Self::build_report(self.jobs_launched, &self.completed, detached)
    }

    /// Await every remaining worker and fold it into the report
    pub async fn wait_remaining(mut self) -> DispatchReport {
        for (sequence, handle) in self.outstanding.drain(..) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => JobOutcome {
                    sequence,
                    success: false,
                    detail: Some(format!("worker task failed: {e}")),
                },
            };
            self.completed.push(outcome);
        }
        Self::build_report(self.jobs_launched, &self.completed, 0)
    }

    fn build_report(jobs_launched: u64, completed: &[JobOutcome], detached: u64) -> DispatchReport {
        let succeeded = completed.iter().filter(|o| o.success).count() as u64;
        DispatchReport {
            jobs_launched,
            succeeded,
            failed: completed.len() as u64 - succeeded,
            detached,
        }
    }
}

/// Aggregate view of one dispatch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Jobs handed to the launcher
    pub jobs_launched: u64,

    /// Workers observed to exit successfully
    pub succeeded: u64,

    /// Workers observed to fail
    pub failed: u64,

    /// Workers left running unobserved
    pub detached: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::export::planner::{PlanConfig, plan};
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn ten_partitions() -> Plan {
        // 10 rows per partition over [0, 99].
        plan(&PlanConfig {
            target_bytes: 1000,
            average_row_size: 100.0,
            global_min: 0,
            global_max: 99,
        })
        .unwrap()
    }

    /// Launcher whose jobs run for a fixed duration, tracking how many are
    /// in flight at once.
    struct TimedLauncher {
        duration: Duration,
        fail_even_sequences: bool,
        launched: Arc<Mutex<Vec<WorkerJob>>>,
        in_flight: Arc<AtomicI64>,
        max_in_flight: Arc<AtomicI64>,
    }

    impl TimedLauncher {
        fn new(duration: Duration) -> Self {
            Self {
                duration,
                fail_even_sequences: false,
                launched: Arc::new(Mutex::new(Vec::new())),
                in_flight: Arc::new(AtomicI64::new(0)),
                max_in_flight: Arc::new(AtomicI64::new(0)),
            }
        }
    }

    impl JobLauncher for TimedLauncher {
        fn launch(&self, job: WorkerJob) -> Result<JoinHandle<JobOutcome>> {
            self.launched.lock().unwrap().push(job);
            let duration = self.duration;
            let fail = self.fail_even_sequences && job.sequence % 2 == 0;
            let in_flight = Arc::clone(&self.in_flight);
            let max_in_flight = Arc::clone(&self.max_in_flight);

            Ok(tokio::spawn(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                sleep(duration).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                JobOutcome {
                    sequence: job.sequence,
                    success: !fail,
                    detail: fail.then(|| "simulated failure".to_string()),
                }
            }))
        }
    }

    fn silent_tracker(plan: &Plan) -> ProgressTracker {
        ProgressTracker::new(plan.len() as u64, false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_launches_every_partition_in_sequence_order() {
        let plan = ten_partitions();
        let launcher = TimedLauncher::new(Duration::from_millis(10));
        let dispatcher = WorkerDispatcher::new(3);

        let dispatch = dispatcher
            .run(&plan, &launcher, &silent_tracker(&plan))
            .await
            .unwrap();

        assert_eq!(dispatch.jobs_launched(), 10);
        let jobs = launcher.launched.lock().unwrap().clone();
        let sequences: Vec<u32> = jobs.iter().map(|j| j.sequence).collect();
        assert_eq!(sequences, (1..=10).collect::<Vec<u32>>());
        // Jobs carry the plan's bounds in order.
        assert_eq!(jobs[0].bound, plan.bounds()[0]);
        assert_eq!(jobs[9].bound, plan.bounds()[9]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_concurrency_limit() {
        let plan = ten_partitions();
        let launcher = TimedLauncher::new(Duration::from_millis(250));
        let dispatcher = WorkerDispatcher::new(3);

        let dispatch = dispatcher
            .run(&plan, &launcher, &silent_tracker(&plan))
            .await
            .unwrap();
        dispatch.wait_remaining().await;

        assert!(launcher.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_without_awaiting_completions() {
        let plan = ten_partitions();
        // Workers outlive the dispatch loop by a wide margin.
        let launcher = TimedLauncher::new(Duration::from_secs(3600));
        let dispatcher = WorkerDispatcher::new(10);

        let dispatch = dispatcher
            .run(&plan, &launcher, &silent_tracker(&plan))
            .await
            .unwrap();

        // All ten were submitted, none has finished: run() did not wait.
        assert_eq!(dispatch.jobs_launched(), 10);
        assert_eq!(dispatch.outstanding(), 10);
        assert!(dispatch.completed().is_empty());

        let report = dispatch.detach();
        assert_eq!(report.detached, 10);
        assert_eq!(report.succeeded + report.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_plan_launches_nothing() {
        let plan = plan(&PlanConfig {
            target_bytes: 1000,
            average_row_size: 100.0,
            global_min: 10,
            global_max: 5,
        })
        .unwrap();
        let launcher = TimedLauncher::new(Duration::from_millis(1));
        let dispatcher = WorkerDispatcher::new(4);

        let dispatch = dispatcher
            .run(&plan, &launcher, &silent_tracker(&plan))
            .await
            .unwrap();

        assert_eq!(dispatch.jobs_launched(), 0);
        assert!(launcher.launched.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_remaining_aggregates_failures() {
        let plan = ten_partitions();
        let mut launcher = TimedLauncher::new(Duration::from_millis(50));
        launcher.fail_even_sequences = true;
        let dispatcher = WorkerDispatcher::new(2);

        let dispatch = dispatcher
            .run(&plan, &launcher, &silent_tracker(&plan))
            .await
            .unwrap();
        let report = dispatch.wait_remaining().await;

        assert_eq!(report.jobs_launched, 10);
        assert_eq!(report.succeeded, 5);
        assert_eq!(report.failed, 5);
        assert_eq!(report.detached, 0);
    }
}
