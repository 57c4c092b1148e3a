//! Non-blocking poll scheduler
//!
//! Driven by a fixed-period external tick. Each tick does at most one thing:
//! check on the fetch in flight, or launch a new one when the polling
//! interval has elapsed. Nothing in a tick waits on the remote host.

use std::fmt;
use std::time::{Duration, Instant};

use crate::fetch::{FetchLauncher, FetchOutcome, FetchStatus, PendingFetch};
use crate::parser::parse_output;
use crate::reconciler::{DeviceReconciler, ReconcileSummary};
use crate::registry::DeviceRegistry;
use crate::tracing::span_names;

/// Extra time past the fetch timeout before the scheduler gives up locally
pub const DEADLINE_GRACE: Duration = Duration::from_secs(5);

/// A fetch that has been launched and not yet collected
struct FetchSession {
    pending: Box<dyn PendingFetch>,
    started_at: Instant,
    deadline: Instant,
}

impl fmt::Debug for FetchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchSession")
            .field("started_at", &self.started_at)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Scheduler state
#[derive(Debug, Default)]
enum SchedulerState {
    #[default]
    Idle,
    FetchInFlight(FetchSession),
}

/// What a tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Idle and the next fetch is not due yet
    Idle,
    /// A new fetch was started
    Launched,
    /// The fetch in flight has not finished
    StillRunning,
    /// The fetch succeeded and its readings were applied
    Completed(ReconcileSummary),
    /// The fetch ended unsuccessfully; nothing was applied
    Failed(FetchStatus),
    /// The fetch overran its deadline and was cancelled
    TimedOut,
    /// The fetch could not be started
    LaunchFailed(String),
}

/// Poll-and-check state machine for remote fetches
#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    fetch_timeout: Duration,
    next_due: Option<Instant>,
    state: SchedulerState,
    reconciler: DeviceReconciler,
}

impl PollScheduler {
    /// Creates an idle scheduler whose first fetch is due immediately
    #[must_use]
    pub fn new(interval: Duration, fetch_timeout: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_secs(1)),
            fetch_timeout,
            next_due: None,
            state: SchedulerState::Idle,
            reconciler: DeviceReconciler::new(),
        }
    }

    /// Polling interval between fetch starts
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// When the next fetch may start; `None` means on the next tick
    #[must_use]
    pub const fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Returns true while a fetch is outstanding
    #[must_use]
    pub const fn is_fetch_in_flight(&self) -> bool {
        matches!(self.state, SchedulerState::FetchInFlight(_))
    }

    /// Makes the next idle tick launch regardless of the interval
    pub fn trigger_now(&mut self) {
        self.next_due = None;
    }

    /// Runs one tick
    pub fn tick<L, R>(&mut self, now: Instant, launcher: &L, registry: &mut R) -> TickOutcome
    where
        L: FetchLauncher + ?Sized,
        R: DeviceRegistry + ?Sized,
    {
        let _span = crate::trace_operation!(span_names::SCHEDULER_TICK).entered();

        match std::mem::take(&mut self.state) {
            SchedulerState::FetchInFlight(mut session) => match session.pending.poll() {
                Some(outcome) => {
                    tracing::debug!(
                        elapsed_ms = now.saturating_duration_since(session.started_at).as_millis(),
                        status = %outcome.status,
                        "Remote fetch finished"
                    );
                    self.complete(outcome, registry)
                }
                None if now >= session.deadline => {
                    session.pending.cancel();
                    tracing::error!(
                        timeout_secs = self.fetch_timeout.as_secs(),
                        "Remote fetch exceeded its deadline, cancelled"
                    );
                    TickOutcome::TimedOut
                }
                None => {
                    tracing::trace!("Remote fetch still running");
                    self.state = SchedulerState::FetchInFlight(session);
                    TickOutcome::StillRunning
                }
            },
            SchedulerState::Idle => {
                if self.next_due.is_some_and(|due| now < due) {
                    tracing::trace!("Next fetch not due yet");
                    return TickOutcome::Idle;
                }
                self.advance_schedule(now);
                self.launch(now, launcher, registry)
            }
        }
    }

    /// Cancels the outstanding fetch, returning true if there was one
    pub fn cancel(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            SchedulerState::FetchInFlight(mut session) => {
                session.pending.cancel();
                true
            }
            SchedulerState::Idle => false,
        }
    }

    fn advance_schedule(&mut self, now: Instant) {
        let next = self.next_due.map_or(now, |due| due + self.interval);
        // After a long stall, start counting from now instead of bursting
        self.next_due = Some(if next <= now { now + self.interval } else { next });
    }

    fn launch<L, R>(&mut self, now: Instant, launcher: &L, registry: &R) -> TickOutcome
    where
        L: FetchLauncher + ?Sized,
        R: DeviceRegistry + ?Sized,
    {
        match launcher.launch() {
            Ok(pending) => {
                self.reconciler.take_snapshot(registry);
                self.state = SchedulerState::FetchInFlight(FetchSession {
                    pending,
                    started_at: now,
                    deadline: now + self.fetch_timeout + DEADLINE_GRACE,
                });
                tracing::debug!("Launched remote fetch");
                TickOutcome::Launched
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to launch remote fetch");
                TickOutcome::LaunchFailed(e.to_string())
            }
        }
    }

    fn complete<R>(&mut self, outcome: FetchOutcome, registry: &mut R) -> TickOutcome
    where
        R: DeviceRegistry + ?Sized,
    {
        let _span = crate::trace_operation!(span_names::FETCH_COMPLETE).entered();

        if !outcome.status.is_success() {
            for line in outcome.stderr_lines() {
                tracing::error!("{line}");
            }
            if outcome.status.looks_like_timeout() {
                tracing::error!(status = %outcome.status, "Remote fetch timed out");
            } else {
                tracing::error!(status = %outcome.status, "Remote fetch failed");
            }
            return TickOutcome::Failed(outcome.status);
        }

        for line in outcome.stderr_lines() {
            tracing::warn!("{line}");
        }
        let summary = self
            .reconciler
            .reconcile(registry, parse_output(&outcome.stdout));
        tracing::info!(
            created = summary.created,
            updated = summary.updated,
            failed = summary.failed,
            "Applied sensor readings"
        );
        TickOutcome::Completed(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, FetchResult};
    use crate::registry::MemoryRegistry;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Fetch whose completion is controlled by the test
    struct ScriptedFetch {
        slot: Arc<Mutex<Option<FetchOutcome>>>,
        cancelled: Arc<Mutex<bool>>,
    }

    impl PendingFetch for ScriptedFetch {
        fn poll(&mut self) -> Option<FetchOutcome> {
            self.slot.lock().unwrap().take()
        }

        fn cancel(&mut self) {
            *self.cancelled.lock().unwrap() = true;
        }
    }

    #[derive(Default)]
    struct ScriptedLauncher {
        launches: Cell<usize>,
        fail: Cell<bool>,
        slots: RefCell<VecDeque<Arc<Mutex<Option<FetchOutcome>>>>>,
        cancelled: Arc<Mutex<bool>>,
    }

    impl ScriptedLauncher {
        /// Completes the oldest outstanding fetch
        fn finish(&self, outcome: FetchOutcome) {
            let slot = self.slots.borrow_mut().pop_front().unwrap();
            *slot.lock().unwrap() = Some(outcome);
        }
    }

    impl FetchLauncher for ScriptedLauncher {
        fn launch(&self) -> FetchResult<Box<dyn PendingFetch>> {
            if self.fail.get() {
                return Err(FetchError::Spawn {
                    program: "timeout".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                });
            }
            self.launches.set(self.launches.get() + 1);
            let slot = Arc::new(Mutex::new(None));
            self.slots.borrow_mut().push_back(Arc::clone(&slot));
            Ok(Box::new(ScriptedFetch {
                slot,
                cancelled: Arc::clone(&self.cancelled),
            }))
        }
    }

    fn scheduler() -> PollScheduler {
        PollScheduler::new(Duration::from_secs(60), Duration::from_secs(60))
    }

    #[test]
    fn test_first_tick_launches() {
        let mut sched = scheduler();
        let launcher = ScriptedLauncher::default();
        let mut registry = MemoryRegistry::new();

        let now = Instant::now();
        assert_eq!(sched.tick(now, &launcher, &mut registry), TickOutcome::Launched);
        assert!(sched.is_fetch_in_flight());
        assert_eq!(sched.next_due(), Some(now + Duration::from_secs(60)));
    }

    #[test]
    fn test_success_applies_readings() {
        let mut sched = scheduler();
        let launcher = ScriptedLauncher::default();
        let mut registry = MemoryRegistry::new();
        let now = Instant::now();

        sched.tick(now, &launcher, &mut registry);
        launcher.finish(FetchOutcome::success("A1\t23456\nA2\t10000\n"));
        let outcome = sched.tick(now + Duration::from_secs(10), &launcher, &mut registry);

        assert_eq!(
            outcome,
            TickOutcome::Completed(ReconcileSummary {
                created: 2,
                updated: 0,
                failed: 0
            })
        );
        assert!(!sched.is_fetch_in_flight());
        assert_eq!(registry.get(1).unwrap().value, "23.5");
        assert_eq!(registry.get(2).unwrap().value, "10.0");
    }

    #[test]
    fn test_failure_leaves_registry_untouched() {
        let mut sched = scheduler();
        let launcher = ScriptedLauncher::default();
        let mut registry = MemoryRegistry::new();
        let now = Instant::now();

        sched.tick(now, &launcher, &mut registry);
        let mut failed = FetchOutcome::failed(1, "ssh: connect to host: No route to host\n");
        failed.stdout = "A1\t23456\n".to_string();
        launcher.finish(failed);

        let outcome = sched.tick(now + Duration::from_secs(10), &launcher, &mut registry);
        assert_eq!(outcome, TickOutcome::Failed(FetchStatus::Failed { code: 1 }));
        assert!(registry.is_empty());
        assert!(!sched.is_fetch_in_flight());
    }

    #[test]
    fn test_single_fetch_in_flight() {
        let mut sched = scheduler();
        let launcher = ScriptedLauncher::default();
        let mut registry = MemoryRegistry::new();
        let now = Instant::now();

        sched.tick(now, &launcher, &mut registry);
        sched.trigger_now();
        for secs in [10, 30, 64] {
            let outcome = sched.tick(now + Duration::from_secs(secs), &launcher, &mut registry);
            assert_eq!(outcome, TickOutcome::StillRunning);
        }
        assert_eq!(launcher.launches.get(), 1);
    }

    #[test]
    fn test_waits_for_interval() {
        let mut sched = scheduler();
        let launcher = ScriptedLauncher::default();
        let mut registry = MemoryRegistry::new();
        let now = Instant::now();

        sched.tick(now, &launcher, &mut registry);
        launcher.finish(FetchOutcome::success(""));
        sched.tick(now + Duration::from_secs(10), &launcher, &mut registry);

        assert_eq!(
            sched.tick(now + Duration::from_secs(20), &launcher, &mut registry),
            TickOutcome::Idle
        );
        assert_eq!(
            sched.tick(now + Duration::from_secs(60), &launcher, &mut registry),
            TickOutcome::Launched
        );
        assert_eq!(sched.next_due(), Some(now + Duration::from_secs(120)));
        assert_eq!(launcher.launches.get(), 2);
    }

    #[test]
    fn test_deadline_cancels_hung_fetch() {
        let mut sched = scheduler();
        let launcher = ScriptedLauncher::default();
        let mut registry = MemoryRegistry::new();
        let now = Instant::now();

        sched.tick(now, &launcher, &mut registry);
        let late = now + Duration::from_secs(60) + DEADLINE_GRACE;
        assert_eq!(
            sched.tick(late, &launcher, &mut registry),
            TickOutcome::TimedOut
        );
        assert!(*launcher.cancelled.lock().unwrap());
        assert!(!sched.is_fetch_in_flight());
    }

    #[test]
    fn test_launch_failure_skips_cycle() {
        let mut sched = scheduler();
        let launcher = ScriptedLauncher::default();
        launcher.fail.set(true);
        let mut registry = MemoryRegistry::new();
        let now = Instant::now();

        assert!(matches!(
            sched.tick(now, &launcher, &mut registry),
            TickOutcome::LaunchFailed(_)
        ));
        assert!(!sched.is_fetch_in_flight());
        assert_eq!(
            sched.tick(now + Duration::from_secs(30), &launcher, &mut registry),
            TickOutcome::Idle
        );

        launcher.fail.set(false);
        assert_eq!(
            sched.tick(now + Duration::from_secs(60), &launcher, &mut registry),
            TickOutcome::Launched
        );
    }

    #[test]
    fn test_stall_does_not_burst() {
        let mut sched = scheduler();
        let launcher = ScriptedLauncher::default();
        let mut registry = MemoryRegistry::new();
        let now = Instant::now();

        sched.tick(now, &launcher, &mut registry);
        launcher.finish(FetchOutcome::success(""));
        sched.tick(now + Duration::from_secs(1), &launcher, &mut registry);

        let later = now + Duration::from_secs(600);
        sched.tick(later, &launcher, &mut registry);
        assert_eq!(sched.next_due(), Some(later + Duration::from_secs(60)));
    }

    #[test]
    fn test_snapshot_taken_at_launch() {
        let mut sched = scheduler();
        let launcher = ScriptedLauncher::default();
        let mut registry = MemoryRegistry::new();
        let now = Instant::now();

        sched.tick(now, &launcher, &mut registry);
        // Registered by someone else while the fetch is running
        registry
            .create_device(crate::registry::NewDevice::temperature_sensor(1, "A1"))
            .unwrap();
        launcher.finish(FetchOutcome::success("A1\t23456\n"));

        let outcome = sched.tick(now + Duration::from_secs(5), &launcher, &mut registry);
        match outcome {
            TickOutcome::Completed(summary) => assert_eq!(summary.failed, 1),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_cancel() {
        let mut sched = scheduler();
        let launcher = ScriptedLauncher::default();
        let mut registry = MemoryRegistry::new();

        assert!(!sched.cancel());
        sched.tick(Instant::now(), &launcher, &mut registry);
        assert!(sched.cancel());
        assert!(*launcher.cancelled.lock().unwrap());
        assert!(!sched.is_fetch_in_flight());
    }
}
