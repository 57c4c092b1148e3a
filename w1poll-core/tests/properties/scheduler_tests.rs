//! Property tests for the poll scheduler

use std::cell::Cell;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use w1poll_core::error::FetchResult;
use w1poll_core::fetch::{FetchLauncher, FetchOutcome, PendingFetch};
use w1poll_core::registry::MemoryRegistry;
use w1poll_core::scheduler::{PollScheduler, TickOutcome};

/// Fetch that finishes after a fixed number of polls
struct CountdownFetch {
    polls_left: u32,
}

impl PendingFetch for CountdownFetch {
    fn poll(&mut self) -> Option<FetchOutcome> {
        if self.polls_left == 0 {
            Some(FetchOutcome::success("28-0001\t21500\n"))
        } else {
            self.polls_left -= 1;
            None
        }
    }

    fn cancel(&mut self) {}
}

struct CountdownLauncher {
    polls: u32,
    launches: Cell<u32>,
}

impl FetchLauncher for CountdownLauncher {
    fn launch(&self) -> FetchResult<Box<dyn PendingFetch>> {
        self.launches.set(self.launches.get() + 1);
        Ok(Box::new(CountdownFetch {
            polls_left: self.polls,
        }))
    }
}

proptest! {
    /// Property: a launch only ever happens while idle, and never ahead of the fixed-rate schedule
    #[test]
    fn launches_respect_single_flight_and_interval(
        interval_secs in 1u64..120,
        polls in 0u32..6,
        steps in prop::collection::vec(1u64..30, 1..80),
    ) {
        let interval = Duration::from_secs(interval_secs);
        let mut scheduler = PollScheduler::new(interval, Duration::from_secs(600));
        let launcher = CountdownLauncher { polls, launches: Cell::new(0) };
        let mut registry = MemoryRegistry::new();

        let start = Instant::now();
        let mut now = start;

        for step in steps {
            let was_in_flight = scheduler.is_fetch_in_flight();
            let outcome = scheduler.tick(now, &launcher, &mut registry);
            if outcome == TickOutcome::Launched {
                prop_assert!(!was_in_flight);
                let earlier = launcher.launches.get() - 1;
                prop_assert!(now >= start + interval * earlier);
            }
            now += Duration::from_secs(step);
        }

        prop_assert!(registry.len() <= 1);
        let elapsed_secs = now.duration_since(start).as_secs();
        prop_assert!(u64::from(launcher.launches.get()) <= elapsed_secs / interval_secs + 1);
    }
}
