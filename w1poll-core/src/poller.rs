//! Host lifecycle glue
//!
//! [`Poller`] owns everything a polling session needs and exposes the three
//! callbacks a host drives: start, heartbeat and stop.

use std::time::{Duration, Instant};

use crate::config::PollerSettings;
use crate::error::FetchResult;
use crate::fetch::{FetchConfig, FetchLauncher, SshFetchLauncher};
use crate::registry::DeviceRegistry;
use crate::scheduler::{PollScheduler, TickOutcome};

/// Polling context for one remote host
#[derive(Debug)]
pub struct Poller<L, R> {
    settings: PollerSettings,
    launcher: L,
    registry: R,
    scheduler: PollScheduler,
}

impl<R: DeviceRegistry> Poller<SshFetchLauncher, R> {
    /// Creates a poller that fetches over SSH as configured
    ///
    /// # Errors
    ///
    /// Returns an error if the remote settings are invalid.
    pub fn from_settings(settings: PollerSettings, registry: R) -> FetchResult<Self> {
        let config = FetchConfig::from_settings(&settings)
            .map_err(|e| crate::error::FetchError::InvalidConfig(e.to_string()))?;
        let launcher = SshFetchLauncher::new(&config)?;
        Ok(Self::new(settings, launcher, registry))
    }
}

impl<L: FetchLauncher, R: DeviceRegistry> Poller<L, R> {
    /// Creates a poller from its parts
    #[must_use]
    pub fn new(settings: PollerSettings, launcher: L, registry: R) -> Self {
        let scheduler = PollScheduler::new(
            Duration::from_secs(settings.polling.effective_interval_secs()),
            Duration::from_secs(settings.polling.effective_fetch_timeout_secs()),
        );
        Self {
            settings,
            launcher,
            registry,
            scheduler,
        }
    }

    /// Called once when the host starts polling
    ///
    /// Dumps the configuration and registry when debugging is enabled and
    /// schedules the first fetch for the next heartbeat.
    pub fn on_start(&mut self) {
        let level = self.settings.logging.debug;
        if level.is_enabled() {
            self.dump_state();
        }
        tracing::info!(
            host = %self.settings.remote.target,
            interval_secs = self.scheduler.interval().as_secs(),
            debug_level = level.label(),
            "Poller started"
        );
        self.scheduler.trigger_now();
    }

    /// Called on every heartbeat
    pub fn on_heartbeat(&mut self) -> TickOutcome {
        self.on_heartbeat_at(Instant::now())
    }

    /// Heartbeat with an explicit clock reading
    pub fn on_heartbeat_at(&mut self, now: Instant) -> TickOutcome {
        self.scheduler.tick(now, &self.launcher, &mut self.registry)
    }

    /// Called when the host stops polling
    ///
    /// Returns true if a fetch was cancelled.
    pub fn on_stop(&mut self) -> bool {
        let cancelled = self.scheduler.cancel();
        if cancelled {
            tracing::info!("Poller stopped, cancelled fetch in flight");
        } else {
            tracing::info!("Poller stopped");
        }
        cancelled
    }

    /// Settings in use
    #[must_use]
    pub const fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// The device registry
    #[must_use]
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// The scheduler state
    #[must_use]
    pub const fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    /// Consumes the poller and returns its registry
    pub fn into_registry(self) -> R {
        self.registry
    }

    fn dump_state(&self) {
        tracing::debug!(settings = ?self.settings, "Configuration");
        let devices = self.registry.devices();
        tracing::debug!(count = devices.len(), "Registered devices");
        for device in &devices {
            tracing::debug!(
                unit = device.unit,
                device_id = %device.device_id,
                name = %device.name,
                device_type = %device.device_type,
                used = device.used,
                value = %device.value,
                "Device"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugLevel;
    use crate::error::FetchError;
    use crate::fetch::{FetchOutcome, PendingFetch};
    use crate::registry::MemoryRegistry;
    use std::cell::Cell;
    use std::sync::{Arc, Mutex};

    struct ImmediateFetch {
        outcome: Option<FetchOutcome>,
        cancelled: Arc<Mutex<bool>>,
    }

    impl PendingFetch for ImmediateFetch {
        fn poll(&mut self) -> Option<FetchOutcome> {
            self.outcome.take()
        }

        fn cancel(&mut self) {
            *self.cancelled.lock().unwrap() = true;
        }
    }

    /// Launches fetches that finish with fixed output on the first poll
    struct FixedLauncher {
        stdout: Option<&'static str>,
        launches: Cell<usize>,
        cancelled: Arc<Mutex<bool>>,
    }

    impl FixedLauncher {
        fn new(stdout: Option<&'static str>) -> Self {
            Self {
                stdout,
                launches: Cell::new(0),
                cancelled: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl FetchLauncher for FixedLauncher {
        fn launch(&self) -> FetchResult<Box<dyn PendingFetch>> {
            self.launches.set(self.launches.get() + 1);
            Ok(Box::new(ImmediateFetch {
                outcome: self.stdout.map(FetchOutcome::success),
                cancelled: Arc::clone(&self.cancelled),
            }))
        }
    }

    fn settings() -> PollerSettings {
        let mut settings = PollerSettings::default();
        settings.remote.target = "pi@sensors.local".to_string();
        settings.logging.debug = DebugLevel::All;
        settings
    }

    #[test]
    fn test_start_triggers_initial_fetch() {
        let launcher = FixedLauncher::new(Some("A1\t23456\nA2\t10000\n"));
        let mut poller = Poller::new(settings(), launcher, MemoryRegistry::new());
        let now = Instant::now();

        poller.on_start();
        assert_eq!(poller.on_heartbeat_at(now), TickOutcome::Launched);
        assert!(matches!(
            poller.on_heartbeat_at(now + Duration::from_secs(10)),
            TickOutcome::Completed(_)
        ));
        assert_eq!(poller.registry().get(1).unwrap().value, "23.5");
        assert_eq!(poller.registry().get(2).unwrap().value, "10.0");
    }

    #[test]
    fn test_stop_cancels_in_flight_fetch() {
        let launcher = FixedLauncher::new(None);
        let cancelled = Arc::clone(&launcher.cancelled);
        let mut poller = Poller::new(settings(), launcher, MemoryRegistry::new());

        poller.on_start();
        poller.on_heartbeat();
        assert!(poller.scheduler().is_fetch_in_flight());
        assert!(poller.on_stop());
        assert!(*cancelled.lock().unwrap());
        assert!(!poller.on_stop());
    }

    #[test]
    fn test_heartbeats_respect_interval() {
        let launcher = FixedLauncher::new(Some(""));
        let mut poller = Poller::new(settings(), launcher, MemoryRegistry::new());
        let now = Instant::now();

        poller.on_start();
        for secs in (0..=120).step_by(10) {
            poller.on_heartbeat_at(now + Duration::from_secs(secs));
        }
        // Launches at 0, 60 and 120
        assert_eq!(poller.launcher.launches.get(), 3);
    }

    #[test]
    fn test_from_settings_rejects_empty_target() {
        let result = Poller::from_settings(PollerSettings::default(), MemoryRegistry::new());
        assert!(matches!(result, Err(FetchError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_settings_builds_ssh_command() {
        let poller = Poller::from_settings(settings(), MemoryRegistry::new()).unwrap();
        assert_eq!(poller.settings().remote.target, "pi@sensors.local");
        assert!(poller.into_registry().is_empty());
    }
}
