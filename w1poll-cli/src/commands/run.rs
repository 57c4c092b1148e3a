//! Poll loop command.

use std::path::Path;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use w1poll_core::poller::Poller;

use super::create_runtime;
use crate::error::CliError;
use crate::util::{create_config_manager, load_settings, open_registry};

/// Run command handler
///
/// Drives the poller from a fixed heartbeat until Ctrl-C.
pub fn cmd_run(config_path: Option<&Path>, heartbeat: Option<u64>) -> Result<(), CliError> {
    let manager = create_config_manager(config_path)?;
    let settings = load_settings(&manager)?;
    let registry = open_registry(&manager, &settings)?;
    let heartbeat = Duration::from_secs(
        heartbeat
            .unwrap_or_else(|| settings.polling.effective_heartbeat_secs())
            .max(1),
    );

    let mut poller = Poller::from_settings(settings, registry)?;
    let runtime = create_runtime()?;

    runtime.block_on(async {
        poller.on_start();

        let mut ticker = tokio::time::interval(heartbeat);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    poller.on_heartbeat();
                }
                result = &mut shutdown => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                    }
                    break;
                }
            }
        }

        poller.on_stop();
    });

    Ok(())
}
