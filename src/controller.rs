//! Controller: startup wiring and the duration countdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::Settings;
use crate::entity::{EntityId, FileSpec};
use crate::error::WatchError;
use crate::monitor::ExistenceMonitor;
use crate::shutdown::{Shutdown, route_interrupt};
use crate::supervisor::WatcherSupervisor;

pub struct Controller {
    settings: Settings,
    duration_secs: u64,
    word: String,
}

impl Controller {
    pub fn new(settings: Settings, duration_secs: u64, word: String) -> Self {
        Self {
            settings,
            duration_secs,
            word,
        }
    }

    /// Monitor the given files until the duration elapses or shutdown
    /// is triggered early.
    ///
    /// Arguments that cannot be resolved are reported and skipped; it
    /// is an error only when none survive.
    pub async fn run(self, files: &[String]) -> Result<(), WatchError> {
        let limit = self.settings.limits.max_watches;
        if files.len() > limit {
            return Err(WatchError::TooManyFiles {
                count: files.len(),
                limit,
            });
        }

        let specs = self.resolve_files(files);
        if specs.is_empty() {
            return Err(WatchError::NoWatchableFiles);
        }

        let shutdown = Arc::new(Shutdown::new());
        let _interrupt = route_interrupt(shutdown.clone())?;

        let (events_tx, events_rx) = mpsc::channel(64);

        let monitor = ExistenceMonitor::new(
            events_rx,
            shutdown.clone(),
            Duration::from_secs(self.settings.monitor.check_interval_secs),
            Duration::from_millis(self.settings.monitor.grace_delay_ms),
            specs.len(),
        );
        let monitor_handle = tokio::spawn(monitor.run());

        let mut watchers = JoinSet::new();
        for spec in specs {
            let supervisor = WatcherSupervisor::new(
                spec,
                self.word.clone(),
                shutdown.entity_token(),
                events_tx.clone(),
            );
            watchers.spawn(supervisor.run());
        }
        // The monitor's channel closes once the last supervisor is done.
        drop(events_tx);

        crate::log_event!(
            "controller",
            "running",
            "{} watchers for {}s",
            watchers.len(),
            self.duration_secs
        );

        self.countdown(&shutdown).await;

        let mut any_started = false;
        while let Some(result) = watchers.join_next().await {
            if let Ok(started) = result {
                any_started |= started;
            }
        }
        let _ = monitor_handle.await;

        shutdown.complete();

        // Resolvable files whose pipelines all failed to start still
        // mean nothing was ever watched.
        if !any_started {
            return Err(WatchError::NoWatchableFiles);
        }

        println!("Shutdown complete. Thank you for choosing wordwatch!");
        Ok(())
    }

    fn resolve_files(&self, files: &[String]) -> Vec<FileSpec> {
        let mut specs = Vec::with_capacity(files.len());
        for (index, arg) in files.iter().enumerate() {
            match FileSpec::resolve(EntityId(index as u32), arg) {
                Ok(spec) => specs.push(spec),
                Err(e) => {
                    println!("Problems with file `{arg}`: skipping it.");
                    tracing::warn!("[controller] {e}");
                }
            }
        }
        specs
    }

    /// Count whole seconds up to the configured duration, checking the
    /// shutdown flag after each one so an early shutdown cuts the
    /// countdown short. Only natural expiry broadcasts the final
    /// cancellation; on early shutdown the path that set the flag has
    /// already initiated teardown.
    async fn countdown(&self, shutdown: &Shutdown) {
        let mut elapsed = 0u64;
        while elapsed < self.duration_secs {
            tokio::time::sleep(Duration::from_secs(1)).await;
            elapsed += 1;
            if !shutdown.is_running() {
                crate::debug_event!("controller", "countdown cut short", "at {elapsed}s");
                return;
            }
        }

        if shutdown.begin() {
            crate::log_event!("controller", "duration elapsed");
        }
        shutdown.cancel_all();
    }
}
