//! Existence monitor: periodic sweep for deleted files.
//!
//! A single task owns the entity registry. Supervisors announce
//! themselves over a channel, so the registry never crosses a task
//! boundary and needs no lock. Sweeps run on a fixed interval that does
//! not stretch with the number of monitored files; `tokio::time::interval`
//! subtracts each sweep's own elapsed time from the following sleep, so
//! the check frequency holds steady as entity count grows.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::entity::{EntityId, WatchEntity};
use crate::registry::{EntryKey, Registry};
use crate::shutdown::Shutdown;
use crate::supervisor::WatchEvent;

pub struct ExistenceMonitor {
    registry: Registry<WatchEntity>,
    keys: HashMap<EntityId, EntryKey>,
    events: mpsc::Receiver<WatchEvent>,
    shutdown: Arc<Shutdown>,
    check_interval: Duration,
    grace_delay: Duration,
    /// Number of supervisors launched at startup.
    expected: usize,
    /// Launch outcomes seen so far (started or failed).
    announced: usize,
}

impl ExistenceMonitor {
    pub fn new(
        events: mpsc::Receiver<WatchEvent>,
        shutdown: Arc<Shutdown>,
        check_interval: Duration,
        grace_delay: Duration,
        expected: usize,
    ) -> Self {
        Self {
            registry: Registry::new(),
            keys: HashMap::new(),
            events,
            shutdown,
            check_interval,
            grace_delay,
            expected,
            announced: 0,
        }
    }

    /// Run the monitor loop until shutdown or until every file is gone.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.check_interval);
        // An overlong sweep catches up immediately instead of waiting
        // out a fresh full period.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    crate::debug_event!("monitor", "shutdown requested");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.apply(event),
                    // All supervisors and the controller dropped their
                    // senders; nothing left to watch over.
                    None => break,
                },
                _ = ticker.tick() => self.sweep(),
            }

            if self.all_gone() {
                if self.shutdown.begin() {
                    crate::log_event!("monitor", "no files left to watch, shutting down");
                }
                // Deliberate cosmetic wait: lets the last supervisor's
                // output land before the farewell line.
                tokio::time::sleep(self.grace_delay).await;
                self.shutdown.cancel_all();
                break;
            }
        }
    }

    /// Startup barrier: an empty registry only means "all gone" once
    /// every launched supervisor has announced an outcome.
    fn all_gone(&self) -> bool {
        self.announced >= self.expected && self.registry.is_empty()
    }

    fn apply(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Started { entity } => {
                crate::debug_event!(
                    "monitor",
                    "watching",
                    "{} (group {})",
                    entity.name,
                    entity.group_id
                );
                let id = entity.id;
                let key = self.registry.insert(entity);
                self.keys.insert(id, key);
                self.announced += 1;
            }
            WatchEvent::Failed { id } => {
                crate::debug_event!("monitor", "launch failed", "entity {id}");
                self.announced += 1;
            }
            WatchEvent::Matched { id } => {
                if let Some(&key) = self.keys.get(&id)
                    && let Some(entity) = self.registry.get_mut(key)
                {
                    entity.updates += 1;
                }
            }
            WatchEvent::Stopped { id } => {
                if let Some(key) = self.keys.remove(&id)
                    && let Ok(entity) = self.registry.remove(key)
                {
                    crate::debug_event!(
                        "monitor",
                        "released",
                        "{} after {} matches",
                        entity.name,
                        entity.updates
                    );
                }
            }
        }
    }

    /// One pass over the registry in insertion order.
    ///
    /// `next_key` is captured before a removal so the sweep continues
    /// from the next surviving entry.
    fn sweep(&mut self) {
        let mut cur = self.registry.first_key();
        while let Some(key) = cur {
            cur = self.registry.next_key(key);

            let gone = self
                .registry
                .get(key)
                .map(|entity| !entity.path.exists())
                .unwrap_or(false);
            if !gone {
                continue;
            }

            match self.registry.remove(key) {
                Ok(entity) => {
                    println!("File deleted: {}\tGonna kill: {}", entity.name, entity.group_id);
                    entity.stop.cancel();
                    self.keys.remove(&entity.id);
                }
                Err(e) => {
                    tracing::debug!("[monitor] stale entry during sweep: {e}");
                }
            }
        }
    }
}
