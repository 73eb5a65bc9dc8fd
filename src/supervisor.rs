//! Per-entity watcher supervisor.
//!
//! One tokio task per monitored file. The supervisor owns that file's
//! pipeline, drains matched lines, timestamps them, and emits one
//! record per match. It stops when its stop token is cancelled (global
//! shutdown or the existence monitor noticing the file is gone) or
//! when the pipeline's stream ends; it never initiates a stop itself
//! otherwise.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::entity::{EntityId, FileSpec, WatchEntity};
use crate::pipeline::FilterPipeline;

/// Announcements from supervisors to the existence monitor.
///
/// The monitor owns the registry; supervisors never touch it directly.
#[derive(Debug)]
pub enum WatchEvent {
    /// Pipeline is running; the entity arrives with its group id set.
    Started { entity: WatchEntity },
    /// Pipeline could not start; the entity was abandoned.
    Failed { id: EntityId },
    /// One match was emitted (advisory).
    Matched { id: EntityId },
    /// Supervisor exited; the entity can be dropped from the registry.
    Stopped { id: EntityId },
}

pub struct WatcherSupervisor {
    spec: FileSpec,
    word: String,
    stop: CancellationToken,
    events: mpsc::Sender<WatchEvent>,
}

impl WatcherSupervisor {
    pub fn new(
        spec: FileSpec,
        word: String,
        stop: CancellationToken,
        events: mpsc::Sender<WatchEvent>,
    ) -> Self {
        Self {
            spec,
            word,
            stop,
            events,
        }
    }

    /// Run the supervisor state machine to completion.
    ///
    /// Returns whether the pipeline ever started, so the controller can
    /// distinguish "nothing could be watched" from a normal run.
    pub async fn run(self) -> bool {
        let Self {
            spec,
            word,
            stop,
            events,
        } = self;
        let id = spec.id;

        // Starting: attach the pipeline to the resolved path.
        let mut pipeline = match FilterPipeline::spawn(&spec.path, &word) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                tracing::error!("[watcher] cannot start pipeline for {}: {e}", spec.name);
                let _ = events.send(WatchEvent::Failed { id }).await;
                return false;
            }
        };

        let group_id = pipeline.group_id();
        println!(
            "Monitoring `{}` in group {group_id}\nPath: {} - File exists? {}",
            spec.name,
            spec.path.display(),
            if spec.path.exists() { "Yes" } else { "No" }
        );

        let entity = WatchEntity::new(&spec, group_id, stop.clone());
        if events.send(WatchEvent::Started { entity }).await.is_err() {
            // Monitor already gone; nothing to report matches to.
            pipeline.shutdown().await;
            return true;
        }

        // Running: blocking read-loop over the matched-line stream.
        loop {
            tokio::select! {
                _ = stop.cancelled() => {
                    crate::debug_event!("watcher", "stop requested", "{}", spec.name);
                    break;
                }
                line = pipeline.next_match() => match line {
                    Ok(Some(line)) => {
                        // Read time, not write time; close enough for a
                        // human-readable record.
                        let now = chrono::Local::now();
                        println!(
                            "{} - {} - \"{line}\"",
                            now.format("%Y-%m-%dT%H:%M:%S"),
                            spec.name
                        );
                        let _ = events.send(WatchEvent::Matched { id }).await;
                    }
                    Ok(None) => {
                        crate::debug_event!("watcher", "stream ended", "{}", spec.name);
                        break;
                    }
                    Err(e) => {
                        tracing::error!("[watcher] read error on {}: {e}", spec.name);
                        break;
                    }
                },
            }
        }

        // Stopping: both pipeline stages die together.
        pipeline.shutdown().await;
        let _ = events.send(WatchEvent::Stopped { id }).await;
        true
    }
}
