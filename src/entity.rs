//! Watch entities: one record per monitored file.

use std::fmt;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::error::WatchError;

/// Sequence number assigned at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file argument resolved at startup, before any watcher runs.
///
/// The path is canonicalized exactly once here; every pipeline command
/// uses this resolved path, not the original argument, even after the
/// underlying file is deleted.
#[derive(Debug, Clone)]
pub struct FileSpec {
    pub id: EntityId,
    /// Display label: the argument string as given.
    pub name: String,
    /// Canonicalized absolute path.
    pub path: PathBuf,
}

impl FileSpec {
    /// Resolve a command-line argument into a spec.
    ///
    /// Fails for files that do not exist or cannot be reached; the
    /// caller reports the argument and skips it.
    pub fn resolve(id: EntityId, arg: &str) -> Result<Self, WatchError> {
        let path = std::fs::canonicalize(arg).map_err(|source| WatchError::PathResolve {
            path: PathBuf::from(arg),
            source,
        })?;

        Ok(Self {
            id,
            name: arg.to_string(),
            path,
        })
    }
}

/// A live monitored file as the existence monitor sees it.
///
/// Constructed by the watcher supervisor once its pipeline is running,
/// so `group_id` is always set before the entity is announced and
/// becomes reachable by the monitor's sweep.
#[derive(Debug)]
pub struct WatchEntity {
    pub id: EntityId,
    pub name: String,
    pub path: PathBuf,
    /// OS process-group id owning this entity's pipeline stages.
    pub group_id: u32,
    /// Cancelling this token stops this entity's supervisor and kills
    /// its pipeline group.
    pub stop: CancellationToken,
    /// Advisory count of matches reported so far.
    pub updates: u64,
}

impl WatchEntity {
    pub fn new(spec: &FileSpec, group_id: u32, stop: CancellationToken) -> Self {
        Self {
            id: spec.id,
            name: spec.name.clone(),
            path: spec.path.clone(),
            group_id,
            stop,
            updates: 0,
        }
    }
}
