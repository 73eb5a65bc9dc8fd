//! Two-stage external line-filter pipeline.
//!
//! Stage A (`tail -n 0 -f`) attaches at the file's current end and
//! streams only newly appended content; stage B
//! (`grep --line-buffered`) passes through only lines containing the
//! search word, with line-level latency. Stage A's stdout feeds stage
//! B's stdin; stage B's stdout feeds the supervisor as a line stream.
//!
//! Both stages are placed in one fresh OS process group (stage A's
//! pid), detached from the terminal's foreground group. A `Ctrl-C` to
//! the whole job therefore reaches the stages only through the
//! controller's deliberate teardown, never from the terminal driver.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

use crate::error::WatchError;

/// A running tail-then-filter pipeline for one file.
pub struct FilterPipeline {
    tail: Child,
    filter: Child,
    lines: Lines<BufReader<ChildStdout>>,
    group_id: u32,
}

impl FilterPipeline {
    /// Spawn both stages and plumb them together.
    ///
    /// `path` must already be canonicalized. Fails immediately if either
    /// stage cannot start or the stages cannot be connected; the caller
    /// abandons the entity with a diagnostic.
    pub fn spawn(path: &Path, word: &str) -> Result<Self, WatchError> {
        let mut tail = Command::new("tail")
            .arg("-n")
            .arg("0")
            .arg("-f")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WatchError::Spawn {
                stage: "tail",
                source,
            })?;

        // With process_group(0) the first stage leads its own group, so
        // its pid doubles as the group id for the whole pipeline.
        let group_id = tail.id().ok_or_else(|| WatchError::Pipe {
            reason: "tail stage exited before its group was recorded".to_string(),
        })?;

        let tail_out = tail.stdout.take().ok_or_else(|| WatchError::Pipe {
            reason: "tail stage has no captured stdout".to_string(),
        })?;
        let filter_in: Stdio = tail_out.try_into().map_err(|e: std::io::Error| {
            WatchError::Pipe {
                reason: format!("cannot hand tail output to the filter stage: {e}"),
            }
        })?;

        let mut filter = Command::new("grep")
            .arg("--line-buffered")
            .arg(word)
            .stdin(filter_in)
            .stdout(Stdio::piped())
            .process_group(group_id as i32)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WatchError::Spawn {
                stage: "grep",
                source,
            })?;

        let filter_out = filter.stdout.take().ok_or_else(|| WatchError::Pipe {
            reason: "filter stage has no captured stdout".to_string(),
        })?;

        crate::debug_event!("pipeline", "attached", "{} (group {group_id})", path.display());

        Ok(Self {
            tail,
            filter,
            lines: BufReader::new(filter_out).lines(),
            group_id,
        })
    }

    /// Process-group id owning both stages.
    pub fn group_id(&self) -> u32 {
        self.group_id
    }

    /// Next matched line, terminator stripped.
    ///
    /// `None` means the stream ended: the filter stage exited, which
    /// happens once the tail stage dies and the pipe drains.
    pub async fn next_match(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }

    /// Kill both stages and reap them.
    ///
    /// Killing the tail stage alone would end the filter through pipe
    /// EOF eventually; killing both keeps teardown immediate and leaves
    /// no orphan in the group.
    pub async fn shutdown(&mut self) {
        let _ = self.filter.start_kill();
        let _ = self.tail.start_kill();
        let _ = self.tail.wait().await;
        let _ = self.filter.wait().await;
        crate::debug_event!("pipeline", "reaped", "group {}", self.group_id);
    }
}
