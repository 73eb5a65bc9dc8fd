//! Integration tests for the tail-then-filter pipeline.
//!
//! These spawn real `tail` and `grep` processes, so they need a Unix
//! environment with both utilities on PATH.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;
use wordwatch::FilterPipeline;

/// Time for tail to open the file and seek to its end.
const ATTACH_DELAY: Duration = Duration::from_millis(800);
const MATCH_TIMEOUT: Duration = Duration::from_secs(10);

fn append(path: &Path, line: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    writeln!(file, "{line}").unwrap();
    file.flush().unwrap();
}

#[tokio::test]
async fn test_pipeline_attaches_at_end_of_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.log");
    std::fs::write(&path, "ERROR: before attach\n").unwrap();

    let mut pipeline = FilterPipeline::spawn(&path, "ERROR").unwrap();
    assert!(pipeline.group_id() > 0);

    tokio::time::sleep(ATTACH_DELAY).await;

    append(&path, "nothing of note");
    append(&path, "ERROR: boom");

    let line = timeout(MATCH_TIMEOUT, pipeline.next_match())
        .await
        .expect("no match within timeout")
        .unwrap()
        .expect("stream ended early");

    // Content written before attach is never replayed, non-matching
    // lines are filtered out, and the terminator is stripped.
    assert_eq!(line, "ERROR: boom");

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_non_matching_lines_produce_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quiet.log");
    std::fs::write(&path, "").unwrap();

    let mut pipeline = FilterPipeline::spawn(&path, "ERROR").unwrap();
    tokio::time::sleep(ATTACH_DELAY).await;

    append(&path, "all quiet on this line");

    // No match should surface for a non-matching append.
    let result = timeout(Duration::from_secs(1), pipeline.next_match()).await;
    assert!(result.is_err(), "unexpected match: {result:?}");

    // The stream is still alive: a matching append comes through.
    append(&path, "ERROR: now");
    let line = timeout(MATCH_TIMEOUT, pipeline.next_match())
        .await
        .expect("no match within timeout")
        .unwrap()
        .expect("stream ended early");
    assert_eq!(line, "ERROR: now");

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_ends_the_stream() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.log");
    std::fs::write(&path, "").unwrap();

    let mut pipeline = FilterPipeline::spawn(&path, "ERROR").unwrap();
    pipeline.shutdown().await;

    // Both stages are dead; the line stream drains to its end.
    let end = timeout(MATCH_TIMEOUT, pipeline.next_match())
        .await
        .expect("stream did not end after shutdown")
        .unwrap();
    assert_eq!(end, None);
}

#[tokio::test]
async fn test_independent_pipelines_do_not_interfere() {
    let dir = TempDir::new().unwrap();
    let path_a = dir.path().join("a.log");
    let path_b = dir.path().join("b.log");
    std::fs::write(&path_a, "").unwrap();
    std::fs::write(&path_b, "").unwrap();

    let mut pipeline_a = FilterPipeline::spawn(&path_a, "ERROR").unwrap();
    let mut pipeline_b = FilterPipeline::spawn(&path_b, "ERROR").unwrap();
    assert_ne!(pipeline_a.group_id(), pipeline_b.group_id());

    tokio::time::sleep(ATTACH_DELAY).await;

    append(&path_b, "ERROR: only in b");

    let line = timeout(MATCH_TIMEOUT, pipeline_b.next_match())
        .await
        .expect("no match within timeout")
        .unwrap()
        .expect("stream ended early");
    assert_eq!(line, "ERROR: only in b");

    // The other pipeline saw nothing.
    let quiet = timeout(Duration::from_millis(500), pipeline_a.next_match()).await;
    assert!(quiet.is_err());

    pipeline_a.shutdown().await;
    pipeline_b.shutdown().await;
}
