//! Existence monitor behavior: deletion detection, isolation, and the
//! empty-registry shutdown path.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use wordwatch::{
    EntityId, ExistenceMonitor, FileSpec, RunState, Shutdown, WatchEntity, WatchEvent,
};

const CHECK_INTERVAL: Duration = Duration::from_millis(100);
const GRACE_DELAY: Duration = Duration::from_millis(50);

fn entity(id: u32, path: &Path, stop: CancellationToken) -> WatchEntity {
    let spec = FileSpec::resolve(EntityId(id), path.to_str().unwrap()).unwrap();
    WatchEntity::new(&spec, 1000 + id, stop)
}

#[tokio::test]
async fn test_deleted_file_cancels_only_its_watcher() {
    let dir = TempDir::new().unwrap();
    let keep = dir.path().join("keep.log");
    let gone = dir.path().join("gone.log");
    std::fs::write(&keep, "").unwrap();
    std::fs::write(&gone, "").unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let (tx, rx) = mpsc::channel(16);
    let monitor = ExistenceMonitor::new(rx, shutdown.clone(), CHECK_INTERVAL, GRACE_DELAY, 2);
    let handle = tokio::spawn(monitor.run());

    let keep_stop = shutdown.entity_token();
    let gone_stop = shutdown.entity_token();
    tx.send(WatchEvent::Started {
        entity: entity(0, &keep, keep_stop.clone()),
    })
    .await
    .unwrap();
    tx.send(WatchEvent::Started {
        entity: entity(1, &gone, gone_stop.clone()),
    })
    .await
    .unwrap();

    std::fs::remove_file(&gone).unwrap();

    // Within one check interval the deleted file's watcher is stopped.
    timeout(Duration::from_secs(5), gone_stop.cancelled())
        .await
        .expect("deletion was not detected");
    assert!(!keep_stop.is_cancelled());
    assert!(shutdown.is_running());

    // Its supervisor winds down and announces the stop.
    tx.send(WatchEvent::Stopped { id: EntityId(1) }).await.unwrap();

    // Once the last file goes, the registry empties and global shutdown
    // follows within one grace delay.
    std::fs::remove_file(&keep).unwrap();
    timeout(Duration::from_secs(5), shutdown.cancelled())
        .await
        .expect("empty registry did not trigger shutdown");
    assert!(keep_stop.is_cancelled());
    assert_ne!(shutdown.state(), RunState::Running);

    handle.await.unwrap();
}

#[tokio::test]
async fn test_empty_registry_waits_for_launch_announcements() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("late.log");
    std::fs::write(&file, "").unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let (tx, rx) = mpsc::channel(16);
    let monitor = ExistenceMonitor::new(rx, shutdown.clone(), CHECK_INTERVAL, GRACE_DELAY, 1);
    let handle = tokio::spawn(monitor.run());

    // Several sweeps pass with nothing registered yet; the monitor must
    // not mistake a not-yet-populated registry for "all files gone".
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(shutdown.is_running());

    let stop = shutdown.entity_token();
    tx.send(WatchEvent::Started {
        entity: entity(0, &file, stop),
    })
    .await
    .unwrap();
    tx.send(WatchEvent::Stopped { id: EntityId(0) }).await.unwrap();

    // Now the barrier has passed and the registry is empty.
    timeout(Duration::from_secs(5), shutdown.cancelled())
        .await
        .expect("shutdown not triggered after last stop");

    handle.await.unwrap();
}

#[tokio::test]
async fn test_failed_launches_count_toward_the_barrier() {
    let shutdown = Arc::new(Shutdown::new());
    let (tx, rx) = mpsc::channel(16);
    let monitor = ExistenceMonitor::new(rx, shutdown.clone(), CHECK_INTERVAL, GRACE_DELAY, 2);
    let handle = tokio::spawn(monitor.run());

    tx.send(WatchEvent::Failed { id: EntityId(0) }).await.unwrap();
    tx.send(WatchEvent::Failed { id: EntityId(1) }).await.unwrap();

    // Every launch failed: nothing to watch, shut down.
    timeout(Duration::from_secs(5), shutdown.cancelled())
        .await
        .expect("shutdown not triggered after all launches failed");

    handle.await.unwrap();
}

#[tokio::test]
async fn test_global_shutdown_stops_the_monitor() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.log");
    std::fs::write(&file, "").unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let (tx, rx) = mpsc::channel(16);
    let monitor = ExistenceMonitor::new(rx, shutdown.clone(), CHECK_INTERVAL, GRACE_DELAY, 1);
    let handle = tokio::spawn(monitor.run());

    tx.send(WatchEvent::Started {
        entity: entity(0, &file, shutdown.entity_token()),
    })
    .await
    .unwrap();

    shutdown.begin();
    shutdown.cancel_all();

    timeout(Duration::from_secs(5), handle)
        .await
        .expect("monitor did not stop on global shutdown")
        .unwrap();
}
