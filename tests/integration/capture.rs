//! Two-phase capture: staging, promotion and isolation from readers.

use crate::support::{config, open_snapshot, walked_paths, MemorySource};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use treesnap::store::{NodeStore, CAPTURE_BUCKET, SNAPSHOT_BUCKET};
use treesnap::{Endpoint, PathSyncSource, PathSyncTarget, SnapshotError, TreeNode};

#[test]
fn capture_replaces_tree_with_source_walk() {
    let dir = TempDir::new().unwrap();
    let snapshot = open_snapshot(&dir, "left");
    snapshot
        .create_node(&TreeNode::leaf("stale/entry", "old"), false)
        .unwrap();

    let source = MemorySource::leaves(&["/f1", "/dir/f2"]);
    snapshot.capture(&source, &[]).unwrap();

    assert_eq!(walked_paths(&snapshot, "/"), vec!["/dir/f2", "/f1"]);
    assert_eq!(walked_paths(&snapshot, "/dir"), vec!["/dir/f2"]);
    assert_eq!(snapshot.load_node("f1").unwrap().path, "f1");
}

#[test]
fn is_empty_until_first_capture() {
    let dir = TempDir::new().unwrap();
    let snapshot = open_snapshot(&dir, "left");
    assert!(snapshot.is_empty());

    // Incremental writes do not count as a capture.
    snapshot.create_node(&TreeNode::leaf("f", "e"), false).unwrap();
    assert!(snapshot.is_empty());

    snapshot
        .capture(&MemorySource::leaves(&["/f"]), &[])
        .unwrap();
    assert!(!snapshot.is_empty());
}

#[test]
fn failed_capture_leaves_store_unchanged() {
    let dir = TempDir::new().unwrap();
    let snapshot = open_snapshot(&dir, "left");
    snapshot
        .capture(&MemorySource::leaves(&["/keep/a", "/keep/b"]), &[])
        .unwrap();
    let before = walked_paths(&snapshot, "/");

    let failing = MemorySource::leaves(&["/new/1", "/new/2", "/new/3"]).failing_at(1);
    let err = snapshot.capture(&failing, &[]).unwrap_err();
    match err {
        SnapshotError::WalkAborted { root, source } => {
            assert_eq!(root, "/");
            assert!(matches!(*source, SnapshotError::Source(_)));
        }
        other => panic!("expected WalkAborted, got {:?}", other),
    }

    assert_eq!(walked_paths(&snapshot, "/"), before);
}

#[test]
fn failed_first_capture_keeps_snapshot_empty() {
    let dir = TempDir::new().unwrap();
    let snapshot = open_snapshot(&dir, "left");

    let failing = MemorySource::leaves(&["/a", "/b"]).failing_at(0);
    assert!(snapshot.capture(&failing, &[]).is_err());
    assert!(snapshot.is_empty());
    assert!(walked_paths(&snapshot, "/").is_empty());
}

#[test]
fn capture_with_explicit_roots_walks_each() {
    let dir = TempDir::new().unwrap();
    let snapshot = open_snapshot(&dir, "left");

    let source = MemorySource::leaves(&["/a/1", "/b/2", "/c/3", "/top"]);
    snapshot.capture(&source, &["/a", "c"]).unwrap();

    assert_eq!(walked_paths(&snapshot, "/"), vec!["/a/1", "/c/3"]);
}

#[test]
fn failure_in_later_root_discards_earlier_roots() {
    let dir = TempDir::new().unwrap();
    let snapshot = open_snapshot(&dir, "left");
    snapshot
        .capture(&MemorySource::leaves(&["/keep/a", "/keep/b"]), &[])
        .unwrap();
    let before = walked_paths(&snapshot, "/");

    // `/a/1` stages fine, then the walk of `/c` fails on its second node.
    let source = MemorySource::leaves(&["/a/1", "/c/3", "/c/4"]).failing_at(2);
    let err = snapshot.capture(&source, &["/a", "/c"]).unwrap_err();
    match err {
        SnapshotError::WalkAborted { root, source } => {
            assert_eq!(root, "/c");
            assert!(matches!(*source, SnapshotError::Source(_)));
        }
        other => panic!("expected WalkAborted, got {:?}", other),
    }

    assert_eq!(walked_paths(&snapshot, "/"), before);
    assert!(!snapshot.is_empty());
}

#[test]
fn capture_skips_entries_reported_with_errors() {
    let dir = TempDir::new().unwrap();
    let snapshot = open_snapshot(&dir, "left");

    let source = MemorySource::leaves(&["/ok", "/unreadable", "/also-ok"]).with_broken("/unreadable");
    snapshot.capture(&source, &[]).unwrap();

    assert_eq!(walked_paths(&snapshot, "/"), vec!["/also-ok", "/ok"]);
}

#[test]
fn capture_removes_staging_bucket() {
    let dir = TempDir::new().unwrap();
    let snapshot = open_snapshot(&dir, "left");
    snapshot
        .capture(&MemorySource::leaves(&["/x"]), &[])
        .unwrap();
    let database = snapshot.database_path().to_path_buf();
    snapshot.close(false).unwrap();

    let store = NodeStore::open(&database, &config(&dir).store).unwrap();
    let (has_capture, has_snapshot) = store
        .view(|tx| Ok((tx.has_bucket(CAPTURE_BUCKET)?, tx.has_bucket(SNAPSHOT_BUCKET)?)))
        .unwrap();
    assert!(!has_capture);
    assert!(has_snapshot);
}

#[test]
fn stale_staging_bucket_is_replaced() {
    let dir = TempDir::new().unwrap();
    let database = {
        let snapshot = open_snapshot(&dir, "left");
        let database = snapshot.database_path().to_path_buf();
        snapshot.close(false).unwrap();
        database
    };

    // Leftover of a capture interrupted between staging and promotion.
    {
        let store = NodeStore::open(&database, &config(&dir).store).unwrap();
        store
            .update(|tx| {
                tx.create_bucket(CAPTURE_BUCKET)?;
                tx.put(CAPTURE_BUCKET, b"leftover", b"junk".to_vec())
            })
            .unwrap();
        store.close().unwrap();
    }

    let snapshot = open_snapshot(&dir, "left");
    snapshot
        .capture(&MemorySource::leaves(&["/fresh"]), &[])
        .unwrap();
    assert_eq!(walked_paths(&snapshot, "/"), vec!["/fresh"]);
}

#[test]
fn snapshot_can_be_captured_from_another_snapshot() {
    let dir = TempDir::new().unwrap();
    let left = open_snapshot(&dir, "left");
    let right = open_snapshot(&dir, "right");

    left.create_node(&TreeNode::leaf("docs/a.txt", "e1"), false)
        .unwrap();
    left.create_node(&TreeNode::leaf("b.txt", "e2"), false).unwrap();

    right.capture(&left, &[]).unwrap();

    assert_eq!(walked_paths(&right, "/"), walked_paths(&left, "/"));
    assert_eq!(right.load_node("docs/a.txt").unwrap().etag, "e1");
    assert_eq!(right.endpoint_info().uri, "snapshot://right");
}

#[test]
fn readers_observe_old_or_new_tree_during_capture() {
    let dir = TempDir::new().unwrap();
    let snapshot = Arc::new(open_snapshot(&dir, "left"));

    let old_paths: Vec<String> = (0..5).map(|i| format!("/old/{}", i)).collect();
    let new_paths: Vec<String> = (0..40).map(|i| format!("/new/{:02}", i)).collect();
    let old_refs: Vec<&str> = old_paths.iter().map(String::as_str).collect();
    let new_refs: Vec<&str> = new_paths.iter().map(String::as_str).collect();

    snapshot
        .capture(&MemorySource::leaves(&old_refs), &[])
        .unwrap();
    let old_state: BTreeSet<String> = walked_paths(&*snapshot, "/").into_iter().collect();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let snapshot = Arc::clone(&snapshot);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut observed = Vec::new();
            while !done.load(Ordering::Acquire) {
                let state: BTreeSet<String> =
                    walked_paths(&*snapshot, "/").into_iter().collect();
                observed.push(state);
                thread::sleep(Duration::from_millis(1));
            }
            observed
        })
    };

    let source = MemorySource::leaves(&new_refs).with_delay(Duration::from_millis(2));
    snapshot.capture(&source, &[]).unwrap();
    done.store(true, Ordering::Release);

    let new_state: BTreeSet<String> = walked_paths(&*snapshot, "/").into_iter().collect();
    assert_eq!(new_state.len(), 40);

    let observed = reader.join().unwrap();
    assert!(!observed.is_empty());
    for state in observed {
        assert!(
            state == old_state || state == new_state,
            "reader saw an intermediate tree of {} nodes",
            state.len()
        );
    }
}

#[test]
fn nested_read_inside_walk_does_not_wait_for_queued_commit() {
    let dir = TempDir::new().unwrap();
    let snapshot = Arc::new(open_snapshot(&dir, "left"));
    snapshot
        .create_node(&TreeNode::leaf("a", "e1"), false)
        .unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    {
        let snapshot = Arc::clone(&snapshot);
        thread::spawn(move || {
            let mut writer = None;
            let mut nested = None;
            let walked = snapshot.walk(
                &mut |_path: &str, _node: Result<&TreeNode, &SnapshotError>| {
                    if writer.is_some() {
                        return;
                    }
                    let target = Arc::clone(&snapshot);
                    writer = Some(thread::spawn(move || {
                        target
                            .create_node(&TreeNode::leaf("b", "e2"), false)
                            .map_err(|e| e.to_string())
                    }));
                    // Let the commit queue behind this walk's read guard
                    thread::sleep(Duration::from_millis(200));
                    nested = Some(
                        snapshot
                            .load_node("a")
                            .map(|node| node.etag)
                            .map_err(|e| e.to_string()),
                    );
                },
                "/",
            );
            let written = writer.map(|handle| handle.join().unwrap());
            done_tx
                .send((walked.map_err(|e| e.to_string()), nested, written))
                .unwrap();
        });
    }

    let (walked, nested, written) = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("walk with a nested read did not finish");
    walked.unwrap();
    assert_eq!(nested, Some(Ok("e1".to_string())));
    assert_eq!(written, Some(Ok(())));
    assert_eq!(snapshot.load_node("b").unwrap().etag, "e2");
}
