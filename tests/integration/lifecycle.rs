//! Opening, locating and closing snapshots.

use crate::support::{config, open_snapshot, walked_paths, with_xdg_env, SYNC_ID};
use tempfile::TempDir;
use treesnap::{PathSyncTarget, Snapshot, SnapshotError, TreeNode};

#[test]
fn location_follows_sync_layout() {
    let dir = TempDir::new().unwrap();
    let snapshot = open_snapshot(&dir, "left");

    let expected_folder = dir.path().join("sync").join(SYNC_ID);
    assert_eq!(snapshot.location().folder, expected_folder);
    assert_eq!(snapshot.database_path(), expected_folder.join("snapshot-left"));
    assert_eq!(snapshot.name(), "left");
    assert!(expected_folder.is_dir());
}

#[test]
fn reopened_snapshot_keeps_data_and_is_not_empty() {
    let dir = TempDir::new().unwrap();
    {
        let snapshot = open_snapshot(&dir, "left");
        assert!(snapshot.is_empty());
        snapshot
            .create_node(&TreeNode::leaf("a/b", "e1"), false)
            .unwrap();
        snapshot.close(false).unwrap();
    }

    let snapshot = open_snapshot(&dir, "left");
    assert!(!snapshot.is_empty());
    assert_eq!(walked_paths(&snapshot, "/"), vec!["/a", "/a/b"]);
}

#[test]
fn close_with_delete_removes_sync_folder() {
    let dir = TempDir::new().unwrap();
    let left = open_snapshot(&dir, "left");
    let folder = left.location().folder.clone();
    left.create_node(&TreeNode::leaf("f", "e"), false).unwrap();

    left.close(true).unwrap();
    assert!(!folder.exists());

    let fresh = open_snapshot(&dir, "left");
    assert!(fresh.is_empty());
    assert!(walked_paths(&fresh, "/").is_empty());
}

#[test]
fn snapshots_of_one_pair_are_independent() {
    let dir = TempDir::new().unwrap();
    let left = open_snapshot(&dir, "left");
    let right = open_snapshot(&dir, "right");

    left.create_node(&TreeNode::leaf("only-left", "e"), false)
        .unwrap();

    assert_eq!(walked_paths(&left, "/"), vec!["/only-left"]);
    assert!(walked_paths(&right, "/").is_empty());
}

#[test]
fn invalid_identifiers_are_rejected() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    for (name, sync_id) in [("left", ".."), ("left", "a/b"), ("", SYNC_ID), ("../x", SYNC_ID)] {
        match Snapshot::open(name, sync_id, &config) {
            Err(SnapshotError::InvalidIdentifier(_)) => {}
            Err(other) => panic!("expected InvalidIdentifier for {:?}/{:?}, got {}", sync_id, name, other),
            Ok(_) => panic!("accepted {:?}/{:?}", sync_id, name),
        }
    }
    assert!(!dir.path().join("sync").exists());
}

#[test]
fn second_open_of_held_snapshot_fails_within_timeout() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.store.open_timeout_ms = 200;
    config.store.open_retry_interval_ms = 20;

    let _held = Snapshot::open("left", SYNC_ID, &config).unwrap();
    let started = std::time::Instant::now();
    let second = Snapshot::open("left", SYNC_ID, &config);

    assert!(matches!(
        second,
        Err(SnapshotError::OpenTimeout { .. }) | Err(SnapshotError::OpenFailure { .. })
    ));
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[test]
fn new_resolves_location_from_xdg_data_home() {
    let dir = TempDir::new().unwrap();
    let previous = std::env::var_os("XDG_DATA_HOME");

    with_xdg_env(&dir, || {
        let snapshot = Snapshot::new("left", "xdg-pair").unwrap();
        assert_eq!(
            snapshot.database_path(),
            dir.path()
                .join("data")
                .join("treesnap")
                .join("sync")
                .join("xdg-pair")
                .join("snapshot-left")
        );
        snapshot.close(true).unwrap();
    });

    assert_eq!(std::env::var_os("XDG_DATA_HOME"), previous);
}
