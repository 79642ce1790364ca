//! Test that storage failures reach the caller.

use std::fs::OpenOptions;

use crate::e2e_tests::helpers::TestTree;
use crate::simulation::{FaultConfig, SimulatedStorage};
use crate::storage::{AvlTree, Schema, StorageError};
use crate::testing::insert_keys;

fn faulty_tree(config: FaultConfig) -> AvlTree<SimulatedStorage> {
    let mut tree = AvlTree::create_in(SimulatedStorage::new(5), Schema::new([10], 1)).unwrap();
    insert_keys(&mut tree, &[50, 25, 75, 12, 36]);
    tree.storage_mut().set_fault_config(config);
    tree
}

#[test]
fn test_read_faults_fail_every_operation() {
    let mut tree = faulty_tree(FaultConfig {
        read_error_rate: 1.0,
        ..FaultConfig::default()
    });

    assert!(matches!(tree.get(36), Err(StorageError::InjectedFault(_))));
    assert!(matches!(tree.find_strings(12), Err(StorageError::InjectedFault(_))));
    assert!(matches!(tree.remove(25), Err(StorageError::InjectedFault(_))));
    assert!(matches!(tree.insert(1, &["1"], &[1]), Err(StorageError::InjectedFault(_))));
    assert!(tree.traverse().next().is_some_and(|r| r.is_err()));
    assert!(tree.storage().stats().injected_read_errors >= 5);
}

#[test]
fn test_write_fault_fails_insert() {
    let mut tree = faulty_tree(FaultConfig {
        write_error_rate: 1.0,
        ..FaultConfig::default()
    });

    assert!(matches!(
        tree.insert(99, &["99"], &[99]),
        Err(StorageError::InjectedFault(_))
    ));
    assert!(matches!(tree.flush(), Err(StorageError::InjectedFault(_))));
}

#[test]
fn test_sync_fault_fails_close() {
    let tree = faulty_tree(FaultConfig {
        sync_error_rate: 1.0,
        ..FaultConfig::default()
    });

    assert!(matches!(tree.close(), Err(StorageError::InjectedFault(_))));
}

#[test]
fn test_truncated_header_fails_open() {
    let mut t = TestTree::new(Schema::new([10, 15, 20], 2));
    let path = t.tree.storage().path().to_path_buf();
    t.insert_keys(&[1]);
    let t = t.reopen();
    t.tree.close().unwrap();

    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(22).unwrap();
    drop(file);

    let error = AvlTree::open(&path).unwrap_err();
    assert!(error.is_unexpected_eof(), "{error}");
}

#[test]
fn test_truncated_record_fails_lookup() {
    let schema = Schema::new([10], 1);
    let header_width = schema.header_width() as u64;
    let mut t = TestTree::new(schema);
    let path = t.tree.storage().path().to_path_buf();
    t.insert_keys(&[1, 2, 3]);
    t.tree.close().unwrap();

    // Cut the file inside the first record; the root lies beyond it.
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(header_width + 4).unwrap();
    drop(file);

    let mut tree = AvlTree::open(&path).unwrap();
    let error = tree.get(1).unwrap_err();
    assert!(error.is_unexpected_eof(), "{error}");
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let error = AvlTree::open(&dir.path().join("nope.avl")).unwrap_err();
    assert!(matches!(error, StorageError::Io(e) if e.kind() == std::io::ErrorKind::NotFound));
}
