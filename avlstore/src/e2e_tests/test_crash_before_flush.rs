//! Test what survives when a session ends without flushing the header.

use crate::e2e_tests::helpers::TestTree;
use crate::storage::{AvlTree, Schema};

#[test]
fn test_unflushed_session_leaves_stale_root() {
    let schema = Schema::new([10], 1);
    let header_width = schema.header_width() as u64;
    let mut t = TestTree::new(schema);
    let path = t.tree.storage().path().to_path_buf();

    t.insert_keys(&[1, 2, 3]);

    // Records are on disk, but the header still describes an empty tree.
    let record_bytes = t.file_len() - header_width;
    assert!(record_bytes > 0);
    std::mem::forget(t.tree);

    let mut tree = AvlTree::open(&path).unwrap();
    assert!(tree.is_empty());
    assert_eq!(tree.get(2).unwrap(), None);
    tree.close().unwrap();
}

#[test]
fn test_flushed_keys_survive_crash() {
    let mut t = TestTree::new(Schema::new([10], 1));
    let path = t.tree.storage().path().to_path_buf();

    t.insert_keys(&[10, 20, 30]);
    t.tree.flush().unwrap();
    std::mem::forget(t.tree);

    let mut tree = AvlTree::open(&path).unwrap();
    assert_eq!(tree.find_ints(20).unwrap(), Some(vec![20]));
    assert_eq!(tree.count().unwrap(), 3);
}

#[test]
fn test_drop_without_close_flushes() {
    let mut t = TestTree::new(Schema::new([10], 1));
    let path = t.tree.storage().path().to_path_buf();

    t.insert_keys(&[5, 6]);
    drop(t.tree);

    let mut tree = AvlTree::open(&path).unwrap();
    assert_eq!(tree.count().unwrap(), 2);
}
