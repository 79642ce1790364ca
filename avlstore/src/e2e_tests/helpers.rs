//! Common helpers for end-to-end tests.

use std::path::PathBuf;

use tempfile::TempDir;

use crate::storage::{AvlTree, Record, Schema, Storage};
use crate::testing;

/// A file-backed tree in its own temporary directory.
///
/// The directory and file are removed when this is dropped.
pub struct TestTree {
    pub tree: AvlTree,
    path: PathBuf,
    dir: TempDir,
}

impl TestTree {
    /// Create a fresh tree file with the given schema.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(schema: Schema) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("tree.avl");
        let tree = AvlTree::create(&path, schema).expect("Failed to create tree");

        Self {
            tree,
            path,
            dir,
        }
    }

    /// Close the tree and open the same file again.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn reopen(self) -> Self {
        self.tree.close().expect("Failed to close tree");
        let tree = AvlTree::open(&self.path).expect("Failed to reopen tree");

        Self {
            tree,
            path: self.path,
            dir: self.dir,
        }
    }

    /// Current length of the tree file in bytes.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn file_len(&self) -> u64 {
        self.tree.storage().end_offset().expect("Failed to stat file")
    }

    pub fn insert_keys(&mut self, keys: &[i32]) {
        testing::insert_keys(&mut self.tree, keys);
    }

    #[allow(clippy::expect_used)]
    pub fn remove_keys(&mut self, keys: &[i32]) {
        for &key in keys {
            self.tree.remove(key).expect("Failed to remove");
        }
    }

    pub fn keys(&mut self) -> Vec<i32> {
        testing::keys(&mut self.tree)
    }

    pub fn assert_valid(&mut self) {
        testing::assert_tree_valid(&mut self.tree);
    }

    /// The record at the root. Panics on an empty tree.
    #[allow(clippy::expect_used)]
    pub fn root(&mut self) -> Record {
        let addr = self.tree.root_address();
        self.tree.read_record(addr).expect("Failed to read root")
    }

    #[allow(clippy::expect_used)]
    pub fn record(&mut self, addr: u64) -> Record {
        self.tree.read_record(addr).expect("Failed to read record")
    }
}

/// Keys that fill a complete binary search tree level by level.
///
/// With `max = 100` and `levels = 3` this is `50, 25, 75, 12, 36, 60, 84`.
#[must_use]
pub fn level_order_keys(max: i32, levels: u32) -> Vec<i32> {
    let mut keys = Vec::new();
    let mut divisor = 2;

    for _ in 0..levels {
        let start = max / divisor;
        let Ok(step) = usize::try_from(2 * start) else {
            break;
        };
        if step == 0 {
            break;
        }
        keys.extend((start..max).step_by(step));
        divisor *= 2;
    }

    keys
}

#[test]
fn test_level_order_keys() {
    assert_eq!(level_order_keys(100, 3), vec![50, 25, 75, 12, 36, 60, 84]);
    assert_eq!(level_order_keys(100, 1), vec![50]);
}
