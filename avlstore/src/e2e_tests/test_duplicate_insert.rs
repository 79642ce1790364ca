//! Test that inserting an existing key changes nothing.

use crate::e2e_tests::helpers::{TestTree, level_order_keys};
use crate::storage::Schema;

#[test]
fn test_duplicate_insert_leaves_file_unchanged() {
    let mut t = TestTree::new(Schema::new([10, 15], 2));
    t.insert_keys(&level_order_keys(100, 3));
    t.tree.flush().unwrap();

    let path = t.tree.storage().path().to_path_buf();
    let before = std::fs::read(&path).unwrap();

    t.tree.insert(36, &["changed", "changed"], &[-1, -1]).unwrap();
    t.tree.insert(50, &["root", "root"], &[0, 0]).unwrap();
    t.tree.flush().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(
        t.tree.find_strings(36).unwrap(),
        Some(vec!["36".to_string(), "36".to_string()])
    );
    assert_eq!(t.tree.find_ints(50).unwrap(), Some(vec![50, 50]));
    assert_eq!(t.tree.count().unwrap(), 7);
}
