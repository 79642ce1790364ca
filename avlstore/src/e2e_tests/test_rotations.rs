//! Test that inserts in sorted order keep the tree balanced.

use crate::e2e_tests::helpers::TestTree;
use crate::storage::Schema;

#[test]
fn test_ascending_three_rotates_left() {
    let mut t = TestTree::new(Schema::new([10], 1));
    t.insert_keys(&[1, 2, 3]);

    let root = t.root();
    assert_eq!((root.key, root.height), (2, 1));

    let left = t.record(root.left);
    let right = t.record(root.right);
    assert_eq!((left.key, left.height), (1, 0));
    assert_eq!((right.key, right.height), (3, 0));
}

#[test]
fn test_ascending_seven_builds_perfect_tree() {
    let mut t = TestTree::new(Schema::new([10], 1));
    t.insert_keys(&[1, 2, 3, 4, 5, 6, 7]);

    let root = t.root();
    assert_eq!((root.key, root.height), (4, 2));
    assert_eq!(t.record(root.left).key, 2);
    assert_eq!(t.record(root.right).key, 6);
    t.assert_valid();
}

#[test]
fn test_descending_and_zigzag_inserts() {
    let mut t = TestTree::new(Schema::new([10], 1));
    let keys: Vec<i32> = (0..64).rev().collect();
    t.insert_keys(&keys);
    t.assert_valid();
    assert!(t.root().height <= 6);

    let mut t = TestTree::new(Schema::new([10], 1));
    let zigzag: Vec<i32> = (0..32).flat_map(|i| [i, 100 - i]).collect();
    t.insert_keys(&zigzag);
    t.assert_valid();
    assert_eq!(t.tree.count().unwrap(), 64);
}
