//! Test that removing through the predecessor rebalances the nodes it passes.

use crate::e2e_tests::helpers::TestTree;
use crate::storage::Schema;

#[test]
fn test_predecessor_removal_rebalances_spine() {
    let mut t = TestTree::new(Schema::new([10], 1));
    t.insert_keys(&[50, 25, 75, 12, 36, 60, 84, 10]);

    // The predecessor 36 leaves 25 with only the 12 -> 10 chain below it,
    // which must rotate.
    t.tree.remove(50).unwrap();

    assert_eq!(t.keys(), vec![10, 12, 25, 36, 60, 75, 84]);
    let root = t.root();
    assert_eq!((root.key, root.height), (36, 2));

    let left = t.record(root.left);
    assert_eq!((left.key, left.height), (12, 1));
    assert_eq!(t.record(left.left).key, 10);
    assert_eq!(t.record(left.right).key, 25);

    t.assert_valid();
}

#[test]
fn test_deep_predecessor_chain() {
    let mut t = TestTree::new(Schema::new([10], 1));
    let keys: Vec<i32> = (1..=40).collect();
    t.insert_keys(&keys);

    // Remove roots repeatedly so the predecessor walk runs on changing shapes.
    for _ in 0..30 {
        let key = t.root().key;
        t.tree.remove(key).unwrap();
        t.assert_valid();
    }

    assert_eq!(t.tree.count().unwrap(), 10);
}
