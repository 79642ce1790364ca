//! Test inserting keys that already form a balanced tree.

use crate::e2e_tests::helpers::{TestTree, level_order_keys};
use crate::storage::{NULL_ADDRESS, Schema};

#[test]
fn test_level_order_insert_needs_no_rotation() {
    let schema = Schema::new([10], 1);
    let header_width = schema.header_width() as u64;
    let mut t = TestTree::new(schema);

    let keys = level_order_keys(100, 3);
    assert_eq!(keys, vec![50, 25, 75, 12, 36, 60, 84]);
    t.insert_keys(&keys);

    assert_eq!(t.keys(), vec![12, 25, 36, 50, 60, 75, 84]);

    // The first record inserted is still the root.
    assert_eq!(t.tree.root_address(), header_width);
    let root = t.root();
    assert_eq!(root.key, 50);
    assert_eq!(root.height, 2);

    let left = t.record(root.left);
    let right = t.record(root.right);
    assert_eq!((left.key, left.height), (25, 1));
    assert_eq!((right.key, right.height), (75, 1));

    let leaf = t.record(left.left);
    assert_eq!(leaf.key, 12);
    assert_eq!((leaf.left, leaf.right, leaf.height), (NULL_ADDRESS, NULL_ADDRESS, 0));

    t.assert_valid();
}

#[test]
fn test_level_order_insert_finds_every_key() {
    let mut t = TestTree::new(Schema::new([10, 15], 2));
    let keys = level_order_keys(100, 4);
    t.insert_keys(&keys);

    for &key in &keys {
        let text = key.to_string();
        assert_eq!(
            t.tree.find_strings(key).unwrap(),
            Some(vec![text.clone(), text])
        );
        assert_eq!(t.tree.find_ints(key).unwrap(), Some(vec![key, key]));
    }
    assert_eq!(t.tree.find_strings(1).unwrap(), None);
    assert_eq!(t.tree.find_ints(99).unwrap(), None);
    assert_eq!(t.tree.count().unwrap(), keys.len());
}
