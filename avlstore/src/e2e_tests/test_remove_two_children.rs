//! Test removing a node with two children.

use crate::e2e_tests::helpers::{TestTree, level_order_keys};
use crate::storage::Schema;

#[test]
fn test_remove_root_uses_predecessor() {
    let mut t = TestTree::new(Schema::new([10], 1));
    t.insert_keys(&level_order_keys(100, 3));
    let root_addr = t.tree.root_address();

    t.tree.remove(50).unwrap();

    assert_eq!(t.keys(), vec![12, 25, 36, 60, 75, 84]);

    // The root record stays in place and takes the predecessor's payload.
    assert_eq!(t.tree.root_address(), root_addr);
    let root = t.root();
    assert_eq!((root.key, root.height), (36, 2));
    assert_eq!(t.tree.find_strings(36).unwrap(), Some(vec!["36".to_string()]));
    assert_eq!(t.tree.find_ints(36).unwrap(), Some(vec![36]));
    assert_eq!(t.tree.get(50).unwrap(), None);

    t.assert_valid();
}

#[test]
fn test_remove_inner_node_with_two_children() {
    let mut t = TestTree::new(Schema::new([10], 1));
    t.insert_keys(&level_order_keys(100, 3));

    t.tree.remove(75).unwrap();

    assert_eq!(t.keys(), vec![12, 25, 36, 50, 60, 84]);
    let root = t.root();
    assert_eq!(t.record(root.right).key, 60);
    t.assert_valid();
}
