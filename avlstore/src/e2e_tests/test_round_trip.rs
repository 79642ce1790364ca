//! Test that closing and reopening a tree preserves its contents.

use crate::e2e_tests::helpers::{TestTree, level_order_keys};
use crate::storage::{Entry, Schema};

fn entries(t: &mut TestTree) -> Vec<Entry> {
    t.tree.traverse().collect::<Result<_, _>>().unwrap()
}

#[test]
fn test_close_and_open_reproduces_tree() {
    let mut t = TestTree::new(Schema::new([10, 15], 2));
    t.insert_keys(&level_order_keys(100, 4));
    t.remove_keys(&[50, 6, 90, 37]);

    let before = entries(&mut t);
    let root = t.tree.root_address();
    let free_list_head = t.tree.free_list_head();
    let schema = t.tree.schema().clone();

    let mut t = t.reopen();

    assert_eq!(entries(&mut t), before);
    assert_eq!(t.tree.root_address(), root);
    assert_eq!(t.tree.free_list_head(), free_list_head);
    assert_eq!(t.tree.schema(), &schema);
    t.assert_valid();
}

#[test]
fn test_removing_leaves_across_reopen() {
    // Removes only leaves, then finishes the tree off after a reopen.
    let nums = level_order_keys(100, 3);
    let mut t = TestTree::new(Schema::new([10, 15], 2));
    t.insert_keys(&nums);

    for &key in nums[3..].iter().rev() {
        t.tree.remove(key).unwrap();
    }
    assert_eq!(t.keys(), vec![25, 50, 75]);

    let mut t = t.reopen();
    assert_eq!(t.keys(), vec![25, 50, 75]);

    t.remove_keys(&[nums[2], nums[1], nums[0]]);
    assert!(t.tree.is_empty());

    let len = t.file_len();
    t.tree
        .insert(999, &["Root", "Node Only"], &[999, 999])
        .unwrap();

    // The new root reuses a released record.
    assert_eq!(t.file_len(), len);
    assert_eq!(t.keys(), vec![999]);
    assert_eq!(
        t.tree.find_strings(999).unwrap(),
        Some(vec!["Root".to_string(), "Node Only".to_string()])
    );

    let mut t = t.reopen();
    assert_eq!(t.tree.find_ints(999).unwrap(), Some(vec![999, 999]));
}
