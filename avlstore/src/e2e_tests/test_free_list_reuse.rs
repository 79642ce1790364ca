//! Test that released records are reused before the file grows.

use crate::e2e_tests::helpers::TestTree;
use crate::storage::{NULL_ADDRESS, Schema};

#[test]
fn test_balanced_churn_does_not_grow_file() {
    let schema = Schema::new([10, 15], 2);
    let mut t = TestTree::new(schema);

    let first: Vec<i32> = (0..100).collect();
    t.insert_keys(&first);
    let len = t.file_len();

    t.remove_keys(&first[..50]);
    assert_eq!(t.file_len(), len);

    let second: Vec<i32> = (1000..1050).collect();
    t.insert_keys(&second);

    assert_eq!(t.file_len(), len);
    assert_eq!(t.tree.free_list_head(), NULL_ADDRESS);
    assert_eq!(t.tree.count().unwrap(), 100);
    t.assert_valid();
}

#[test]
fn test_growth_is_only_the_excess() {
    let schema = Schema::new([10], 1);
    let width = schema.record_width() as u64;
    let mut t = TestTree::new(schema);

    t.insert_keys(&(0..20).collect::<Vec<_>>());
    t.remove_keys(&(0..10).collect::<Vec<_>>());
    let len = t.file_len();

    t.insert_keys(&(100..115).collect::<Vec<_>>());

    assert_eq!(t.file_len(), len + 5 * width);
    t.assert_valid();
}

#[test]
fn test_last_released_is_first_reused() {
    let mut t = TestTree::new(Schema::new([10], 1));
    t.insert_keys(&[50, 25, 75]);

    let root = t.root();
    let (left, right) = (root.left, root.right);

    t.tree.remove(25).unwrap();
    t.tree.remove(75).unwrap();
    assert_eq!(t.tree.free_list_head(), right);

    t.insert_keys(&[80]);
    assert_eq!(t.root().right, right);

    t.insert_keys(&[20]);
    assert_eq!(t.root().left, left);
    assert_eq!(t.tree.free_list_head(), NULL_ADDRESS);
}

#[test]
fn test_free_list_survives_reopen() {
    let mut t = TestTree::new(Schema::new([10], 1));
    t.insert_keys(&(0..10).collect::<Vec<_>>());
    t.remove_keys(&[2, 4, 6]);
    let len = t.file_len();

    let mut t = t.reopen();
    assert_ne!(t.tree.free_list_head(), NULL_ADDRESS);

    t.insert_keys(&[20, 21, 22]);
    assert_eq!(t.file_len(), len);
    assert_eq!(t.tree.free_list_head(), NULL_ADDRESS);
    t.assert_valid();
}
