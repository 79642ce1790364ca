//! Test operations on a tree with no keys.

use crate::e2e_tests::helpers::TestTree;
use crate::storage::{NULL_ADDRESS, Schema};

#[test]
fn test_new_file_holds_only_header() {
    let schema = Schema::new([10, 15, 20], 1);
    let header_width = schema.header_width() as u64;
    let t = TestTree::new(schema);

    assert_eq!(t.file_len(), header_width);
    assert!(t.tree.is_empty());
    assert_eq!(t.tree.free_list_head(), NULL_ADDRESS);
}

#[test]
fn test_queries_on_empty_tree() {
    let mut t = TestTree::new(Schema::new([10], 1));

    assert_eq!(t.keys(), Vec::<i32>::new());
    assert_eq!(t.tree.find_strings(0).unwrap(), None);
    assert_eq!(t.tree.find_ints(0).unwrap(), None);
    t.tree.remove(0).unwrap();

    let mut t = t.reopen();
    assert!(t.tree.is_empty());
    assert_eq!(t.tree.schema(), &Schema::new([10], 1));
    assert_eq!(t.tree.count().unwrap(), 0);
}
