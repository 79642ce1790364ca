use crate::simulation::{InvariantChecker, SimulatedStorage};
use crate::storage::{AvlTree, Schema, Storage};

/// Create an empty tree in fault-free simulated storage.
#[allow(clippy::expect_used)]
pub fn new_test_tree(schema: Schema) -> AvlTree<SimulatedStorage> {
    AvlTree::create_in(SimulatedStorage::new(1), schema).expect("Failed to create test tree")
}

/// Insert each key with its decimal text in every string field and the key
/// in every int field.
pub fn insert_keys<S: Storage>(tree: &mut AvlTree<S>, keys: &[i32]) {
    let strings_count = tree.schema().string_count();
    let int_count = tree.schema().int_count();

    for &key in keys {
        let text = key.to_string();
        let strings = vec![text.as_str(); strings_count];
        let ints = vec![key; int_count];
        #[allow(clippy::expect_used)]
        tree.insert(key, &strings, &ints).expect("Failed to insert");
    }
}

/// Keys in traversal order.
#[allow(clippy::expect_used)]
pub fn keys<S: Storage>(tree: &mut AvlTree<S>) -> Vec<i32> {
    tree.traverse()
        .map(|entry| entry.expect("Failed to traverse").key)
        .collect()
}

/// Panic with every violation if the tree breaks a structural invariant.
pub fn assert_tree_valid<S: Storage>(tree: &mut AvlTree<S>) {
    let mut checker = InvariantChecker::new();
    #[allow(clippy::expect_used)]
    checker
        .check_structure(tree, 0)
        .expect("Failed to walk tree");
    assert!(
        !checker.has_violations(),
        "Invariant violations: {:?}",
        checker.violations()
    );
}
