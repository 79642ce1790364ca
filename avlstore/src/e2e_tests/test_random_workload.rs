//! Test a large seeded workload of inserts and removes.
//!
//! 2000 random keys are inserted, all removed, inserted again in reverse
//! order, then removed again except for the first one.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::e2e_tests::helpers::TestTree;
use crate::simulation::{InvariantChecker, OperationHistory, SimulatedStorage};
use crate::storage::{AvlTree, Schema};
use crate::testing::{keys, new_test_tree};

const TEST_SIZE: usize = 2000;
const CHECK_EVERY: usize = 25;

fn random_keys(seed: u64) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..TEST_SIZE)
        .map(|_| rng.random::<i32>() % 100_000)
        .collect()
}

fn schema() -> Schema {
    Schema::new([10, 15, 20, 30], 4)
}

/// An in-memory tree checked against a model every `CHECK_EVERY` mutations.
struct CheckedTree {
    tree: AvlTree<SimulatedStorage>,
    history: OperationHistory,
    checker: InvariantChecker,
    schema: Schema,
}

impl CheckedTree {
    fn new() -> Self {
        Self {
            tree: new_test_tree(schema()),
            history: OperationHistory::new(),
            checker: InvariantChecker::new(),
            schema: schema(),
        }
    }

    fn insert(&mut self, key: i32) {
        let text = key.to_string();
        let strings = [text.as_str(); 4];
        self.tree.insert(key, &strings, &[key; 4]).unwrap();
        self.history
            .record_insert(key, &strings, &[key; 4], &self.schema);
        self.maybe_check();
    }

    fn remove(&mut self, key: i32) {
        self.tree.remove(key).unwrap();
        self.history.record_remove(key);
        self.maybe_check();
    }

    fn maybe_check(&mut self) {
        if self.history.len() % CHECK_EVERY == 0 {
            self.check();
        }
    }

    fn check(&mut self) {
        let index = self.history.len();
        self.checker.check_structure(&mut self.tree, index).unwrap();
        self.checker
            .check_contents(&mut self.tree, &self.history, index)
            .unwrap();
        assert!(
            !self.checker.has_violations(),
            "{:?}",
            self.checker.violations()
        );
    }
}

#[test]
fn test_random_workload_keeps_invariants() {
    let nums = random_keys(2017);
    let mut t = CheckedTree::new();

    for &key in &nums {
        t.insert(key);
    }
    t.check();

    for &key in &nums {
        t.remove(key);
    }
    t.check();
    assert!(t.tree.is_empty());

    for &key in nums.iter().rev() {
        t.insert(key);
    }
    t.check();

    for &key in nums[1..].iter().rev() {
        t.remove(key);
    }
    t.check();

    let all: BTreeSet<i32> = nums.iter().copied().collect();
    let removed: BTreeSet<i32> = nums[1..].iter().copied().collect();
    let expected: Vec<i32> = all.difference(&removed).copied().collect();
    assert_eq!(keys(&mut t.tree), expected);
}

#[test]
fn test_random_workload_on_file() {
    let nums = random_keys(2017);
    let distinct: BTreeSet<i32> = nums.iter().copied().collect();
    let mut t = TestTree::new(schema());

    t.insert_keys(&nums);
    assert_eq!(t.keys(), distinct.iter().copied().collect::<Vec<_>>());
    t.assert_valid();
    let full_len = t.file_len();

    t.remove_keys(&nums);
    assert!(t.tree.is_empty());

    let reversed: Vec<i32> = nums.iter().rev().copied().collect();
    t.insert_keys(&reversed);
    t.assert_valid();
    // Every record slot freed by the removes is reused.
    assert_eq!(t.file_len(), full_len);

    t.remove_keys(&reversed[..TEST_SIZE - 1]);

    let mut t = t.reopen();
    t.assert_valid();
    let remaining = t.keys();
    assert!(remaining.len() <= 1);
    if remaining.len() == 1 {
        assert_eq!(remaining, vec![nums[0]]);
    }
}
