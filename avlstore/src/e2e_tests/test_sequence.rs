//! Test a sequence with rotations, non-leaf removes, and a reopen.

use crate::e2e_tests::helpers::{TestTree, level_order_keys};
use crate::storage::Schema;

#[test]
fn test_reverse_inserts_then_removes() {
    let nums = level_order_keys(100, 4);
    let mut t = TestTree::new(Schema::new([10, 15, 20], 1));

    let reversed: Vec<i32> = nums.iter().rev().copied().collect();
    t.insert_keys(&reversed);
    t.assert_valid();

    let mut sorted = nums.clone();
    sorted.sort_unstable();
    assert_eq!(t.keys(), sorted);

    for &key in nums[3..].iter().rev() {
        t.tree.remove(key).unwrap();
        t.assert_valid();
    }
    assert_eq!(t.keys(), vec![25, 50, 75]);

    let mut t = t.reopen();
    assert_eq!(t.keys(), vec![25, 50, 75]);

    t.remove_keys(&[nums[2], nums[1], nums[0]]);
    t.tree
        .insert(999, &["Root", "Node", "Only"], &[999])
        .unwrap();

    assert_eq!(t.keys(), vec![999]);
    assert_eq!(
        t.tree.find_strings(999).unwrap(),
        Some(vec!["Root".to_string(), "Node".to_string(), "Only".to_string()])
    );
    assert_eq!(t.tree.find_ints(999).unwrap(), Some(vec![999]));
}

#[test]
fn test_interleaved_inserts_and_removes() {
    let mut t = TestTree::new(Schema::new([10], 1));

    for round in 0..10 {
        let base = round * 10;
        t.insert_keys(&(base..base + 10).collect::<Vec<_>>());
        t.remove_keys(&[base + 1, base + 5, base + 9]);
        t.assert_valid();
    }

    let keys = t.keys();
    assert_eq!(keys.len(), 70);
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
    assert!(!keys.contains(&45));
}
