//! End-to-end tests against file-backed trees.
//!
//! Each test file covers a specific scenario, using deterministic inputs
//! to verify whole insert/remove/find/traverse sessions, including closing
//! and reopening the file.

#![cfg(test)]

mod helpers;

mod test_crash_before_flush;
mod test_duplicate_insert;
mod test_empty_tree;
mod test_fault_propagation;
mod test_free_list_reuse;
mod test_level_order_insert;
mod test_predecessor_spine;
mod test_random_workload;
mod test_remove_two_children;
mod test_rotations;
mod test_round_trip;
mod test_sequence;
