//! Invariant checking for deterministic simulation testing.
//!
//! This module walks a stored tree and reports every structural property
//! that does not hold, and compares the tree's contents with a model of
//! what the applied operations should have produced.

// Simulation code legitimately needs cloning for test data
#![allow(clippy::disallowed_methods)]

use std::collections::{BTreeMap, HashSet};

use crate::storage::{Address, AvlTree, Entry, NULL_ADDRESS, Schema, Storage, StorageError};

/// A recorded operation in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert(i32),
    Remove(i32),
}

/// Tracks the history of operations and the state they should produce.
#[derive(Debug, Default)]
pub struct OperationHistory {
    /// All operations in order.
    operations: Vec<Operation>,
    /// What we expect to be in the tree.
    expected_state: BTreeMap<i32, Entry>,
    /// Inserts of a key that was not yet present.
    new_inserts: u64,
    /// Inserts of a key that was already present.
    duplicate_inserts: u64,
    /// Removes of a present key.
    hit_removes: u64,
    /// Removes of an absent key.
    missed_removes: u64,
}

impl OperationHistory {
    /// Create a new empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an insert. A duplicate key leaves the expected fields unchanged.
    pub fn record_insert(&mut self, key: i32, strings: &[&str], ints: &[i32], schema: &Schema) {
        self.operations.push(Operation::Insert(key));

        if self.expected_state.contains_key(&key) {
            self.duplicate_inserts += 1;
            return;
        }
        self.new_inserts += 1;

        let strings = schema
            .string_lengths()
            .iter()
            .enumerate()
            .map(|(i, &len)| {
                let field = strings.get(i).copied().unwrap_or_default();
                let bytes = &field.as_bytes()[..field.len().min(len as usize)];
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                String::from_utf8_lossy(&bytes[..end]).into_owned()
            })
            .collect();
        let ints = (0..schema.int_count())
            .map(|i| ints.get(i).copied().unwrap_or(0))
            .collect();

        self.expected_state.insert(key, Entry { key, strings, ints });
    }

    /// Record a remove.
    pub fn record_remove(&mut self, key: i32) {
        self.operations.push(Operation::Remove(key));

        if self.expected_state.remove(&key).is_some() {
            self.hit_removes += 1;
        } else {
            self.missed_removes += 1;
        }
    }

    /// Get the number of operations.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if history is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// All recorded operations in order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Get statistics.
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            total_operations: self.operations.len(),
            new_inserts: self.new_inserts,
            duplicate_inserts: self.duplicate_inserts,
            hit_removes: self.hit_removes,
            missed_removes: self.missed_removes,
            live_keys: self.expected_state.len(),
        }
    }

    /// Get the expected state (for verification).
    #[must_use]
    pub const fn expected_state(&self) -> &BTreeMap<i32, Entry> {
        &self.expected_state
    }
}

/// Statistics about the operation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStats {
    /// Total number of operations.
    pub total_operations: usize,
    /// Inserts that added a key.
    pub new_inserts: u64,
    /// Inserts that found the key already present.
    pub duplicate_inserts: u64,
    /// Removes that deleted a key.
    pub hit_removes: u64,
    /// Removes of a key that was not present.
    pub missed_removes: u64,
    /// Number of keys in the expected state.
    pub live_keys: usize,
}

/// An invariant violation detected during simulation.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violation.
    pub description: String,
    /// Operation index where it was detected.
    pub operation_index: usize,
    /// Additional context.
    pub context: String,
}

/// Checker for tree invariants.
pub struct InvariantChecker {
    /// Detected violations.
    violations: Vec<InvariantViolation>,
}

impl Default for InvariantChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk state for one structural check.
struct Walk {
    header_width: u64,
    record_width: u64,
    end: u64,
    live: HashSet<Address>,
}

impl InvariantChecker {
    /// Create a new invariant checker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    /// Get all violations.
    #[must_use]
    pub fn violations(&self) -> &[InvariantViolation] {
        &self.violations
    }

    /// Check if any violations were detected.
    #[must_use]
    pub const fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Clear all recorded violations.
    pub fn clear(&mut self) {
        self.violations.clear();
    }

    /// Add a violation.
    pub fn add_violation(&mut self, violation: InvariantViolation) {
        self.violations.push(violation);
    }

    fn violation(&mut self, operation_index: usize, description: &str, context: String) {
        self.violations.push(InvariantViolation {
            description: description.to_string(),
            operation_index,
            context,
        });
    }

    /// Check ordering, heights, balance, and record accounting.
    ///
    /// Every live record must be reached exactly once from the root, sit on
    /// a record boundary after the header, and be absent from the free list.
    /// Live plus free records must account for every record slot in storage.
    pub fn check_structure<S: Storage>(
        &mut self,
        tree: &mut AvlTree<S>,
        operation_index: usize,
    ) -> Result<(), StorageError> {
        let mut walk = Walk {
            header_width: tree.schema().header_width() as u64,
            record_width: tree.schema().record_width() as u64,
            end: tree.storage().end_offset()?,
            live: HashSet::new(),
        };

        let root = tree.root_address();
        self.check_subtree(tree, &mut walk, root, None, None, operation_index)?;
        let free = self.check_free_list(tree, &walk, operation_index)?;

        let slots = walk.end.saturating_sub(walk.header_width) / walk.record_width;
        let accounted = (walk.live.len() + free) as u64;
        if accounted != slots {
            self.violation(
                operation_index,
                "Record slots not accounted for",
                format!(
                    "{} live + {free} free records, {slots} slots in storage",
                    walk.live.len()
                ),
            );
        }

        Ok(())
    }

    /// Returns the computed height of the subtree at `addr`.
    fn check_subtree<S: Storage>(
        &mut self,
        tree: &mut AvlTree<S>,
        walk: &mut Walk,
        addr: Address,
        lower: Option<i32>,
        upper: Option<i32>,
        operation_index: usize,
    ) -> Result<i32, StorageError> {
        if addr == NULL_ADDRESS {
            return Ok(-1);
        }
        if !walk.live.insert(addr) {
            self.violation(
                operation_index,
                "Record reached twice",
                format!("address {addr}"),
            );
            return Ok(-1);
        }
        if !self.check_slot(walk, addr, operation_index) {
            return Ok(-1);
        }

        let node = tree.read_record(addr)?;
        if lower.is_some_and(|lo| node.key <= lo) || upper.is_some_and(|hi| node.key >= hi) {
            self.violation(
                operation_index,
                "Key out of order",
                format!("key {} at {addr}, bounds {lower:?}..{upper:?}", node.key),
            );
        }

        let left = self.check_subtree(tree, walk, node.left, lower, Some(node.key), operation_index)?;
        let right =
            self.check_subtree(tree, walk, node.right, Some(node.key), upper, operation_index)?;

        let height = 1 + left.max(right);
        if node.height != height {
            self.violation(
                operation_index,
                "Stored height is stale",
                format!("key {} stores {}, computed {height}", node.key, node.height),
            );
        }
        if (left - right).abs() > 1 {
            self.violation(
                operation_index,
                "Node out of balance",
                format!("key {} has child heights {left} and {right}", node.key),
            );
        }

        Ok(height)
    }

    /// Returns false if `addr` cannot hold a record.
    fn check_slot(&mut self, walk: &Walk, addr: Address, operation_index: usize) -> bool {
        let aligned = addr >= walk.header_width
            && (addr - walk.header_width) % walk.record_width == 0
            && addr + walk.record_width <= walk.end;
        if !aligned {
            self.violation(
                operation_index,
                "Address is not a record slot",
                format!("address {addr}, end of storage {}", walk.end),
            );
        }
        aligned
    }

    /// Returns the number of records on the free list.
    fn check_free_list<S: Storage>(
        &mut self,
        tree: &mut AvlTree<S>,
        walk: &Walk,
        operation_index: usize,
    ) -> Result<usize, StorageError> {
        let mut seen = HashSet::new();
        let mut addr = tree.free_list_head();

        while addr != NULL_ADDRESS {
            if !seen.insert(addr) {
                self.violation(
                    operation_index,
                    "Free list has a cycle",
                    format!("address {addr}"),
                );
                break;
            }
            if walk.live.contains(&addr) {
                self.violation(
                    operation_index,
                    "Live record on free list",
                    format!("address {addr}"),
                );
            }
            if !self.check_slot(walk, addr, operation_index) {
                break;
            }
            addr = tree.storage_mut().read_u64_at(addr)?;
        }

        Ok(seen.len())
    }

    /// Check that the tree holds exactly the entries in `history`.
    pub fn check_contents<S: Storage>(
        &mut self,
        tree: &mut AvlTree<S>,
        history: &OperationHistory,
        operation_index: usize,
    ) -> Result<(), StorageError> {
        let actual = tree.traverse().collect::<Result<Vec<_>, _>>()?;
        let expected: Vec<&Entry> = history.expected_state().values().collect();

        if actual.len() != expected.len() {
            self.violation(
                operation_index,
                "Entry count mismatch",
                format!("tree has {}, expected {}", actual.len(), expected.len()),
            );
        }

        if let Some((found, wanted)) = actual
            .iter()
            .zip(expected)
            .find(|(found, wanted)| found != wanted)
        {
            self.violation(
                operation_index,
                "Entry mismatch",
                format!("found {found:?}, expected {wanted:?}"),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimulatedStorage;
    use crate::storage::{Header, Record};

    fn tree_with(keys: &[i32]) -> AvlTree<SimulatedStorage> {
        let mut tree = AvlTree::create_in(SimulatedStorage::new(3), Schema::new([8], 1)).unwrap();
        for &key in keys {
            tree.insert(key, &["x"], &[key]).unwrap();
        }
        tree
    }

    #[test]
    fn test_operation_history_records() {
        let schema = Schema::new([4], 2);
        let mut history = OperationHistory::new();

        history.record_insert(1, &["abcdef"], &[7], &schema);
        history.record_insert(1, &["other"], &[8, 9], &schema);
        history.record_remove(2);
        history.record_insert(2, &[], &[], &schema);
        history.record_remove(2);

        assert_eq!(history.len(), 5);
        let stats = history.stats();
        assert_eq!(stats.new_inserts, 2);
        assert_eq!(stats.duplicate_inserts, 1);
        assert_eq!(stats.hit_removes, 1);
        assert_eq!(stats.missed_removes, 1);
        assert_eq!(stats.live_keys, 1);

        assert_eq!(
            history.expected_state()[&1],
            Entry {
                key: 1,
                strings: vec!["abcd".to_string()],
                ints: vec![7, 0],
            }
        );
    }

    #[test]
    fn test_valid_tree_has_no_violations() {
        let mut tree = tree_with(&[50, 25, 75, 12, 36, 60, 84, 10]);
        tree.remove(50).unwrap();
        tree.remove(84).unwrap();

        let mut checker = InvariantChecker::new();
        checker.check_structure(&mut tree, 0).unwrap();
        assert!(!checker.has_violations(), "{:?}", checker.violations());
    }

    #[test]
    fn test_detects_stale_height() {
        let mut tree = tree_with(&[2, 1, 3]);
        let addr = tree.root_address();
        let mut root = tree.read_record(addr).unwrap();
        root.height = 5;
        let schema = tree.schema().clone();
        root.write(tree.storage_mut(), addr, &schema).unwrap();

        let mut checker = InvariantChecker::new();
        checker.check_structure(&mut tree, 4).unwrap();
        assert_eq!(checker.violations().len(), 1);
        assert_eq!(checker.violations()[0].description, "Stored height is stale");
        assert_eq!(checker.violations()[0].operation_index, 4);
    }

    #[test]
    fn test_detects_out_of_order_key() {
        let mut tree = tree_with(&[2, 1, 3]);
        let root = tree.read_record(tree.root_address()).unwrap();
        let mut left = tree.read_record(root.left).unwrap();
        left.key = 9;
        let schema = tree.schema().clone();
        left.write(tree.storage_mut(), root.left, &schema).unwrap();

        let mut checker = InvariantChecker::new();
        checker.check_structure(&mut tree, 0).unwrap();
        assert!(
            checker
                .violations()
                .iter()
                .any(|v| v.description == "Key out of order")
        );
    }

    #[test]
    fn test_detects_unbalanced_chain() {
        // Hand-build a right-leaning chain 1 -> 2 -> 3 with correct heights.
        let schema = Schema::new([8], 1);
        let mut storage = SimulatedStorage::new(3);
        let header_width = schema.header_width() as u64;
        let width = schema.record_width() as u64;
        let addrs = [header_width, header_width + width, header_width + 2 * width];

        Header::new(schema.clone()).write_to(&mut storage).unwrap();
        for (i, &addr) in addrs.iter().enumerate() {
            let key = i32::try_from(i).unwrap();
            let mut record = Record::leaf(key + 1, &["x"], &[0], &schema);
            record.right = addrs.get(i + 1).copied().unwrap_or(NULL_ADDRESS);
            record.height = 2 - key;
            record.write(&mut storage, addr, &schema).unwrap();
        }
        Header::flush_addresses(&mut storage, addrs[0], NULL_ADDRESS).unwrap();

        let mut tree = AvlTree::open_in(&mut storage).unwrap();

        let mut checker = InvariantChecker::new();
        checker.check_structure(&mut tree, 0).unwrap();
        assert!(
            checker
                .violations()
                .iter()
                .any(|v| v.description == "Node out of balance")
        );
    }

    #[test]
    fn test_detects_live_record_on_free_list() {
        let mut tree = tree_with(&[2, 1, 3]);
        tree.remove(3).unwrap();
        let root = tree.root_address();
        // Point the released record's link at the root.
        let freed = tree.free_list_head();
        tree.storage_mut().write_u64_at(freed, root).unwrap();

        let mut checker = InvariantChecker::new();
        checker.check_structure(&mut tree, 0).unwrap();
        assert!(
            checker
                .violations()
                .iter()
                .any(|v| v.description == "Live record on free list")
        );
    }

    #[test]
    fn test_check_contents() {
        let schema = Schema::new([8], 1);
        let mut tree = tree_with(&[5, 6]);
        let mut history = OperationHistory::new();
        history.record_insert(5, &["x"], &[5], &schema);
        history.record_insert(6, &["x"], &[6], &schema);

        let mut checker = InvariantChecker::new();
        checker.check_contents(&mut tree, &history, 0).unwrap();
        assert!(!checker.has_violations());

        history.record_insert(7, &["x"], &[7], &schema);
        checker.check_contents(&mut tree, &history, 1).unwrap();
        assert_eq!(checker.violations()[0].description, "Entry count mismatch");
    }
}
