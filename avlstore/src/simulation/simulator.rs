//! Main simulator harness for deterministic simulation testing.
//!
//! This module ties together all the simulation components: a seeded
//! workload of inserts and removes runs against a tree in simulated storage,
//! with invariants checked after every operation and the session
//! periodically closed and reopened.

// Simulation code legitimately needs cloning for test data
#![allow(clippy::disallowed_methods)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::invariants::{InvariantChecker, InvariantViolation, OperationHistory};
use super::storage::{FaultConfig, SimulatedStorage};
use crate::storage::{AvlTree, Schema, StorageError};

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Fault injection configuration.
    pub fault_config: FaultConfig,
    /// Field layout of the simulated tree.
    pub schema: Schema,
    /// Keys are drawn from `0..key_range`.
    pub key_range: i32,
    /// Probability that an operation is a remove (0.0 - 1.0).
    pub remove_ratio: f64,
    /// Close and reopen the tree after this many operations (0 = never).
    pub reopen_interval: usize,
}

impl SimulatorConfig {
    /// Create a new simulator config with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            fault_config: FaultConfig::default(),
            schema: Schema::new([10, 15], 2),
            key_range: 500,
            remove_ratio: 0.3,
            reopen_interval: 100,
        }
    }

    /// Set the fault configuration.
    #[must_use]
    pub const fn with_fault_config(mut self, config: FaultConfig) -> Self {
        self.fault_config = config;
        self
    }

    /// Set the tree schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Set the key range.
    #[must_use]
    pub const fn with_key_range(mut self, key_range: i32) -> Self {
        self.key_range = key_range;
        self
    }

    /// Set the remove probability.
    #[must_use]
    pub const fn with_remove_ratio(mut self, ratio: f64) -> Self {
        self.remove_ratio = ratio;
        self
    }

    /// Set how often the session is closed and reopened.
    #[must_use]
    pub const fn with_reopen_interval(mut self, interval: usize) -> Self {
        self.reopen_interval = interval;
        self
    }
}

/// Results from a simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The seed used for this simulation.
    pub seed: u64,
    /// Number of operations applied.
    pub operations_processed: u64,
    /// Number of inserts applied.
    pub inserts: u64,
    /// Number of removes applied.
    pub removes: u64,
    /// Number of times the tree was closed and reopened.
    pub reopens: u64,
    /// Invariant violations detected.
    pub invariant_violations: Vec<InvariantViolation>,
    /// Whether every operation ran without a storage error.
    pub completed_successfully: bool,
    /// The storage error that stopped the simulation.
    pub error: Option<String>,
}

impl SimulationResult {
    /// Check if the simulation passed (no invariant violations).
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.completed_successfully && self.invariant_violations.is_empty()
    }
}

/// The main simulator harness.
pub struct Simulator {
    config: SimulatorConfig,
    rng: StdRng,
    history: OperationHistory,
    checker: InvariantChecker,
    inserts: u64,
    removes: u64,
    reopens: u64,
}

impl Simulator {
    /// Create a new simulator with the given configuration.
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);

        Self {
            config,
            rng,
            history: OperationHistory::new(),
            checker: InvariantChecker::new(),
            inserts: 0,
            removes: 0,
            reopens: 0,
        }
    }

    /// Run the simulation for a given number of operations.
    ///
    /// This creates a fresh tree in simulated storage, applies the
    /// operations, and checks invariants after each one. The first storage
    /// error ends the run; a tree is not usable after a failed write.
    pub fn run(&mut self, operation_count: usize) -> SimulationResult {
        let mut storage =
            SimulatedStorage::with_config(self.config.seed, self.config.fault_config.clone());

        let outcome = self.run_with_storage(&mut storage, operation_count);
        if let Err(e) = &outcome {
            tracing::debug!(seed = self.config.seed, "simulation stopped: {e}");
        }

        SimulationResult {
            seed: self.config.seed,
            operations_processed: self.history.len() as u64,
            inserts: self.inserts,
            removes: self.removes,
            reopens: self.reopens,
            invariant_violations: self.checker.violations().to_vec(),
            completed_successfully: outcome.is_ok(),
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    fn run_with_storage(
        &mut self,
        storage: &mut SimulatedStorage,
        operation_count: usize,
    ) -> Result<(), StorageError> {
        let mut tree = AvlTree::create_in(&mut *storage, self.config.schema.clone())?;

        for i in 0..operation_count {
            self.apply_random_operation(&mut tree)?;

            let index = self.history.len();
            self.checker.check_structure(&mut tree, index)?;
            self.checker
                .check_contents(&mut tree, &self.history, index)?;

            let interval = self.config.reopen_interval;
            if interval > 0 && (i + 1) % interval == 0 {
                tree.close()?;
                tree = AvlTree::open_in(&mut *storage)?;
                self.reopens += 1;
                self.checker
                    .check_contents(&mut tree, &self.history, index)?;
            }
        }

        tree.close()
    }

    fn apply_random_operation(
        &mut self,
        tree: &mut AvlTree<&mut SimulatedStorage>,
    ) -> Result<(), StorageError> {
        let key = self.rng.random_range(0..self.config.key_range.max(1));

        if self.rng.random_bool(self.config.remove_ratio.clamp(0.0, 1.0)) {
            tree.remove(key)?;
            self.history.record_remove(key);
            self.removes += 1;
            return Ok(());
        }

        let name = format!("k{key}");
        let note = format!("v{}", self.rng.random::<u32>());
        let ints: Vec<i32> = (0..self.config.schema.int_count())
            .map(|_| self.rng.random())
            .collect();

        tree.insert(key, &[&name, &note], &ints)?;
        self.history
            .record_insert(key, &[&name, &note], &ints, &self.config.schema);
        self.inserts += 1;
        Ok(())
    }

    /// Get the operation history.
    #[must_use]
    pub const fn history(&self) -> &OperationHistory {
        &self.history
    }

    /// Get the invariant checker.
    #[must_use]
    pub const fn checker(&self) -> &InvariantChecker {
        &self.checker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulator_basic() {
        let config = SimulatorConfig::new(12345);
        let mut simulator = Simulator::new(config);

        let result = simulator.run(300);

        assert!(result.completed_successfully, "{:?}", result.error);
        assert_eq!(result.operations_processed, 300);
        assert_eq!(result.inserts + result.removes, 300);
        assert_eq!(result.reopens, 3);
    }

    #[test]
    fn test_simulator_deterministic() {
        // Same seed should produce same results
        let mut sim1 = Simulator::new(SimulatorConfig::new(12345));
        let result1 = sim1.run(200);

        let mut sim2 = Simulator::new(SimulatorConfig::new(12345));
        let result2 = sim2.run(200);

        assert_eq!(result1.inserts, result2.inserts);
        assert_eq!(result1.removes, result2.removes);
        assert_eq!(sim1.history().operations(), sim2.history().operations());
        assert_eq!(sim1.history().stats(), sim2.history().stats());
    }

    #[test]
    fn test_simulator_no_invariant_violations() {
        let config = SimulatorConfig::new(54321)
            .with_key_range(100)
            .with_remove_ratio(0.5)
            .with_reopen_interval(37);
        let mut simulator = Simulator::new(config);

        let result = simulator.run(1_000);

        assert!(
            result.passed(),
            "Simulation should pass: {:?} {:?}",
            result.error,
            result.invariant_violations
        );
        assert!(simulator.history().stats().hit_removes > 0);
        assert!(simulator.history().stats().duplicate_inserts > 0);
    }

    #[test]
    fn test_simulator_wide_schema() {
        let config = SimulatorConfig::new(7)
            .with_schema(Schema::new([1, 40, 3], 0))
            .with_reopen_interval(0);
        let mut simulator = Simulator::new(config);

        let result = simulator.run(300);

        assert!(result.passed(), "{:?}", result.invariant_violations);
        assert_eq!(result.reopens, 0);
    }

    #[test]
    fn test_simulator_stops_on_injected_fault() {
        let config = SimulatorConfig::new(99).with_fault_config(FaultConfig::high_faults());
        let mut simulator = Simulator::new(config);

        let result = simulator.run(1_000);

        assert!(!result.completed_successfully);
        assert!(result.operations_processed < 1_000);
        assert!(
            result
                .error
                .as_deref()
                .is_some_and(|e| e.contains("injected fault"))
        );
    }

    #[test]
    #[ignore] // Long running test
    fn test_simulator_stress() {
        let config = SimulatorConfig::new(99999)
            .with_key_range(5_000)
            .with_reopen_interval(500);
        let mut simulator = Simulator::new(config);

        let result = simulator.run(20_000);

        assert!(result.passed());
    }
}
