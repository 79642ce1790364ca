//! Deterministic Simulation Testing (DST) infrastructure.
//!
//! This module provides tools for testing the tree with:
//! - In-memory storage with fault injection
//! - Reproducible random workloads
//! - Invariant checking after each operation
//!
//! # Design Principles
//!
//! 1. All I/O is abstracted and can be simulated
//! 2. All randomness is seeded for reproducibility
//! 3. Faults can be injected at any I/O boundary
//! 4. Given the same seed, execution is identical
//!
//! # Usage
//!
//! ```
//! use avlstore::simulation::{Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::new(12345) // seed
//!     .with_key_range(200)
//!     .with_remove_ratio(0.4);
//!
//! let mut sim = Simulator::new(config);
//! let result = sim.run(500); // Run 500 operations
//!
//! assert!(result.invariant_violations.is_empty());
//! ```

mod invariants;
mod simulator;
mod storage;

pub use invariants::{
    HistoryStats, InvariantChecker, InvariantViolation, Operation, OperationHistory,
};
pub use simulator::{SimulationResult, Simulator, SimulatorConfig};
pub use storage::{FaultConfig, SimulatedStorage, SimulatedStorageStats};
