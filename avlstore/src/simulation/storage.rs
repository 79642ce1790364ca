//! Simulated in-memory storage for deterministic testing.
//!
//! This module provides an in-memory implementation of the `Storage` trait
//! with support for fault injection:
//! - Read/write errors
//! - Torn writes (a prefix lands, then the write fails)
//! - Sync failures

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::storage::io::{Storage, StorageError};

/// Configuration for fault injection.
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// Probability of a read error (0.0 - 1.0).
    pub read_error_rate: f64,
    /// Probability of a write error (0.0 - 1.0).
    pub write_error_rate: f64,
    /// Probability of a sync error (0.0 - 1.0).
    pub sync_error_rate: f64,
    /// Probability that a write is torn partway through (0.0 - 1.0).
    pub torn_write_rate: f64,
}

impl FaultConfig {
    /// Create a fault config with no faults (for baseline testing).
    #[must_use]
    pub fn no_faults() -> Self {
        Self::default()
    }

    /// Create a fault config with low fault rates (for stress testing).
    #[must_use]
    pub const fn low_faults() -> Self {
        Self {
            read_error_rate: 0.001,
            write_error_rate: 0.001,
            sync_error_rate: 0.001,
            torn_write_rate: 0.001,
        }
    }

    /// Create a fault config with high fault rates (for extreme testing).
    #[must_use]
    pub const fn high_faults() -> Self {
        Self {
            read_error_rate: 0.05,
            write_error_rate: 0.05,
            sync_error_rate: 0.05,
            torn_write_rate: 0.05,
        }
    }
}

/// In-memory storage implementation for deterministic testing.
///
/// Holds the whole file as one growable byte buffer. Writes past the end
/// extend it with zeros; reads past the end fail like a short file read.
///
/// # Thread Safety
///
/// This implementation is not thread-safe. Simulations run on one thread.
pub struct SimulatedStorage {
    data: Vec<u8>,

    /// Fault injection configuration.
    fault_config: FaultConfig,
    /// Random number generator for fault injection.
    rng: StdRng,

    /// Statistics for tracking.
    stats: SimulatedStorageStats,
}

/// Statistics about simulated storage operations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulatedStorageStats {
    /// Number of reads.
    pub reads: u64,
    /// Number of writes.
    pub writes: u64,
    /// Number of syncs.
    pub syncs: u64,
    /// Number of injected read errors.
    pub injected_read_errors: u64,
    /// Number of injected write errors.
    pub injected_write_errors: u64,
    /// Number of injected sync errors.
    pub injected_sync_errors: u64,
    /// Number of torn writes.
    pub torn_writes: u64,
}

impl SimulatedStorage {
    /// Create a new simulated storage with the given seed.
    ///
    /// The seed ensures deterministic behavior - the same seed will
    /// produce the same sequence of faults.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, FaultConfig::default())
    }

    /// Create a new simulated storage with custom fault configuration.
    #[must_use]
    pub fn with_config(seed: u64, fault_config: FaultConfig) -> Self {
        Self {
            data: Vec::new(),
            fault_config,
            rng: StdRng::seed_from_u64(seed),
            stats: SimulatedStorageStats::default(),
        }
    }

    /// Get the current statistics.
    #[must_use]
    pub const fn stats(&self) -> &SimulatedStorageStats {
        &self.stats
    }

    /// Reset statistics.
    pub fn reset_stats(&mut self) {
        self.stats = SimulatedStorageStats::default();
    }

    /// Update the fault configuration.
    pub const fn set_fault_config(&mut self, config: FaultConfig) {
        self.fault_config = config;
    }

    /// A copy of every stored byte.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.clone()
    }

    /// Check if a fault should be injected based on the given rate.
    fn should_inject_fault(&mut self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        self.rng.random::<f64>() < rate
    }

    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(bytes);
    }
}

impl std::fmt::Debug for SimulatedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedStorage")
            .field("len", &self.data.len())
            .field("fault_config", &self.fault_config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// In-memory offsets always fit in usize.
#[allow(clippy::cast_possible_truncation)]
impl Storage for SimulatedStorage {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), StorageError> {
        self.stats.reads += 1;

        let start = offset as usize;
        let end = start.saturating_add(buf.len());
        if end > self.data.len() {
            return Err(StorageError::unexpected_eof(
                offset,
                buf.len(),
                self.data.len() as u64,
            ));
        }

        // Check for injected read error
        if self.should_inject_fault(self.fault_config.read_error_rate) {
            self.stats.injected_read_errors += 1;
            return Err(StorageError::InjectedFault(
                "simulated read error".to_string(),
            ));
        }

        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<(), StorageError> {
        self.stats.writes += 1;

        // Check for injected write error
        if self.should_inject_fault(self.fault_config.write_error_rate) {
            self.stats.injected_write_errors += 1;
            return Err(StorageError::InjectedFault(
                "simulated write error".to_string(),
            ));
        }

        if !bytes.is_empty() && self.should_inject_fault(self.fault_config.torn_write_rate) {
            self.stats.torn_writes += 1;
            let cutoff = self.rng.random_range(0..bytes.len());
            self.write_bytes(offset as usize, &bytes[..cutoff]);
            return Err(StorageError::InjectedFault(format!(
                "simulated torn write ({cutoff} of {} bytes)",
                bytes.len()
            )));
        }

        self.write_bytes(offset as usize, bytes);
        Ok(())
    }

    fn end_offset(&self) -> Result<u64, StorageError> {
        Ok(self.data.len() as u64)
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        self.stats.syncs += 1;

        // Check for injected sync error
        if self.should_inject_fault(self.fault_config.sync_error_rate) {
            self.stats.injected_sync_errors += 1;
            return Err(StorageError::InjectedFault(
                "simulated sync error".to_string(),
            ));
        }

        // In simulated storage, sync is a no-op (writes are already "durable")
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_storage_basic() {
        let mut storage = SimulatedStorage::new(12345);
        assert_eq!(storage.end_offset().unwrap(), 0);

        storage.write_at(0, b"hello").unwrap();
        storage.write_at(10, b"world").unwrap();

        // The gap is zero-filled.
        assert_eq!(storage.end_offset().unwrap(), 15);
        let mut buf = [0xFFu8; 15];
        storage.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello\0\0\0\0\0world");

        storage.write_at(2, b"LL").unwrap();
        assert_eq!(&storage.snapshot()[..5], b"heLLo");
        assert_eq!(storage.stats().writes, 3);
        assert_eq!(storage.stats().reads, 1);
    }

    #[test]
    fn test_simulated_storage_read_past_end() {
        let mut storage = SimulatedStorage::new(12345);
        storage.write_at(0, &[1, 2, 3]).unwrap();

        let mut buf = [0u8; 4];
        let result = storage.read_at(0, &mut buf);
        assert!(result.unwrap_err().is_unexpected_eof());
    }

    #[test]
    fn test_simulated_storage_fault_injection() {
        let config = FaultConfig {
            read_error_rate: 1.0, // Always fail
            ..Default::default()
        };
        let mut storage = SimulatedStorage::with_config(12345, config);
        storage.write_at(0, &[0u8; 8]).unwrap();

        // Read should fail
        let result = storage.read_u64_at(0);
        assert!(matches!(result, Err(StorageError::InjectedFault(_))));

        // Stats should reflect the error
        assert_eq!(storage.stats().injected_read_errors, 1);
    }

    #[test]
    fn test_simulated_storage_torn_write() {
        let config = FaultConfig {
            torn_write_rate: 1.0,
            ..Default::default()
        };
        let mut storage = SimulatedStorage::with_config(12345, config);

        let result = storage.write_at(0, &[0xAB; 32]);
        assert!(matches!(result, Err(StorageError::InjectedFault(_))));
        assert!(storage.end_offset().unwrap() < 32);
        assert_eq!(storage.stats().torn_writes, 1);
    }

    #[test]
    fn test_simulated_storage_sync_fault() {
        let config = FaultConfig {
            sync_error_rate: 1.0,
            ..Default::default()
        };
        let mut storage = SimulatedStorage::with_config(12345, config);

        assert!(storage.sync().is_err());
        assert_eq!(storage.stats().injected_sync_errors, 1);

        storage.set_fault_config(FaultConfig::no_faults());
        storage.reset_stats();
        assert!(storage.sync().is_ok());
        assert_eq!(storage.stats().syncs, 1);
    }

    #[test]
    fn test_simulated_storage_deterministic() {
        // Same seed should produce same behavior
        let config = FaultConfig {
            read_error_rate: 0.5,
            ..Default::default()
        };

        let run = |config: FaultConfig| {
            let mut storage = SimulatedStorage::with_config(12345, config);
            storage.write_at(0, &[0u8; 80]).unwrap();
            (0..10)
                .map(|i| storage.read_u64_at(i * 8).is_ok())
                .collect::<Vec<_>>()
        };

        assert_eq!(
            run(config.clone()),
            run(config),
            "Same seed should produce same fault pattern"
        );
    }
}
