//! Storage abstraction for deterministic simulation testing.
//!
//! The tree engine never touches a `File` directly. Every record read and
//! write goes through the `Storage` trait, which lets the engine run against
//! a real file in production and against in-memory storage with injected
//! faults in tests.
//!
//! # Design
//!
//! The trait is a minimal byte-addressed random-access interface:
//! - Positioned reads and writes of whole records
//! - The current end-of-storage offset (where the next append lands)
//! - Synchronization to durable storage
//!
//! Implementations perform no caching. A read always observes the bytes of
//! the most recent write covering that range.

use std::io::ErrorKind;

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error.
    Io(std::io::Error),
    /// Injected fault for simulation.
    InjectedFault(String),
}

impl StorageError {
    /// Build the error reported when a read extends past the end of storage.
    #[must_use]
    pub fn unexpected_eof(offset: u64, len: usize, end: u64) -> Self {
        Self::Io(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("read of {len} bytes at offset {offset} extends past end of storage ({end})"),
        ))
    }

    /// Whether this error was caused by reading past the end of storage.
    #[must_use]
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == ErrorKind::UnexpectedEof)
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InjectedFault(msg) => write!(f, "injected fault: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::InjectedFault(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Abstraction over byte-addressed random-access storage.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - `read_at` fills the whole buffer or fails; a short read is an
///   `UnexpectedEof` I/O error, never a partially filled buffer
/// - `write_at` writes the whole slice, extending storage when the range
///   ends past `end_offset`
/// - `end_offset` reflects every completed write
pub trait Storage {
    /// Read exactly `buf.len()` bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Write all of `bytes` starting at `offset`.
    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<(), StorageError>;

    /// Offset one past the last byte currently stored.
    fn end_offset(&self) -> Result<u64, StorageError>;

    /// Sync all pending writes to durable storage.
    fn sync(&mut self) -> Result<(), StorageError>;

    /// Read a big-endian `u64` at `offset`.
    fn read_u64_at(&mut self, offset: u64) -> Result<u64, StorageError> {
        let mut buf = [0u8; 8];
        self.read_at(offset, &mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Write a big-endian `u64` at `offset`.
    fn write_u64_at(&mut self, offset: u64, value: u64) -> Result<(), StorageError> {
        self.write_at(offset, &value.to_be_bytes())
    }
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), StorageError> {
        (**self).read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).write_at(offset, bytes)
    }

    fn end_offset(&self) -> Result<u64, StorageError> {
        (**self).end_offset()
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        (**self).sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let e = StorageError::unexpected_eof(96, 40, 100);
        assert!(e.to_string().contains("offset 96"));
        assert!(e.to_string().contains("end of storage (100)"));
        assert!(e.is_unexpected_eof());

        let e = StorageError::InjectedFault("test fault".to_string());
        assert!(e.to_string().contains("test fault"));
        assert!(!e.is_unexpected_eof());
    }

    #[test]
    fn test_storage_error_source() {
        use std::error::Error;

        let e = StorageError::from(std::io::Error::other("disk on fire"));
        assert!(e.source().is_some());

        let e = StorageError::InjectedFault("x".to_string());
        assert!(e.source().is_none());
    }
}
