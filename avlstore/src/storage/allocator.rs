//! Record allocator backed by a free list.
//!
//! Released records form a singly-linked list threaded through the records
//! themselves: the first 8 bytes of a released record hold the address of
//! the next released record, or 0 at the tail. The list head lives in the
//! tree session and is persisted in the header on flush.
//!
//! When the list is empty, allocation hands out the current end of storage.
//! The allocator never writes there itself; the caller's record write is what
//! extends the file. Storage never shrinks.

use crate::storage::avl::{Address, NULL_ADDRESS};
use crate::storage::io::{Storage, StorageError};

/// Where an allocated address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// Popped from the free list.
    Reused(Address),
    /// End of storage; the next record write appends.
    Appended(Address),
}

impl Allocation {
    /// The allocated address.
    #[must_use]
    pub const fn address(self) -> Address {
        match self {
            Self::Reused(addr) | Self::Appended(addr) => addr,
        }
    }
}

/// Free-list allocator for fixed-width records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeList {
    head: Address,
}

impl FreeList {
    /// Create an allocator whose list starts at `head` (0 for empty).
    #[must_use]
    pub const fn new(head: Address) -> Self {
        Self { head }
    }

    /// Address of the first released record, or 0.
    #[must_use]
    pub const fn head(&self) -> Address {
        self.head
    }

    /// Whether no released records are available.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head == NULL_ADDRESS
    }

    /// Obtain an address for a new record.
    ///
    /// Reuses the head of the free list if there is one, otherwise returns
    /// the end of storage. Never returns 0 once a header has been written.
    pub fn allocate<S: Storage>(&mut self, storage: &mut S) -> Result<Allocation, StorageError> {
        if self.is_empty() {
            let addr = storage.end_offset()?;
            debug_assert_ne!(addr, NULL_ADDRESS, "allocation before header was written");
            return Ok(Allocation::Appended(addr));
        }

        let addr = self.head;
        self.head = storage.read_u64_at(addr)?;
        Ok(Allocation::Reused(addr))
    }

    /// Return a record to the free list.
    ///
    /// Overwrites the first 8 bytes of the record with the current head. The
    /// record's contents are dead from this point on.
    pub fn release<S: Storage>(
        &mut self,
        storage: &mut S,
        addr: Address,
    ) -> Result<(), StorageError> {
        debug_assert_ne!(addr, NULL_ADDRESS, "released the null address");
        storage.write_u64_at(addr, self.head)?;
        tracing::trace!("released record {addr}, next free {}", self.head);
        self.head = addr;
        Ok(())
    }
}
