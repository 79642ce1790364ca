//! Header structure and serialization.
//!
//! The header occupies the start of the file and holds the two session
//! addresses (root and free-list head) followed by the field schema.
//!
//! # Layout
//!
//! All integers are big-endian.
//!
//! - `0`: root address (`u64`)
//! - `8`: free-list head address (`u64`)
//! - `16`: number of string fields `S` (`u32`)
//! - `20`: `S` string field lengths (`u32` each)
//! - `20 + 4S`: number of int fields (`u32`)
//!
//! Node records start immediately after the header.

// Field counts and lengths are stored as u32 on disk.
#![allow(clippy::cast_possible_truncation)]

use crate::storage::avl::{ADDRESS_SIZE, Address, HEIGHT_SIZE, INT_SIZE, KEY_SIZE};
use crate::storage::io::{Storage, StorageError};

/// Header field offsets.
mod offsets {
    pub const ROOT: u64 = 0;
    pub const FREE_LIST_HEAD: u64 = 8;
    pub const STRING_FIELD_COUNT: u64 = 16;
    pub const STRING_FIELD_LENGTHS: u64 = 20;
}

/// Size of a `u32` count or length in the header.
const COUNT_SIZE: usize = 4;

/// The per-tree field layout, fixed when the file is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    string_lengths: Vec<u32>,
    int_count: u32,
}

impl Schema {
    /// Create a schema from string field lengths (in bytes) and an int field count.
    #[must_use]
    pub fn new(string_lengths: impl Into<Vec<u32>>, int_count: u32) -> Self {
        Self {
            string_lengths: string_lengths.into(),
            int_count,
        }
    }

    /// Byte length of each string field, in field order.
    #[must_use]
    pub fn string_lengths(&self) -> &[u32] {
        &self.string_lengths
    }

    /// Number of string fields.
    #[must_use]
    pub fn string_count(&self) -> usize {
        self.string_lengths.len()
    }

    /// Number of int fields.
    #[must_use]
    pub const fn int_count(&self) -> usize {
        self.int_count as usize
    }

    /// Width in bytes of one serialized node record.
    ///
    /// `key + strings + ints + left + right + height`
    #[must_use]
    pub fn record_width(&self) -> usize {
        let strings: usize = self.string_lengths.iter().map(|&len| len as usize).sum();
        KEY_SIZE + strings + self.int_count() * INT_SIZE + 2 * ADDRESS_SIZE + HEIGHT_SIZE
    }

    /// Width in bytes of the header that stores this schema.
    #[must_use]
    pub fn header_width(&self) -> usize {
        header_width_for(self.string_count())
    }
}

/// Header width for a schema with `string_count` string fields.
const fn header_width_for(string_count: usize) -> usize {
    2 * ADDRESS_SIZE + COUNT_SIZE + string_count * COUNT_SIZE + COUNT_SIZE
}

/// The header holds the session addresses and the schema.
///
/// During a session the live `root` and `free_list_head` held by the tree
/// are authoritative. The copy on disk only changes when `flush` runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Address of the root record, or 0 for an empty tree.
    pub root: Address,
    /// Address of the first reclaimable record, or 0 for an empty free list.
    pub free_list_head: Address,
    /// Field layout of every record in the file.
    pub schema: Schema,
}

impl Header {
    /// Create a header for an empty tree.
    #[must_use]
    pub const fn new(schema: Schema) -> Self {
        Self {
            root: 0,
            free_list_head: 0,
            schema,
        }
    }

    /// Serialize the whole header.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.schema.header_width());
        buf.extend_from_slice(&self.root.to_be_bytes());
        buf.extend_from_slice(&self.free_list_head.to_be_bytes());
        buf.extend_from_slice(&(self.schema.string_count() as u32).to_be_bytes());
        for len in &self.schema.string_lengths {
            buf.extend_from_slice(&len.to_be_bytes());
        }
        buf.extend_from_slice(&self.schema.int_count.to_be_bytes());
        buf
    }

    /// Write the whole header at offset 0.
    pub fn write_to<S: Storage>(&self, storage: &mut S) -> Result<(), StorageError> {
        storage.write_at(offsets::ROOT, &self.to_bytes())
    }

    /// Read a header from offset 0.
    ///
    /// Stored values are trusted. The only check is that the declared schema
    /// fits inside the file, so a truncated header fails with an
    /// `UnexpectedEof` I/O error instead of decoding past the end.
    pub fn read_from<S: Storage>(storage: &mut S) -> Result<Self, StorageError> {
        let root = storage.read_u64_at(offsets::ROOT)?;
        let free_list_head = storage.read_u64_at(offsets::FREE_LIST_HEAD)?;

        let mut count = [0u8; COUNT_SIZE];
        storage.read_at(offsets::STRING_FIELD_COUNT, &mut count)?;
        let string_count = u32::from_be_bytes(count) as usize;

        let rest_len = string_count
            .saturating_mul(COUNT_SIZE)
            .saturating_add(COUNT_SIZE);
        let end = storage.end_offset()?;
        if offsets::STRING_FIELD_LENGTHS.saturating_add(rest_len as u64) > end {
            return Err(StorageError::unexpected_eof(
                offsets::STRING_FIELD_LENGTHS,
                rest_len,
                end,
            ));
        }

        let mut rest = vec![0u8; rest_len];
        storage.read_at(offsets::STRING_FIELD_LENGTHS, &mut rest)?;

        let mut words = rest
            .chunks_exact(COUNT_SIZE)
            .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]));
        let string_lengths: Vec<u32> = words.by_ref().take(string_count).collect();
        let int_count = words.next().unwrap_or(0);

        Ok(Self {
            root,
            free_list_head,
            schema: Schema {
                string_lengths,
                int_count,
            },
        })
    }

    /// Overwrite only the root and free-list head addresses.
    pub fn flush_addresses<S: Storage>(
        storage: &mut S,
        root: Address,
        free_list_head: Address,
    ) -> Result<(), StorageError> {
        let mut buf = [0u8; 2 * ADDRESS_SIZE];
        buf[..ADDRESS_SIZE].copy_from_slice(&root.to_be_bytes());
        buf[ADDRESS_SIZE..].copy_from_slice(&free_list_head.to_be_bytes());
        storage.write_at(offsets::ROOT, &buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimulatedStorage;

    #[test]
    fn test_record_width() {
        // key 4 + strings 10 + ints 4 + left 8 + right 8 + height 4
        let schema = Schema::new([10], 1);
        assert_eq!(schema.record_width(), 38);

        let schema = Schema::new([10, 15, 20, 30], 4);
        assert_eq!(schema.record_width(), 4 + 75 + 16 + 8 + 8 + 4);
    }

    #[test]
    fn test_header_layout() {
        let mut header = Header::new(Schema::new([10, 15], 2));
        header.root = 0x0102;
        header.free_list_head = 0x0304;

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), header.schema.header_width());
        assert_eq!(bytes.len(), 16 + 4 + 8 + 4);
        assert_eq!(&bytes[0..8], &0x0102u64.to_be_bytes());
        assert_eq!(&bytes[8..16], &0x0304u64.to_be_bytes());
        assert_eq!(&bytes[16..20], &2u32.to_be_bytes());
        assert_eq!(&bytes[20..24], &10u32.to_be_bytes());
        assert_eq!(&bytes[24..28], &15u32.to_be_bytes());
        assert_eq!(&bytes[28..32], &2u32.to_be_bytes());
    }

    #[test]
    fn test_header_read_back() {
        let mut storage = SimulatedStorage::new(1);
        let mut header = Header::new(Schema::new([30, 30], 3));
        header.root = 104;
        header.write_to(&mut storage).expect("write header");

        let restored = Header::read_from(&mut storage).expect("read header");
        assert_eq!(restored, header);
    }

    #[test]
    fn test_flush_addresses_leaves_schema_alone() {
        let mut storage = SimulatedStorage::new(1);
        let header = Header::new(Schema::new([8], 0));
        header.write_to(&mut storage).expect("write header");

        Header::flush_addresses(&mut storage, 500, 700).expect("flush");

        let restored = Header::read_from(&mut storage).expect("read header");
        assert_eq!(restored.root, 500);
        assert_eq!(restored.free_list_head, 700);
        assert_eq!(restored.schema, Schema::new([8], 0));
    }

    #[test]
    fn test_truncated_header() {
        let mut storage = SimulatedStorage::new(1);
        let header = Header::new(Schema::new([10, 10, 10], 1));
        let bytes = header.to_bytes();
        storage.write_at(0, &bytes[..24]).expect("write partial header");

        let result = Header::read_from(&mut storage);
        assert!(result.expect_err("truncated").is_unexpected_eof());
    }

    #[test]
    fn test_empty_file_is_truncated() {
        let mut storage = SimulatedStorage::new(1);
        let result = Header::read_from(&mut storage);
        assert!(result.expect_err("empty").is_unexpected_eof());
    }
}
