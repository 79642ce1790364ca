//! AVL node records and serialization.
//!
//! Every tree node is stored as one fixed-width record. The width depends
//! only on the schema, so a record's address fully determines where its
//! bytes live.
//!
//! # Layout
//!
//! All integers are big-endian.
//!
//! - `key`: 4 bytes (`i32`)
//! - string fields: `schema.string_lengths()[i]` bytes each, null-padded
//! - int fields: 4 bytes each (`i32`)
//! - `left`: 8 bytes (address, 0 if none)
//! - `right`: 8 bytes (address, 0 if none)
//! - `height`: 4 bytes (`i32`, 0 for a leaf)

#![allow(clippy::cast_possible_truncation)]

use crate::storage::header::Schema;
use crate::storage::io::{Storage, StorageError};

/// A byte offset into the tree file identifying a record.
pub type Address = u64;

/// The address that means "no node". Never the address of a real record.
pub const NULL_ADDRESS: Address = 0;

/// Size of the key field in bytes.
pub const KEY_SIZE: usize = 4;

/// Size of one int field in bytes.
pub const INT_SIZE: usize = 4;

/// Size of a child address in bytes.
pub const ADDRESS_SIZE: usize = 8;

/// Size of the height field in bytes.
pub const HEIGHT_SIZE: usize = 4;

/// A decoded node record.
///
/// String fields are kept as raw fixed-width cells, exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: i32,
    pub strings: Vec<Vec<u8>>,
    pub ints: Vec<i32>,
    pub left: Address,
    pub right: Address,
    pub height: i32,
}

impl Record {
    /// Create a leaf record with no children.
    ///
    /// Each string is truncated or null-padded to its field width. Missing
    /// string or int fields are filled with nulls and zeros; extra fields are
    /// ignored. Callers are expected to supply fields matching the schema.
    #[must_use]
    pub fn leaf(key: i32, strings: &[&str], ints: &[i32], schema: &Schema) -> Self {
        let strings = schema
            .string_lengths()
            .iter()
            .enumerate()
            .map(|(i, &width)| {
                let mut cell = vec![0u8; width as usize];
                if let Some(s) = strings.get(i) {
                    let bytes = s.as_bytes();
                    let n = bytes.len().min(cell.len());
                    cell[..n].copy_from_slice(&bytes[..n]);
                }
                cell
            })
            .collect();

        let ints = (0..schema.int_count())
            .map(|i| ints.get(i).copied().unwrap_or(0))
            .collect();

        Self {
            key,
            strings,
            ints,
            left: NULL_ADDRESS,
            right: NULL_ADDRESS,
            height: 0,
        }
    }

    /// Whether neither child exists.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.left == NULL_ADDRESS && self.right == NULL_ADDRESS
    }

    /// Decoded string fields, each cut at its first null byte.
    #[must_use]
    pub fn string_fields(&self) -> Vec<String> {
        self.strings.iter().map(|cell| decode_cell(cell)).collect()
    }

    /// Copy the key and payload fields of `other` into this record.
    ///
    /// Links and height are left untouched.
    pub fn take_payload(&mut self, other: Self) {
        self.key = other.key;
        self.strings = other.strings;
        self.ints = other.ints;
    }

    /// Serialize the record to its fixed-width form.
    #[must_use]
    pub fn encode(&self, schema: &Schema) -> Vec<u8> {
        let mut buf = Vec::with_capacity(schema.record_width());
        buf.extend_from_slice(&self.key.to_be_bytes());
        for (i, &width) in schema.string_lengths().iter().enumerate() {
            let cell = self.strings.get(i).map_or(&[][..], Vec::as_slice);
            let n = cell.len().min(width as usize);
            buf.extend_from_slice(&cell[..n]);
            buf.resize(buf.len() + (width as usize - n), 0);
        }
        for i in 0..schema.int_count() {
            let value = self.ints.get(i).copied().unwrap_or(0);
            buf.extend_from_slice(&value.to_be_bytes());
        }
        buf.extend_from_slice(&self.left.to_be_bytes());
        buf.extend_from_slice(&self.right.to_be_bytes());
        buf.extend_from_slice(&self.height.to_be_bytes());
        buf
    }

    /// Deserialize a record from exactly `schema.record_width()` bytes.
    #[must_use]
    pub fn decode(bytes: &[u8], schema: &Schema) -> Self {
        let mut reader = FieldReader::new(bytes);

        let key = reader.read_i32();
        let strings = schema
            .string_lengths()
            .iter()
            .map(|&width| reader.read_bytes(width as usize).to_vec())
            .collect();
        let ints = (0..schema.int_count()).map(|_| reader.read_i32()).collect();
        let left = reader.read_u64();
        let right = reader.read_u64();
        let height = reader.read_i32();

        Self {
            key,
            strings,
            ints,
            left,
            right,
            height,
        }
    }

    /// Read the record stored at `addr`.
    pub fn read<S: Storage>(
        storage: &mut S,
        addr: Address,
        schema: &Schema,
    ) -> Result<Self, StorageError> {
        let mut buf = vec![0u8; schema.record_width()];
        storage.read_at(addr, &mut buf)?;
        Ok(Self::decode(&buf, schema))
    }

    /// Write the full record at `addr`.
    pub fn write<S: Storage>(
        &self,
        storage: &mut S,
        addr: Address,
        schema: &Schema,
    ) -> Result<(), StorageError> {
        storage.write_at(addr, &self.encode(schema))
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Key: {}", self.key)?;
        write!(f, "String Fields:")?;
        for s in self.string_fields() {
            write!(f, " {s}")?;
        }
        writeln!(f)?;
        write!(f, "Int Fields:")?;
        for i in &self.ints {
            write!(f, " {i}")?;
        }
        writeln!(f)?;
        writeln!(f, "Left: {}", self.left)?;
        writeln!(f, "Right: {}", self.right)?;
        writeln!(f, "Height: {}", self.height)
    }
}

/// Decode a null-padded cell, stopping at the first null byte.
fn decode_cell(cell: &[u8]) -> String {
    let end = cell.iter().position(|&b| b == 0).unwrap_or(cell.len());
    String::from_utf8_lossy(&cell[..end]).into_owned()
}

/// Sequential big-endian reader over a record buffer.
struct FieldReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn read_bytes(&mut self, len: usize) -> &'a [u8] {
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        slice
    }

    fn read_i32(&mut self) -> i32 {
        let b = self.read_bytes(4);
        i32::from_be_bytes([b[0], b[1], b[2], b[3]])
    }

    fn read_u64(&mut self) -> u64 {
        let b = self.read_bytes(8);
        u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimulatedStorage;

    fn schema() -> Schema {
        Schema::new([10, 4], 2)
    }

    #[test]
    fn test_encode_layout() {
        let schema = schema();
        let mut record = Record::leaf(-7, &["abc", "wxyz"], &[1, -1], &schema);
        record.left = 0x10;
        record.right = 0x20;
        record.height = 3;

        let bytes = record.encode(&schema);
        assert_eq!(bytes.len(), schema.record_width());
        assert_eq!(&bytes[0..4], &(-7i32).to_be_bytes());
        assert_eq!(&bytes[4..14], b"abc\0\0\0\0\0\0\0");
        assert_eq!(&bytes[14..18], b"wxyz");
        assert_eq!(&bytes[18..22], &1i32.to_be_bytes());
        assert_eq!(&bytes[22..26], &(-1i32).to_be_bytes());
        assert_eq!(&bytes[26..34], &0x10u64.to_be_bytes());
        assert_eq!(&bytes[34..42], &0x20u64.to_be_bytes());
        assert_eq!(&bytes[42..46], &3i32.to_be_bytes());
    }

    #[test]
    fn test_leaf_truncates_and_pads() {
        let schema = schema();
        let record = Record::leaf(1, &["a string that is too long", "ab"], &[5], &schema);

        assert_eq!(record.strings[0], b"a string t".to_vec());
        assert_eq!(record.strings[1], b"ab\0\0".to_vec());
        assert_eq!(record.ints, vec![5, 0]);
        assert!(record.is_leaf());
        assert_eq!(record.height, 0);
    }

    #[test]
    fn test_string_fields_stop_at_null() {
        let schema = Schema::new([6], 0);
        let mut record = Record::leaf(1, &[""], &[], &schema);
        record.strings[0] = b"ab\0cd\0".to_vec();

        assert_eq!(record.string_fields(), vec!["ab".to_string()]);
    }

    #[test]
    fn test_full_width_string_has_no_terminator() {
        let schema = Schema::new([4], 0);
        let record = Record::leaf(1, &["full"], &[], &schema);
        let decoded = Record::decode(&record.encode(&schema), &schema);

        assert_eq!(decoded.string_fields(), vec!["full".to_string()]);
    }

    #[test]
    fn test_read_write_at_address() {
        let schema = schema();
        let mut storage = SimulatedStorage::new(1);
        let mut record = Record::leaf(42, &["forty", "two"], &[4, 2], &schema);
        record.right = 99;

        record.write(&mut storage, 64, &schema).expect("write");
        let restored = Record::read(&mut storage, 64, &schema).expect("read");

        assert_eq!(restored, record);
        assert_eq!(restored.string_fields(), vec!["forty", "two"]);
    }

    #[test]
    fn test_read_past_end_fails() {
        let schema = schema();
        let mut storage = SimulatedStorage::new(1);
        storage.write_at(0, &[0u8; 20]).expect("write");

        let result = Record::read(&mut storage, 0, &schema);
        assert!(result.expect_err("short record").is_unexpected_eof());
    }

    #[test]
    fn test_display() {
        let schema = schema();
        let record = Record::leaf(12, &["twelve", "12"], &[12, 24], &schema);
        let text = record.to_string();

        assert!(text.contains("Key: 12"));
        assert!(text.contains("String Fields: twelve 12"));
        assert!(text.contains("Int Fields: 12 24"));
        assert!(text.contains("Height: 0"));
        assert!(!text.contains('\0'));
    }
}
