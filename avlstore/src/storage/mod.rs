//! Record store storage engine.
//!
//! A single-file storage engine holding one AVL tree of fixed-width records.
//!
//! # File Format
//!
//! The tree is stored in a single random-access file:
//!
//! - Offset 0: Header (root address, free-list head, field schema)
//! - After the header: node records, all the same width
//!
//! Released records are chained into a free list and reused before the file
//! grows. The file never shrinks.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use avlstore::storage::{AvlTree, Schema};
//!
//! // Create a new tree with two string fields and one int field
//! let mut tree = AvlTree::create(Path::new("people.avl"), Schema::new([30, 30], 1))?;
//!
//! tree.insert(7, &["Ada", "Lovelace"], &[1815])?;
//! tree.remove(7)?;
//!
//! // Persist the header and sync to disk
//! tree.close()?;
//! # Ok::<(), avlstore::storage::StorageError>(())
//! ```

mod allocator;
pub mod avl;
mod file;
mod header;
pub mod io;

pub use allocator::{Allocation, FreeList};
pub use avl::{Address, AvlTree, Entry, NULL_ADDRESS, Record, Traversal};
pub use file::DatabaseFile;
pub use header::{Header, Schema};
pub use io::{Storage, StorageError};
