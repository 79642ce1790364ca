//! AVL tree implementation for the record store.
//!
//! This module provides a disk-based, height-balanced binary search tree
//! keyed by `i32`. Nodes are fixed-width records addressed by byte offset.
//!
//! # Structure
//!
//! Each node record holds its key, the per-tree string and int fields, the
//! addresses of its two children, and its height. A leaf has height 0 and a
//! missing child counts as height -1.
//!
//! # Usage
//!
//! ```
//! use avlstore::simulation::SimulatedStorage;
//! use avlstore::storage::{AvlTree, Schema};
//!
//! let schema = Schema::new([10], 1);
//! let mut tree = AvlTree::create_in(SimulatedStorage::new(1), schema)?;
//!
//! tree.insert(2, &["two"], &[20])?;
//! tree.insert(1, &["one"], &[10])?;
//! tree.insert(3, &["three"], &[30])?;
//!
//! assert_eq!(tree.find_ints(1)?, Some(vec![10]));
//! let keys = tree
//!     .traverse()
//!     .map(|entry| entry.map(|e| e.key))
//!     .collect::<Result<Vec<_>, _>>()?;
//! assert_eq!(keys, vec![1, 2, 3]);
//! # Ok::<(), avlstore::storage::StorageError>(())
//! ```

mod node;
mod tree;

pub use node::{ADDRESS_SIZE, Address, HEIGHT_SIZE, INT_SIZE, KEY_SIZE, NULL_ADDRESS, Record};
pub use tree::{AvlTree, Entry, Traversal};
