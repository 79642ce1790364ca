//! AVL tree engine over a record file.
//!
//! The tree keeps no nodes in memory between calls. Every step of every
//! operation reads the record it needs from storage, and every change to a
//! node's links or height is written back immediately at the node's
//! address. Recursive operations return the (possibly new) address of the
//! subtree root they were given; the caller stores it in its own child link
//! or in the session root.
//!
//! The session root and free-list head are held here and only reach the
//! header when `flush` or `close` runs. A crash between a mutation and the
//! next flush leaves a stale root on disk.

use std::cmp::Ordering;
use std::path::Path;

use crate::storage::allocator::{Allocation, FreeList};
use crate::storage::avl::node::{Address, NULL_ADDRESS, Record};
use crate::storage::file::DatabaseFile;
use crate::storage::header::{Header, Schema};
use crate::storage::io::{Storage, StorageError};

/// The decoded contents of one tree entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: i32,
    pub strings: Vec<String>,
    pub ints: Vec<i32>,
}

impl From<Record> for Entry {
    fn from(record: Record) -> Self {
        Self {
            key: record.key,
            strings: record.string_fields(),
            ints: record.ints,
        }
    }
}

/// An AVL tree stored in a single random-access file.
///
/// # Pre-conditions
///
/// Field slices passed to `insert` are expected to match the schema the
/// tree was created with. Mismatched shapes are not reported.
pub struct AvlTree<S: Storage = DatabaseFile> {
    storage: S,
    schema: Schema,
    root: Address,
    free_list: FreeList,
    closed: bool,
}

impl AvlTree<DatabaseFile> {
    /// Create a new empty tree file at `path`, replacing any existing file.
    pub fn create(path: &Path, schema: Schema) -> Result<Self, StorageError> {
        let file = DatabaseFile::create(path)?;
        tracing::debug!("creating tree file {}", path.display());
        Self::create_in(file, schema)
    }

    /// Open an existing tree file at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = DatabaseFile::open(path)?;
        tracing::debug!("opening tree file {}", path.display());
        Self::open_in(file)
    }
}

impl<S: Storage> AvlTree<S> {
    /// Initialize an empty tree in fresh storage by writing its header.
    pub fn create_in(mut storage: S, schema: Schema) -> Result<Self, StorageError> {
        let header = Header::new(schema);
        header.write_to(&mut storage)?;

        Ok(Self {
            storage,
            schema: header.schema,
            root: NULL_ADDRESS,
            free_list: FreeList::new(NULL_ADDRESS),
            closed: false,
        })
    }

    /// Load a tree from storage that already holds a header.
    pub fn open_in(mut storage: S) -> Result<Self, StorageError> {
        let header = Header::read_from(&mut storage)?;
        tracing::debug!(
            root = header.root,
            free_list_head = header.free_list_head,
            "loaded tree header"
        );

        Ok(Self {
            storage,
            schema: header.schema,
            root: header.root,
            free_list: FreeList::new(header.free_list_head),
            closed: false,
        })
    }

    /// The field layout of this tree's records.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Address of the root record, or 0 if the tree is empty.
    #[must_use]
    pub const fn root_address(&self) -> Address {
        self.root
    }

    /// Address of the first released record, or 0.
    #[must_use]
    pub const fn free_list_head(&self) -> Address {
        self.free_list.head()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root == NULL_ADDRESS
    }

    /// Get a reference to the underlying storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Get mutable access to the underlying storage.
    pub const fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    // ========== Insert ==========

    /// Insert `key` with its fields.
    ///
    /// String fields are null-padded (or truncated) to their schema width.
    /// If `key` is already present nothing changes: the stored fields are
    /// kept and no record is rewritten.
    pub fn insert(&mut self, key: i32, strings: &[&str], ints: &[i32]) -> Result<(), StorageError> {
        if let Some(root) = self.insert_at(self.root, key, strings, ints)? {
            self.root = root;
        }
        Ok(())
    }

    /// Returns the new subtree root, or `None` if `key` was already present
    /// and nothing on the path was touched.
    fn insert_at(
        &mut self,
        addr: Address,
        key: i32,
        strings: &[&str],
        ints: &[i32],
    ) -> Result<Option<Address>, StorageError> {
        if addr == NULL_ADDRESS {
            let leaf = Record::leaf(key, strings, ints, &self.schema);
            let allocation = self.free_list.allocate(&mut self.storage)?;
            match allocation {
                Allocation::Reused(at) => {
                    tracing::trace!(key, at, "new record reuses a released slot");
                }
                Allocation::Appended(at) => {
                    tracing::trace!(key, at, "new record appended");
                }
            }
            let new_addr = allocation.address();
            self.write_record(new_addr, &leaf)?;
            return Ok(Some(new_addr));
        }

        let mut node = self.read_record(addr)?;
        let child = match key.cmp(&node.key) {
            Ordering::Less => &mut node.left,
            Ordering::Greater => &mut node.right,
            Ordering::Equal => return Ok(None),
        };
        let Some(new_child) = self.insert_at(*child, key, strings, ints)? else {
            return Ok(None);
        };
        *child = new_child;

        node.height = self.height(&node)?;
        self.write_record(addr, &node)?;
        self.balance(addr, &node).map(Some)
    }

    // ========== Remove ==========

    /// Remove `key` if present. Removing an absent key does nothing.
    pub fn remove(&mut self, key: i32) -> Result<(), StorageError> {
        self.root = self.remove_at(self.root, key)?;
        Ok(())
    }

    fn remove_at(&mut self, addr: Address, key: i32) -> Result<Address, StorageError> {
        if addr == NULL_ADDRESS {
            return Ok(NULL_ADDRESS);
        }

        let mut node = self.read_record(addr)?;
        match key.cmp(&node.key) {
            Ordering::Less => node.left = self.remove_at(node.left, key)?,
            Ordering::Greater => node.right = self.remove_at(node.right, key)?,
            Ordering::Equal => {
                if node.left == NULL_ADDRESS || node.right == NULL_ADDRESS {
                    // Zero or one child: splice the survivor into our slot.
                    let survivor = if node.left == NULL_ADDRESS {
                        node.right
                    } else {
                        node.left
                    };
                    self.free_list.release(&mut self.storage, addr)?;
                    return Ok(survivor);
                }
                node.left = self.replace_with_predecessor(node.left, &mut node)?;
            }
        }

        node.height = self.height(&node)?;
        self.write_record(addr, &node)?;
        self.balance(addr, &node)
    }

    /// Detach the rightmost node of the subtree at `addr`, moving its key and
    /// fields into `target`.
    ///
    /// Returns the new root of the subtree. Every node on the right spine is
    /// re-heighted and rebalanced on the way back up.
    fn replace_with_predecessor(
        &mut self,
        addr: Address,
        target: &mut Record,
    ) -> Result<Address, StorageError> {
        let mut node = self.read_record(addr)?;

        if node.right != NULL_ADDRESS {
            node.right = self.replace_with_predecessor(node.right, target)?;
            node.height = self.height(&node)?;
            self.write_record(addr, &node)?;
            return self.balance(addr, &node);
        }

        // A node with no right child has at most a leaf on its left, which
        // is already balanced.
        let survivor = node.left;
        target.take_payload(node);
        self.free_list.release(&mut self.storage, addr)?;
        Ok(survivor)
    }

    // ========== Heights and balancing ==========

    /// Stored height of the record at `addr`, or -1 for no node.
    fn child_height(&mut self, addr: Address) -> Result<i32, StorageError> {
        if addr == NULL_ADDRESS {
            return Ok(-1);
        }
        Ok(self.read_record(addr)?.height)
    }

    /// Height of `node` computed from its children's stored heights.
    fn height(&mut self, node: &Record) -> Result<i32, StorageError> {
        if node.is_leaf() {
            return Ok(0);
        }
        let left = self.child_height(node.left)?;
        let right = self.child_height(node.right)?;
        Ok(1 + left.max(right))
    }

    /// `height(left) - height(right)`, with a missing child counted as -1.
    fn balance_factor(&mut self, node: &Record) -> Result<i32, StorageError> {
        Ok(self.child_height(node.left)? - self.child_height(node.right)?)
    }

    fn balance_factor_at(&mut self, addr: Address) -> Result<i32, StorageError> {
        let node = self.read_record(addr)?;
        self.balance_factor(&node)
    }

    /// Restore the AVL invariant at `addr`, whose record is `node`.
    ///
    /// Returns the address of the subtree root after any rotation.
    fn balance(&mut self, addr: Address, node: &Record) -> Result<Address, StorageError> {
        let factor = self.balance_factor(node)?;

        if factor > 1 {
            // A left child that is itself balanced only arises after a
            // removal; a single rotation is the one that keeps it AVL.
            if self.balance_factor_at(node.left)? >= 0 {
                self.rotate_with_left_child(addr)
            } else {
                self.double_with_left_child(addr)
            }
        } else if factor < -1 {
            if self.balance_factor_at(node.right)? <= 0 {
                self.rotate_with_right_child(addr)
            } else {
                self.double_with_right_child(addr)
            }
        } else {
            Ok(addr)
        }
    }

    // ========== Rotations ==========

    /// Single rotation that lifts the left child of `addr`.
    fn rotate_with_left_child(&mut self, addr: Address) -> Result<Address, StorageError> {
        let mut node = self.read_record(addr)?;
        let pivot_addr = node.left;
        let mut pivot = self.read_record(pivot_addr)?;

        node.left = pivot.right;
        pivot.right = addr;

        node.height = self.height(&node)?;
        self.write_record(addr, &node)?;
        pivot.height = self.height(&pivot)?;
        self.write_record(pivot_addr, &pivot)?;

        tracing::trace!(pivot = pivot.key, below = node.key, "rotated with left child");
        Ok(pivot_addr)
    }

    /// Single rotation that lifts the right child of `addr`.
    fn rotate_with_right_child(&mut self, addr: Address) -> Result<Address, StorageError> {
        let mut node = self.read_record(addr)?;
        let pivot_addr = node.right;
        let mut pivot = self.read_record(pivot_addr)?;

        node.right = pivot.left;
        pivot.left = addr;

        node.height = self.height(&node)?;
        self.write_record(addr, &node)?;
        pivot.height = self.height(&pivot)?;
        self.write_record(pivot_addr, &pivot)?;

        tracing::trace!(pivot = pivot.key, below = node.key, "rotated with right child");
        Ok(pivot_addr)
    }

    /// Left-right case: rotate the left child leftward, then `addr` rightward.
    fn double_with_left_child(&mut self, addr: Address) -> Result<Address, StorageError> {
        let mut node = self.read_record(addr)?;
        node.left = self.rotate_with_right_child(node.left)?;
        node.height = self.height(&node)?;
        self.write_record(addr, &node)?;
        self.rotate_with_left_child(addr)
    }

    /// Right-left case: rotate the right child rightward, then `addr` leftward.
    fn double_with_right_child(&mut self, addr: Address) -> Result<Address, StorageError> {
        let mut node = self.read_record(addr)?;
        node.right = self.rotate_with_left_child(node.right)?;
        node.height = self.height(&node)?;
        self.write_record(addr, &node)?;
        self.rotate_with_right_child(addr)
    }

    // ========== Queries ==========

    /// Look up `key` and decode its fields.
    pub fn get(&mut self, key: i32) -> Result<Option<Entry>, StorageError> {
        let mut addr = self.root;

        while addr != NULL_ADDRESS {
            let node = self.read_record(addr)?;
            addr = match key.cmp(&node.key) {
                Ordering::Equal => return Ok(Some(Entry::from(node))),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }

        Ok(None)
    }

    /// The string fields stored under `key`, each cut at its first null.
    pub fn find_strings(&mut self, key: i32) -> Result<Option<Vec<String>>, StorageError> {
        Ok(self.get(key)?.map(|entry| entry.strings))
    }

    /// The int fields stored under `key`.
    pub fn find_ints(&mut self, key: i32) -> Result<Option<Vec<i32>>, StorageError> {
        Ok(self.get(key)?.map(|entry| entry.ints))
    }

    /// Raw records in ascending key order.
    pub fn records(&mut self) -> Traversal<'_, S> {
        Traversal {
            storage: &mut self.storage,
            schema: &self.schema,
            pending: Vec::new(),
            next: self.root,
            failed: false,
        }
    }

    /// Decoded entries in ascending key order.
    pub fn traverse(&mut self) -> impl Iterator<Item = Result<Entry, StorageError>> + '_ {
        self.records().map(|record| record.map(Entry::from))
    }

    /// Count the entries reachable from the root.
    pub fn count(&mut self) -> Result<usize, StorageError> {
        self.records().try_fold(0, |n, record| record.map(|_| n + 1))
    }

    // ========== Session ==========

    /// Persist the session root and free-list head to the header.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        Header::flush_addresses(&mut self.storage, self.root, self.free_list.head())?;
        tracing::debug!(
            root = self.root,
            free_list_head = self.free_list.head(),
            "flushed tree header"
        );
        Ok(())
    }

    /// Flush the header, sync, and release the storage.
    pub fn close(mut self) -> Result<(), StorageError> {
        self.flush()?;
        self.storage.sync()?;
        self.closed = true;
        tracing::debug!("closed tree");
        Ok(())
    }

    // ========== Record access ==========

    pub(crate) fn read_record(&mut self, addr: Address) -> Result<Record, StorageError> {
        Record::read(&mut self.storage, addr, &self.schema)
    }

    fn write_record(&mut self, addr: Address, record: &Record) -> Result<(), StorageError> {
        record.write(&mut self.storage, addr, &self.schema)
    }
}

impl<S: Storage> Drop for AvlTree<S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::warn!("tree dropped without close and header flush failed: {e}");
        }
    }
}

impl<S: Storage> std::fmt::Debug for AvlTree<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvlTree")
            .field("schema", &self.schema)
            .field("root", &self.root)
            .field("free_list_head", &self.free_list.head())
            .finish_non_exhaustive()
    }
}

/// In-order iterator over the records of a tree.
///
/// Lazily reads one record per step. After an error it yields nothing more.
pub struct Traversal<'a, S: Storage> {
    storage: &'a mut S,
    schema: &'a Schema,
    /// Nodes whose left subtree has been descended but which are not yet yielded.
    pending: Vec<Record>,
    next: Address,
    failed: bool,
}

impl<S: Storage> Iterator for Traversal<'_, S> {
    type Item = Result<Record, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        while self.next != NULL_ADDRESS {
            match Record::read(&mut *self.storage, self.next, self.schema) {
                Ok(node) => {
                    self.next = node.left;
                    self.pending.push(node);
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }

        let node = self.pending.pop()?;
        self.next = node.right;
        Some(Ok(node))
    }
}
