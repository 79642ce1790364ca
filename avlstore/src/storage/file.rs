//! Tree file I/O operations.
//!
//! This module handles positioned reads and writes against the single file
//! that backs a tree. Every call is a direct seek plus read or write; there
//! is no buffering layer between the tree engine and the file.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::storage::io::{Storage, StorageError};

/// A tree file handle with low-level positioned I/O.
pub struct DatabaseFile {
    file: File,
    path: PathBuf,
}

impl DatabaseFile {
    /// Create a new, empty tree file at the given path.
    ///
    /// Any existing file at `path` is deleted first.
    pub fn create(path: &Path) -> Result<Self, StorageError> {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!("replaced existing file {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::Io(e)),
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing tree file.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path this file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for DatabaseFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseFile")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Storage for DatabaseFile {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), StorageError> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<(), StorageError> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    fn end_offset(&self) -> Result<u64, StorageError> {
        Ok(self.file.metadata()?.len())
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        self.file.sync_all().map_err(StorageError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_create_and_open() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.avl");

        {
            let mut db = DatabaseFile::create(&path).expect("create file");
            assert_eq!(db.end_offset().expect("len"), 0);
            db.write_at(0, b"header").expect("write");
            db.sync().expect("sync");
        }

        {
            let mut db = DatabaseFile::open(&path).expect("open file");
            assert_eq!(db.end_offset().expect("len"), 6);
            let mut buf = [0u8; 6];
            db.read_at(0, &mut buf).expect("read");
            assert_eq!(&buf, b"header");
        }
    }

    #[test]
    fn test_create_replaces_existing_file() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.avl");

        fs::write(&path, b"existing contents").expect("write file");

        let db = DatabaseFile::create(&path).expect("create file");
        assert_eq!(db.end_offset().expect("len"), 0);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("missing.avl");

        let result = DatabaseFile::open(&path);
        assert!(matches!(result, Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound));
    }

    #[test]
    fn test_read_past_end() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.avl");

        let mut db = DatabaseFile::create(&path).expect("create file");
        db.write_at(0, &[1, 2, 3, 4]).expect("write");

        let mut buf = [0u8; 8];
        let result = db.read_at(0, &mut buf);
        assert!(result.expect_err("short read").is_unexpected_eof());
    }

    #[test]
    fn test_write_past_end_extends_file() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.avl");

        let mut db = DatabaseFile::create(&path).expect("create file");
        db.write_at(0, &[0u8; 16]).expect("write");
        db.write_u64_at(16, 0xDEAD_BEEF_CAFE_BABE).expect("append");

        assert_eq!(db.end_offset().expect("len"), 24);
        assert_eq!(db.read_u64_at(16).expect("read"), 0xDEAD_BEEF_CAFE_BABE);
    }
}
