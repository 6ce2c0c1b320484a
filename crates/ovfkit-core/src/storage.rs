//! Filesystem access used by the OVF reader.
//!
//! Disk extraction needs to stat sibling disk images and the rewriter writes a
//! new descriptor. Both go through the [`Storage`] trait so callers can point
//! the reader at something other than the local filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Minimal filesystem interface over regular files.
pub trait Storage {
    /// Length in bytes of the file at `path`.
    fn file_len(&self, path: &Path) -> io::Result<u64>;

    /// Whether `path` exists and is a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Entries of the directory at `path`, in no particular order.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Read the whole file at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate `path` and write `contents` to it.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// [`Storage`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl Storage for LocalStorage {
    fn file_len(&self, path: &Path) -> io::Result<u64> {
        fs::metadata(path).map(|m| m.len())
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }
}

impl<S: Storage + ?Sized> Storage for &S {
    fn file_len(&self, path: &Path) -> io::Result<u64> {
        (**self).file_len(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        (**self).list_dir(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        (**self).write(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_storage_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("disk1.vmdk");
        LocalStorage.write(&path, b"0123456789").unwrap();

        assert!(LocalStorage.is_file(&path));
        assert!(!LocalStorage.is_file(dir.path()));
        assert_eq!(LocalStorage.file_len(&path).unwrap(), 10);
        assert_eq!(LocalStorage.read(&path).unwrap(), b"0123456789");
        assert_eq!(LocalStorage.list_dir(dir.path()).unwrap(), vec![path]);
    }

    #[test]
    fn test_local_storage_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.vmdk");
        assert!(!LocalStorage.is_file(&path));
        assert!(LocalStorage.file_len(&path).is_err());
    }
}
