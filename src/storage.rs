use std::path::{Path, PathBuf};

use crate::eid::Eid;

/// Flat file store rooted at a single directory.
pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
    fn delete(&self, ident: &str) -> std::io::Result<()>;
}

#[derive(Clone, Debug)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&path)?;
        Ok(BackendLocal { base_dir: path })
    }

    pub fn path(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.path(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path(ident))
    }

    /// Writes through a temp file and renames it over the target, so readers
    /// never see a half-written file.
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let temp_path = self.path(&format!("{}-{ident}", Eid::new()));

        std::fs::write(&temp_path, data)?;

        std::fs::rename(&temp_path, self.path(ident))
    }

    fn delete(&self, ident: &str) -> std::io::Result<()> {
        std::fs::remove_file(self.path(ident))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(tmp.path().join("nested")).unwrap();

        assert!(!store.exists("a.txt"));
        store.write("a.txt", b"hello").unwrap();
        assert!(store.exists("a.txt"));
        assert_eq!(store.read("a.txt").unwrap(), b"hello");

        store.write("a.txt", b"bye").unwrap();
        assert_eq!(store.read("a.txt").unwrap(), b"bye");

        store.delete("a.txt").unwrap();
        assert!(!store.exists("a.txt"));

        // no temp files are left behind
        assert_eq!(std::fs::read_dir(&store.base_dir).unwrap().count(), 0);
    }
}
