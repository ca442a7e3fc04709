//! Filesystem storage for submitted document bytes.
//!
//! Documents are only ever written by the ingest path and deleted by the
//! sweeper (or an explicit administrative delete). The returned path is
//! the job record's `storage_ref` and must survive process restarts.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Path-addressed document storage rooted at a single directory.
#[derive(Debug, Clone)]
pub struct DocumentStorage {
    root: PathBuf,
}

impl DocumentStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persists document bytes under the storage root and returns the
    /// resulting path. The filename is reduced to its final component
    /// before use, so a submitted name can never escape the root.
    ///
    /// Name collisions are resolved with numbered variants, created with
    /// `O_CREAT | O_EXCL` so two concurrent submissions of the same name
    /// cannot clobber each other.
    pub fn store(&self, content: &[u8], filename: &str) -> Result<PathBuf, StorageError> {
        let safe_name = sanitize_filename(filename)
            .ok_or_else(|| StorageError::InvalidFilename(filename.to_string()))?;

        self.ensure_root()?;

        let (base, ext) = match safe_name.rfind('.') {
            Some(dot) if dot > 0 => (&safe_name[..dot], Some(&safe_name[dot..])),
            _ => (safe_name.as_str(), None),
        };

        // Try the original name first, then numbered variants.
        for counter in 1..=1000 {
            let candidate = if counter == 1 {
                safe_name.clone()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };

            let path = self.root.join(&candidate);
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    file.write_all(content).map_err(|e| StorageError::WriteFile {
                        path: path.clone(),
                        source: e,
                    })?;
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile { path, source: e });
                }
            }
        }

        Err(StorageError::NoAvailableName(self.root.join(safe_name)))
    }

    /// Deletes the bytes behind a storage reference. Returns `Ok(false)`
    /// when the file is already gone — a previous partial sweep may have
    /// removed the bytes but not the record, and retries must succeed.
    pub fn delete(&self, storage_ref: &Path) -> Result<bool, StorageError> {
        match std::fs::remove_file(storage_ref) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFile {
                path: storage_ref.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Returns whether a storage reference still resolves to bytes.
    pub fn exists(&self, storage_ref: &Path) -> bool {
        storage_ref.exists()
    }

    fn ensure_root(&self) -> Result<(), StorageError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| StorageError::CreateDirectory {
                path: self.root.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// Reduces a submitted filename to its final path component and rejects
/// names that would resolve to nothing (empty, `.`, `..`, bare separators).
fn sanitize_filename(filename: &str) -> Option<String> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_and_read_back() {
        let dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(dir.path());

        let path = storage.store(b"%PDF-1.4 content", "report.pdf").unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 content");
    }

    #[test]
    fn test_store_creates_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("documents");
        let storage = DocumentStorage::new(&root);

        let path = storage.store(b"x", "a.pdf").unwrap();
        assert!(root.exists());
        assert!(path.starts_with(&root));
    }

    #[test]
    fn test_store_conflict_numbering() {
        let dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(dir.path());

        let p1 = storage.store(b"first", "doc.pdf").unwrap();
        let p2 = storage.store(b"second", "doc.pdf").unwrap();
        let p3 = storage.store(b"third", "doc.pdf").unwrap();

        assert!(p1.ends_with("doc.pdf"));
        assert!(p2.ends_with("doc_2.pdf"));
        assert!(p3.ends_with("doc_3.pdf"));
        assert_eq!(std::fs::read(&p2).unwrap(), b"second");
    }

    #[test]
    fn test_store_strips_directory_components() {
        let dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(dir.path());

        let path = storage.store(b"x", "../../etc/passwd.pdf").unwrap();
        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(path.ends_with("passwd.pdf"));
    }

    #[test]
    fn test_store_rejects_empty_name() {
        let dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(dir.path());

        assert!(matches!(
            storage.store(b"x", ""),
            Err(StorageError::InvalidFilename(_))
        ));
        assert!(matches!(
            storage.store(b"x", ".."),
            Err(StorageError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(dir.path());

        let path = storage.store(b"x", "gone.pdf").unwrap();
        assert!(storage.delete(&path).unwrap());
        assert!(!path.exists());
        // Already gone is success, not an error.
        assert!(!storage.delete(&path).unwrap());
    }

    #[test]
    fn test_exists() {
        let dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(dir.path());

        let path = storage.store(b"x", "here.pdf").unwrap();
        assert!(storage.exists(&path));
        storage.delete(&path).unwrap();
        assert!(!storage.exists(&path));
    }
}
