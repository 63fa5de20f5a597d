use std::fs;
use std::io;
use std::path::Path;

/// Named byte blobs a trained model is persisted as.
pub trait BlobStore: Send + Sync {
    fn write_blob(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn read_blob(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Stores blobs as plain files, creating parent directories on write.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsBlobStore;

impl BlobStore for FsBlobStore {
    fn write_blob(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)
    }

    fn read_blob(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_parents() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("blob.json");
        FsBlobStore.write_blob(&path, b"{}")?;
        assert_eq!(FsBlobStore.read_blob(&path)?, b"{}");
        Ok(())
    }

    #[test]
    fn test_read_missing_blob_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsBlobStore.read_blob(&dir.path().join("absent")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
