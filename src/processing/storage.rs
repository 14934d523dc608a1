// Request-scoped temporary storage for the uploaded image.
// The file lives exactly as long as its StoredImage; every stage reads it by path.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::utils::IdCardError;

/// Uploaded bytes materialized on disk for the duration of one request.
#[derive(Debug)]
pub struct StoredImage {
    file: NamedTempFile,
    len: usize,
}

pub struct ImageStore;

impl ImageStore {
    /// Persist the bytes to a fresh temporary file.
    pub fn store(bytes: &[u8]) -> Result<StoredImage, IdCardError> {
        let mut file = tempfile::Builder::new()
            .prefix("idcard-")
            .tempfile()
            .map_err(|e| IdCardError::StorageError(format!("Failed to create temp file: {}", e)))?;

        file.write_all(bytes)
            .map_err(|e| IdCardError::StorageError(format!("Failed to write temp file: {}", e)))?;
        file.flush()
            .map_err(|e| IdCardError::StorageError(format!("Failed to flush temp file: {}", e)))?;

        log::debug!("Stored {} upload bytes at {:?}", bytes.len(), file.path());

        Ok(StoredImage {
            file,
            len: bytes.len(),
        })
    }

    /// Delete the backing file now. Dropping the handle has the same effect.
    pub fn release(image: StoredImage) -> Result<(), IdCardError> {
        let path = image.path().to_path_buf();
        image
            .file
            .close()
            .map_err(|e| IdCardError::StorageError(format!("Failed to remove {:?}: {}", path, e)))
    }
}

impl StoredImage {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_store_and_release() {
        let stored = ImageStore::store(b"not really an image").unwrap();
        let path = stored.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(stored.len(), 19);
        assert_eq!(std::fs::read(&path).unwrap(), b"not really an image");

        ImageStore::release(stored).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_file() {
        let path = {
            let stored = ImageStore::store(&[1, 2, 3]).unwrap();
            stored.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_shared_readers_keep_file_until_last_drop() {
        let stored = Arc::new(ImageStore::store(&[9; 16]).unwrap());
        let path = stored.path().to_path_buf();

        let reader = Arc::clone(&stored);
        drop(stored);
        assert_eq!(std::fs::read(reader.path()).unwrap().len(), 16);

        drop(reader);
        assert!(!path.exists());
    }
}
