use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// An owned, immutable shared-object image held in memory.
///
/// How the bytes get here is up to the caller: a file, a network response,
/// an archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImage {
    bytes: Vec<u8>,
}

impl ModuleImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Read a whole file into memory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| Error::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("read {} bytes from {}", bytes.len(), path.display());
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for ModuleImage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for ModuleImage {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_file_contents() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\x7fELF not really").unwrap();

        let image = ModuleImage::from_file(file.path()).unwrap();
        assert_eq!(image.as_bytes(), b"\x7fELF not really");
        assert_eq!(image.len(), 15);
        assert!(!image.is_empty());
    }

    #[test]
    fn missing_file_is_an_image_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModuleImage::from_file(dir.path().join("absent.so")).unwrap_err();
        assert!(matches!(err, Error::ImageRead { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}
