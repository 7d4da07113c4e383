//! Local file store
//!
//! Reads and writes the byte blobs the pipeline stages exchange. All
//! content travels as `Vec<u8>`; nothing here interprets it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::FileError;

/// The four local paths one vault round trip touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSet {
    /// Source file to encrypt.
    pub plaintext: PathBuf,
    /// Where the ciphertext is staged before upload.
    pub encrypted: PathBuf,
    /// Where the downloaded blob lands.
    pub downloaded: PathBuf,
    /// Final decrypted output.
    pub decrypted: PathBuf,
}

impl PathSet {
    /// The default file names, rooted at `dir`.
    pub fn rooted(dir: &Path) -> Self {
        Self {
            plaintext: dir.join("plaintext.txt"),
            encrypted: dir.join("encrypted.bin"),
            downloaded: dir.join("downloaded.bin"),
            decrypted: dir.join("decrypted.txt"),
        }
    }
}

/// Read the full contents of a file.
///
/// A missing file is reported as [`FileError::NotFound`] so callers can
/// tell "nothing to do" from an actual read failure.
pub fn read(path: &Path) -> Result<Vec<u8>, FileError> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => FileError::NotFound {
            path: path.to_path_buf(),
        },
        _ => FileError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

/// Write bytes to a file, creating parent directories as needed and
/// truncating any existing content.
pub fn write(path: &Path, data: &[u8]) -> Result<(), FileError> {
    if let Some(parent) = path.parent() {
        // A bare file name has an empty parent; create_dir_all("") fails.
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| FileError::Write {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::write(path, data).map_err(|e| FileError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

/// True only if the path exists and is a regular file.
pub fn exists(path: &Path) -> bool {
    path.is_file()
}
