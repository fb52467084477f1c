//! Bare version file codec (`VERSION`, `version.txt`)

use super::{read_to_string, write};
use crate::versioning::VersioningError;
use std::path::{Path, PathBuf};

/// A file whose trimmed content is the version.
#[derive(Debug, Clone)]
pub struct VersionFile {
    path: PathBuf,
}

impl VersionFile {
    /// Creates a handle; nothing is read until [`VersionFile::read`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and trims the file content.
    pub fn read(&self) -> Result<String, VersioningError> {
        Ok(read_to_string(&self.path)?.trim().to_string())
    }

    /// Truncates the file and writes the version.
    pub fn write(&self, version: &str) -> Result<(), VersioningError> {
        write(&self.path, version)
    }
}
