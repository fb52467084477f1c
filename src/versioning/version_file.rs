use super::{VersionedArtifact, VersioningError, VersioningScheme};
use crate::descriptor::VersionFile;
use std::path::{Path, PathBuf};

/// Adapter over a bare `VERSION`/`version.txt` file.
#[derive(Debug)]
pub struct VersionFileArtifact {
    file: VersionFile,
    scheme: VersioningScheme,
    version: Option<String>,
}

impl VersionFileArtifact {
    /// Adapter for the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, scheme: VersioningScheme) -> Self {
        Self {
            file: VersionFile::new(path),
            scheme,
            version: None,
        }
    }
}

impl VersionedArtifact for VersionFileArtifact {
    fn versioning_scheme(&self) -> VersioningScheme {
        self.scheme
    }

    fn get_version(&mut self) -> Result<String, VersioningError> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }
        let version = self.file.read()?;
        self.version = Some(version.clone());
        Ok(version)
    }

    fn set_version(&mut self, version: &str) -> Result<(), VersioningError> {
        self.file.write(version)?;
        tracing::info!(path = %self.file.path().display(), version, "Updated version file");
        self.version = Some(version.to_string());
        Ok(())
    }

    fn descriptor_path(&self) -> Option<&Path> {
        Some(self.file.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("VERSION");

        let mut artifact = VersionFileArtifact::new(&path, VersioningScheme::Semver2);
        assert!(matches!(
            artifact.get_version(),
            Err(VersioningError::FileNotFound { .. })
        ));
        artifact.set_version("3.0.0").unwrap();
        assert_eq!(artifact.get_version().unwrap(), "3.0.0");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "3.0.0");
    }
}
