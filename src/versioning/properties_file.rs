use super::{Coordinates, VersionedArtifact, VersioningError, VersioningScheme};
use crate::descriptor::PropertiesDescriptor;
use std::path::{Path, PathBuf};

/// Java properties adapter (`gradle.properties`, custom `.properties`).
#[derive(Debug)]
pub struct PropertiesFile {
    path: PathBuf,
    version_field: String,
    scheme: VersioningScheme,
    gradle: bool,
    content: Option<PropertiesDescriptor>,
}

impl PropertiesFile {
    /// Generic properties adapter.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, field: &str, scheme: VersioningScheme) -> Self {
        Self {
            path: path.into(),
            version_field: if field.is_empty() { "version" } else { field }.to_string(),
            scheme,
            gradle: false,
            content: None,
        }
    }

    /// Gradle adapter; coordinates come from `group` and `rootProject.name`.
    #[must_use]
    pub fn gradle(path: impl Into<PathBuf>, field: &str) -> Self {
        Self {
            gradle: true,
            ..Self::new(path, field, VersioningScheme::Semver2)
        }
    }

    fn descriptor(&mut self) -> Result<&mut PropertiesDescriptor, VersioningError> {
        let content = match self.content.take() {
            Some(content) => content,
            None => PropertiesDescriptor::load(&self.path)?,
        };
        Ok(self.content.insert(content))
    }
}

impl VersionedArtifact for PropertiesFile {
    fn versioning_scheme(&self) -> VersioningScheme {
        self.scheme
    }

    fn get_version(&mut self) -> Result<String, VersioningError> {
        let field = self.version_field.clone();
        let path = self.path.clone();
        self.descriptor()?
            .get(&field)
            .ok_or_else(|| VersioningError::field_not_found(path, &field))
    }

    fn set_version(&mut self, version: &str) -> Result<(), VersioningError> {
        let field = self.version_field.clone();
        let descriptor = self.descriptor()?;
        descriptor.set(&field, version);
        descriptor.save()?;
        tracing::info!(path = %self.path.display(), version, "Updated properties version");
        Ok(())
    }

    fn get_coordinates(&mut self) -> Result<Coordinates, VersioningError> {
        let version = self.get_version()?;
        if !self.gradle {
            return Ok(Coordinates::with_version(version));
        }
        let descriptor = self.descriptor()?;
        let group_id = descriptor.get("group").unwrap_or_default();
        let artifact_id = descriptor
            .get("rootProject.name")
            .or_else(|| descriptor.get("name"))
            .unwrap_or_default();
        Ok(Coordinates {
            group_id,
            artifact_id,
            version,
            packaging: String::new(),
        })
    }

    fn descriptor_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_gradle_coordinates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gradle.properties");
        std::fs::write(&path, "group=com.example\nrootProject.name=service\nversion=0.9.0\n").unwrap();

        let mut gradle = PropertiesFile::gradle(&path, "version");
        let coordinates = gradle.get_coordinates().unwrap();
        assert_eq!(coordinates.group_id, "com.example");
        assert_eq!(coordinates.artifact_id, "service");
        assert_eq!(coordinates.version, "0.9.0");
    }

    #[test]
    fn test_custom_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.properties");
        std::fs::write(&path, "app.version=1\n").unwrap();

        let mut props = PropertiesFile::new(&path, "app.version", VersioningScheme::Maven);
        props.set_version("2").unwrap();
        assert_eq!(props.get_version().unwrap(), "2");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "app.version=2\n");
        assert_eq!(props.get_coordinates().unwrap(), Coordinates::with_version("2"));
    }
}
