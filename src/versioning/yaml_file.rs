use super::{Coordinates, VersionedArtifact, VersioningError, VersioningScheme};
use crate::descriptor::YamlDescriptor;
use std::path::{Path, PathBuf};

/// YAML descriptor adapter (mta, custom `.yaml`/`.yml`).
#[derive(Debug)]
pub struct YamlFile {
    path: PathBuf,
    version_field: String,
    artifact_id_field: Option<String>,
    scheme: VersioningScheme,
    content: Option<YamlDescriptor>,
}

impl YamlFile {
    /// Adapter reading `version_field` from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, version_field: &str) -> Self {
        Self {
            path: path.into(),
            version_field: version_field.to_string(),
            artifact_id_field: None,
            scheme: VersioningScheme::Semver2,
            content: None,
        }
    }

    /// Field providing the artifact id, e.g. `ID` for MTA descriptors.
    #[must_use]
    pub fn with_artifact_id_field(mut self, field: &str) -> Self {
        self.artifact_id_field = Some(field.to_string());
        self
    }

    /// Overrides the versioning scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: VersioningScheme) -> Self {
        self.scheme = scheme;
        self
    }

    fn descriptor(&mut self) -> Result<&mut YamlDescriptor, VersioningError> {
        let content = match self.content.take() {
            Some(content) => content,
            None => YamlDescriptor::load(&self.path)?,
        };
        Ok(self.content.insert(content))
    }
}

impl VersionedArtifact for YamlFile {
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
        tracing::info!(path = %self.path.display(), version, "Updated YAML descriptor version");
        Ok(())
    }

    fn get_coordinates(&mut self) -> Result<Coordinates, VersioningError> {
        let version = self.get_version()?;
        let artifact_id = match self.artifact_id_field.clone() {
            Some(field) => self.descriptor()?.get(&field).unwrap_or_default(),
            None => String::new(),
        };
        Ok(Coordinates {
            artifact_id,
            version,
            ..Coordinates::default()
        })
    }

    fn descriptor_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
