use super::{Coordinates, VersionedArtifact, VersioningError, VersioningScheme};
use crate::descriptor::JsonDescriptor;
use std::path::{Path, PathBuf};

/// JSON descriptor adapter (npm, yarn, dub, sbt, custom `.json`).
#[derive(Debug)]
pub struct JsonFile {
    path: PathBuf,
    version_field: String,
    scheme: VersioningScheme,
    content: Option<JsonDescriptor>,
}

impl JsonFile {
    /// Adapter reading `version_field` from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, version_field: &str) -> Self {
        Self {
            path: path.into(),
            version_field: version_field.to_string(),
            scheme: VersioningScheme::Semver2,
            content: None,
        }
    }

    /// Overrides the versioning scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: VersioningScheme) -> Self {
        self.scheme = scheme;
        self
    }

    fn descriptor(&mut self) -> Result<&mut JsonDescriptor, VersioningError> {
        let content = match self.content.take() {
            Some(content) => content,
            None => JsonDescriptor::load(&self.path)?,
        };
        Ok(self.content.insert(content))
    }
}

impl VersionedArtifact for JsonFile {
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
        tracing::info!(path = %self.path.display(), version, "Updated JSON descriptor version");
        Ok(())
    }

    /// `name` is the artifact; a scoped npm name `@scope/pkg` splits into group and artifact.
    fn get_coordinates(&mut self) -> Result<Coordinates, VersioningError> {
        let version = self.get_version()?;
        let name = self.descriptor()?.get("name").unwrap_or_default();
        let (group_id, artifact_id) = match name.strip_prefix('@').and_then(|n| n.split_once('/')) {
            Some((scope, package)) => (format!("@{scope}"), package.to_string()),
            None => (String::new(), name),
        };
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
