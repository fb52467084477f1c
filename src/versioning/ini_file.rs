use super::{VersionedArtifact, VersioningError, VersioningScheme};
use crate::descriptor::IniDescriptor;
use std::path::{Path, PathBuf};

/// INI descriptor adapter (`.cfg`, `.ini`).
#[derive(Debug)]
pub struct IniFile {
    path: PathBuf,
    version_field: String,
    version_section: String,
    scheme: VersioningScheme,
    content: Option<IniDescriptor>,
}

impl IniFile {
    /// Adapter for `field` inside `section`; an empty section is the default one.
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        field: &str,
        section: &str,
        scheme: VersioningScheme,
    ) -> Self {
        Self {
            path: path.into(),
            version_field: if field.is_empty() { "version" } else { field }.to_string(),
            version_section: section.to_string(),
            scheme,
            content: None,
        }
    }

    fn descriptor(&mut self) -> Result<&mut IniDescriptor, VersioningError> {
        let content = match self.content.take() {
            Some(content) => content,
            None => IniDescriptor::load(&self.path)?,
        };
        Ok(self.content.insert(content))
    }
}

impl VersionedArtifact for IniFile {
    fn versioning_scheme(&self) -> VersioningScheme {
        self.scheme
    }

    fn get_version(&mut self) -> Result<String, VersioningError> {
        let (section, field) = (self.version_section.clone(), self.version_field.clone());
        let path = self.path.clone();
        self.descriptor()?
            .get(&section, &field)
            .ok_or_else(|| VersioningError::field_not_found(path, &field))
    }

    fn set_version(&mut self, version: &str) -> Result<(), VersioningError> {
        let (section, field) = (self.version_section.clone(), self.version_field.clone());
        let descriptor = self.descriptor()?;
        descriptor.set(&section, &field, version);
        descriptor.save()?;
        tracing::info!(path = %self.path.display(), section = %section, version, "Updated INI version");
        Ok(())
    }

    fn descriptor_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
