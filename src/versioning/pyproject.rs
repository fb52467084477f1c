use super::{Coordinates, VersionedArtifact, VersioningError, VersioningScheme};
use crate::descriptor::PyProject;
use std::path::{Path, PathBuf};

/// `pyproject.toml` adapter.
#[derive(Debug)]
pub struct Toml {
    path: PathBuf,
    content: Option<PyProject>,
}

impl Toml {
    /// Adapter for the `pyproject.toml` at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content: None,
        }
    }

    fn descriptor(&mut self) -> Result<&mut PyProject, VersioningError> {
        let content = match self.content.take() {
            Some(content) => content,
            None => PyProject::load(&self.path)?,
        };
        Ok(self.content.insert(content))
    }
}

impl VersionedArtifact for Toml {
    fn versioning_scheme(&self) -> VersioningScheme {
        VersioningScheme::Pep440
    }

    fn get_version(&mut self) -> Result<String, VersioningError> {
        Ok(self.descriptor()?.version().to_string())
    }

    fn set_version(&mut self, version: &str) -> Result<(), VersioningError> {
        self.descriptor()?.set_version(version)
    }

    fn get_coordinates(&mut self) -> Result<Coordinates, VersioningError> {
        let project = self.descriptor()?;
        Ok(Coordinates {
            artifact_id: project.name().to_string(),
            version: project.version().to_string(),
            ..Coordinates::default()
        })
    }

    fn descriptor_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
