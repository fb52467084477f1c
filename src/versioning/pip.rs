use super::{Coordinates, VersionedArtifact, VersioningError, VersioningScheme};
use crate::descriptor::{self, VersionFile};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)(.*)name=['"](.*?)['"](.*)"#).unwrap());
static VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)(.*)version=['"](.*?)['"](.*)"#).unwrap());
static METHOD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)(.*)\(\)").unwrap());

const SIDECARS: [&str; 2] = ["version.txt", "VERSION"];

/// Python `setup.py` adapter.
///
/// A `version.txt` or `VERSION` next to `setup.py` takes precedence for both
/// reading and writing. The descriptor may also be one of those files.
#[derive(Debug)]
pub struct Pip {
    path: PathBuf,
    setup_py: Option<String>,
    version: Option<String>,
}

impl Pip {
    /// Adapter for `setup.py`, `version.txt` or `VERSION` at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            setup_py: None,
            version: None,
        }
    }

    fn is_setup_py(&self) -> bool {
        self.path.file_name().and_then(|n| n.to_str()) == Some("setup.py")
    }

    /// Version file in charge of the version, if any.
    fn version_file(&self) -> Option<VersionFile> {
        if !self.is_setup_py() {
            return Some(VersionFile::new(&self.path));
        }
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        SIDECARS
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
            .map(VersionFile::new)
    }

    fn setup_py(&mut self) -> Result<&str, VersioningError> {
        let content = match self.setup_py.take() {
            Some(content) => content,
            None => descriptor::read_to_string(&self.path)?,
        };
        Ok(self.setup_py.insert(content).as_str())
    }

    fn capture(regex: &Regex, content: &str) -> Option<String> {
        regex
            .captures(content)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().to_string())
    }
}

impl VersionedArtifact for Pip {
    fn versioning_scheme(&self) -> VersioningScheme {
        VersioningScheme::Pep440
    }

    fn get_version(&mut self) -> Result<String, VersioningError> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }
        let version = match self.version_file() {
            Some(file) => file.read()?,
            None => {
                let path = self.path.clone();
                let content = self.setup_py()?;
                Self::capture(&VERSION, content)
                    .filter(|v| !v.is_empty() && !METHOD.is_match(v))
                    .ok_or_else(|| VersioningError::field_not_found(path, "version"))?
            }
        };
        self.version = Some(version.clone());
        Ok(version)
    }

    fn set_version(&mut self, version: &str) -> Result<(), VersioningError> {
        if let Some(file) = self.version_file() {
            file.write(version)?;
        } else {
            let current = self.get_version()?;
            let path = self.path.clone();
            let content = self.setup_py()?.to_string();
            let updated = ['"', '\'']
                .iter()
                .find_map(|quote| {
                    let old = format!("version={quote}{current}{quote}");
                    let new = format!("version={quote}{version}{quote}");
                    content.contains(&old).then(|| content.replace(&old, &new))
                })
                .ok_or_else(|| VersioningError::field_not_found(&path, "version"))?;
            descriptor::write(&path, &updated)?;
            self.setup_py = Some(updated);
        }
        tracing::info!(path = %self.path.display(), version, "Updated pip version");
        self.version = Some(version.to_string());
        Ok(())
    }

    fn get_coordinates(&mut self) -> Result<Coordinates, VersioningError> {
        let artifact_id = if self.is_setup_py() {
            Self::capture(&NAME, self.setup_py()?).unwrap_or_default()
        } else {
            String::new()
        };
        Ok(Coordinates {
            artifact_id,
            version: self.get_version()?,
            ..Coordinates::default()
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

    fn setup(files: &[(&str, &str)]) -> (TempDir, Pip) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        let pip = Pip::new(dir.path().join("setup.py"));
        (dir, pip)
    }

    #[test]
    fn test_version_from_setup_py() {
        let (_dir, mut pip) = setup(&[("setup.py", r#"setup(name="simple-python",version="1.2.3""#)]);
        assert_eq!(pip.get_version().unwrap(), "1.2.3");
        assert_eq!(pip.versioning_scheme(), VersioningScheme::Pep440);
    }

    #[test]
    fn test_sidecar_wins() {
        let (_dir, mut pip) = setup(&[
            ("setup.py", r#"setup(name="simple-python",version="1.2.3""#),
            ("version.txt", "1.2.4"),
        ]);
        assert_eq!(pip.get_version().unwrap(), "1.2.4");

        let (_dir, mut pip) = setup(&[
            ("setup.py", r#"setup(name="simple-python",version="1.2.3""#),
            ("VERSION", "1.2.5"),
        ]);
        assert_eq!(pip.get_version().unwrap(), "1.2.5");
    }

    #[test]
    fn test_set_version_in_setup_py() {
        let (dir, mut pip) = setup(&[("setup.py", r#"setup(name="simple-python",version="1.2.3""#)]);
        pip.set_version("2.0.0").unwrap();
        let content = std::fs::read_to_string(dir.path().join("setup.py")).unwrap();
        assert!(content.contains(r#"version="2.0.0""#));
        assert_eq!(pip.get_version().unwrap(), "2.0.0");
    }

    #[test]
    fn test_set_version_in_sidecar() {
        let (dir, mut pip) = setup(&[
            ("setup.py", r#"setup(name="simple-python",version="1.2.3""#),
            ("version.txt", "1.2.3"),
        ]);
        pip.set_version("2.0.0").unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("version.txt")).unwrap(), "2.0.0");
    }

    #[test]
    fn test_coordinates() {
        let (_dir, mut pip) = setup(&[("setup.py", r#"setup(name="simple-python",version="1.2.3""#)]);
        let coordinates = pip.get_coordinates().unwrap();
        assert_eq!(coordinates.artifact_id, "simple-python");
        assert_eq!(coordinates.version, "1.2.3");

        let (_dir, mut pip) = setup(&[("setup.py", r#"setup(version="1.2.3""#)]);
        assert_eq!(pip.get_coordinates().unwrap().artifact_id, "");
    }

    #[test]
    fn test_missing_version() {
        let (_dir, mut pip) = setup(&[("setup.py", "setup(name=\"x\", version=get_version())")]);
        let err = pip.get_version().unwrap_err();
        assert!(matches!(err, VersioningError::FieldNotFound { .. }));

        let (_dir, mut pip) = setup(&[]);
        assert!(pip.get_version().unwrap_err().to_string().contains("failed to read file"));
    }
}
