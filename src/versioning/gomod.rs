use super::{Coordinates, UNSPECIFIED_VERSION, VersionedArtifact, VersioningError, VersioningScheme};
use crate::descriptor::{GoModFile, VersionFile};
use std::path::{Path, PathBuf};

const SIDECARS: [&str; 2] = ["VERSION", "version.txt"];

/// Go module adapter.
///
/// Go modules carry no version in `go.mod`; the version lives in a `VERSION`
/// or `version.txt` next to it. Writes go to that file, never to `go.mod`.
#[derive(Debug)]
pub struct GoMod {
    path: PathBuf,
    modfile: Option<GoModFile>,
    version: Option<String>,
}

impl GoMod {
    /// Adapter for the `go.mod` at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            modfile: None,
            version: None,
        }
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    fn sidecar(&self) -> Option<VersionFile> {
        SIDECARS
            .iter()
            .map(|name| self.dir().join(name))
            .find(|p| p.is_file())
            .map(VersionFile::new)
    }

    fn modfile(&mut self) -> Result<&GoModFile, VersioningError> {
        let modfile = match self.modfile.take() {
            Some(modfile) => modfile,
            None => GoModFile::load(&self.path)?,
        };
        Ok(&*self.modfile.insert(modfile))
    }
}

impl VersionedArtifact for GoMod {
    fn versioning_scheme(&self) -> VersioningScheme {
        VersioningScheme::Semver2
    }

    /// `VERSION` > `version.txt` > modfile > `unspecified`
    fn get_version(&mut self) -> Result<String, VersioningError> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }
        let version = match self.sidecar() {
            Some(file) => file.read()?,
            None => {
                // the modfile must still parse for the fallback to apply
                self.modfile()?;
                tracing::debug!(path = %self.path.display(), "No version file next to go.mod");
                UNSPECIFIED_VERSION.to_string()
            }
        };
        self.version = Some(version.clone());
        Ok(version)
    }

    fn set_version(&mut self, version: &str) -> Result<(), VersioningError> {
        let file = self
            .sidecar()
            .unwrap_or_else(|| VersionFile::new(self.dir().join(SIDECARS[0])));
        file.write(version)?;
        tracing::info!(path = %file.path().display(), version, "Updated Go module version file");
        self.version = Some(version.to_string());
        Ok(())
    }

    fn get_coordinates(&mut self) -> Result<Coordinates, VersioningError> {
        let (group_id, artifact_id) = self.modfile()?.split_module();
        Ok(Coordinates {
            group_id,
            artifact_id,
            version: self.get_version()?,
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
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn module(extra: &[(&str, &str)]) -> (TempDir, GoMod) {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("go.mod"),
            "module github.com/SAP/jenkins-library\n\ngo 1.22\n",
        )
        .unwrap();
        for (name, content) in extra {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        let go = GoMod::new(dir.path().join("go.mod"));
        (dir, go)
    }

    #[test]
    fn test_unspecified_without_version_file() {
        let (_dir, mut go) = module(&[]);
        assert_eq!(
            go.get_coordinates().unwrap(),
            Coordinates {
                group_id: "github.com/SAP".into(),
                artifact_id: "jenkins-library".into(),
                version: "unspecified".into(),
                packaging: String::new(),
            }
        );
    }

    #[test]
    fn test_version_file_precedence() {
        let (_dir, mut go) = module(&[("VERSION", "2.0.0"), ("version.txt", "1.0.0")]);
        assert_eq!(go.get_version().unwrap(), "2.0.0");

        let (_dir, mut go) = module(&[("version.txt", "1.0.0")]);
        assert_eq!(go.get_version().unwrap(), "1.0.0");
    }

    #[test]
    fn test_set_version_leaves_modfile_alone() {
        let (dir, mut go) = module(&[]);
        go.set_version("1.4.0").unwrap();

        assert_eq!(go.get_version().unwrap(), "1.4.0");
        assert_eq!(std::fs::read_to_string(dir.path().join("VERSION")).unwrap(), "1.4.0");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("go.mod")).unwrap(),
            "module github.com/SAP/jenkins-library\n\ngo 1.22\n"
        );
    }

    #[test]
    fn test_set_version_updates_existing_sidecar() {
        let (dir, mut go) = module(&[("version.txt", "1.0.0")]);
        go.set_version("1.1.0").unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("version.txt")).unwrap(), "1.1.0");
        assert!(!dir.path().join("VERSION").exists());
    }
}
