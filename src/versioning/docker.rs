use super::{
    BuildTool, Coordinates, MavenRunner, Options, VersionedArtifact, VersioningError,
    VersioningScheme, get_artifact_with_runner,
};
use crate::descriptor::{Dockerfile, VersionFile};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FROM_SOURCE: &str = "FROM";
const VERSION_FILE: &str = "VERSION";

/// Docker image adapter.
///
/// `versionSource` selects where the version comes from:
///
/// * `FROM`: the tag of the first base image
/// * a build tool name (`maven`, `npm`, ...): that tool's adapter at the descriptor path
/// * empty: the `VERSION` file next to the descriptor
/// * anything else: the `ENV` instruction of that name
///
/// Writing always produces a `VERSION` file next to the descriptor, after the
/// delegate (if any) has been updated.
#[derive(Debug)]
pub struct Docker {
    path: PathBuf,
    options: Options,
    scheme: VersioningScheme,
    runner: Arc<dyn MavenRunner>,
    dockerfile: Option<Dockerfile>,
    delegate: Option<Box<dyn VersionedArtifact>>,
    version: Option<String>,
}

impl Docker {
    /// Adapter for the descriptor at `path`; nothing is read yet.
    pub fn new(
        path: PathBuf,
        options: Options,
        runner: Arc<dyn MavenRunner>,
    ) -> Result<Self, VersioningError> {
        let scheme =
            VersioningScheme::or_default(&options.versioning_scheme, VersioningScheme::Docker)?;
        Ok(Self {
            path,
            options,
            scheme,
            runner,
            dockerfile: None,
            delegate: None,
            version: None,
        })
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    fn version_file(&self) -> VersionFile {
        VersionFile::new(self.dir().join(VERSION_FILE))
    }

    fn dockerfile(&mut self) -> Result<&Dockerfile, VersioningError> {
        let dockerfile = match self.dockerfile.take() {
            Some(dockerfile) => dockerfile,
            None => Dockerfile::load(&self.path)?,
        };
        Ok(&*self.dockerfile.insert(dockerfile))
    }

    /// Adapter of the build tool named by `versionSource`, if it names one.
    fn delegate(&mut self) -> Result<Option<&mut Box<dyn VersionedArtifact>>, VersioningError> {
        let source = self.options.version_source.as_str();
        match source.parse::<BuildTool>() {
            Ok(BuildTool::Docker) | Err(_) => return Ok(None),
            Ok(_) => {}
        }
        if self.delegate.is_none() {
            // a plain Dockerfile path is no descriptor for the delegate
            let descriptor = (!is_dockerfile(&self.path)).then_some(self.path.as_path());
            tracing::debug!(tool = source, descriptor = ?descriptor, "Delegating docker versioning");
            let artifact =
                get_artifact_with_runner(source, descriptor, &self.options, Arc::clone(&self.runner))?;
            self.delegate = Some(artifact);
        }
        Ok(self.delegate.as_mut())
    }
}

fn is_dockerfile(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("Dockerfile"))
}

/// Turns an image reference into a single path segment.
fn image_slug(image: &str) -> String {
    image.replace(['/', ':'], "_")
}

impl VersionedArtifact for Docker {
    fn versioning_scheme(&self) -> VersioningScheme {
        self.scheme
    }

    fn get_version(&mut self) -> Result<String, VersioningError> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }
        let source = self.options.version_source.clone();
        let version = match source.as_str() {
            FROM_SOURCE => {
                let tag = self.dockerfile()?.base_image_tag();
                if tag.is_empty() {
                    return Err(VersioningError::VersionUnavailable {
                        location: "FROM statement".to_string(),
                    });
                }
                tag
            }
            "" => self.version_file().read()?,
            name => match self.delegate()? {
                Some(delegate) => delegate.get_version()?,
                None => self.dockerfile()?.env(name).ok_or_else(|| {
                    VersioningError::VersionUnavailable {
                        location: format!("ENV '{name}'"),
                    }
                })?,
            },
        };
        self.version = Some(version.clone());
        Ok(version)
    }

    fn set_version(&mut self, version: &str) -> Result<(), VersioningError> {
        if let Some(delegate) = self.delegate()? {
            delegate.set_version(version)?;
        }
        let file = self.version_file();
        file.write(version)?;
        tracing::info!(path = %file.path().display(), version, "Wrote docker version file");
        self.version = Some(version.to_string());
        Ok(())
    }

    /// Only the artifact id is known: the slug of the configured image.
    fn get_coordinates(&mut self) -> Result<Coordinates, VersioningError> {
        Ok(Coordinates {
            group_id: String::new(),
            artifact_id: image_slug(&self.options.docker_image),
            version: String::new(),
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
    use crate::versioning::maven::MockMavenRunner;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn docker(dir: &TempDir, file: &str, content: Option<&str>, opts: Options) -> Docker {
        let path = dir.path().join(file);
        if let Some(content) = content {
            std::fs::write(&path, content).unwrap();
        }
        Docker::new(path, opts, Arc::new(MockMavenRunner::new())).unwrap()
    }

    fn source(source: &str) -> Options {
        Options::default().with_version_source(source)
    }

    #[test]
    fn test_version_from_base_image() {
        let dir = TempDir::new().unwrap();
        let mut d = docker(&dir, "Dockerfile", Some("#COMMENT\nFROM test:1.2.3"), source("FROM"));
        assert_eq!(d.get_version().unwrap(), "1.2.3");

        let mut d = docker(&dir, "Dockerfile", Some("FROM my.registry:55555/test:1.2.3"), source("FROM"));
        assert_eq!(d.get_version().unwrap(), "1.2.3");
    }

    #[test]
    fn test_base_image_without_tag() {
        let dir = TempDir::new().unwrap();
        let mut d = docker(&dir, "Dockerfile", Some("FROM test"), source("FROM"));
        assert_eq!(
            d.get_version().unwrap_err().to_string(),
            "no version information available in FROM statement"
        );
    }

    #[test]
    fn test_missing_dockerfile() {
        let dir = TempDir::new().unwrap();
        let mut d = docker(&dir, "Dockerfile", None, source("FROM"));
        let err = d.get_version().unwrap_err();
        assert!(matches!(err, VersioningError::FileNotFound { .. }));
        assert!(err.to_string().starts_with("failed to read file '"));
    }

    #[test]
    fn test_version_from_env() {
        let dir = TempDir::new().unwrap();
        let content = "FROM test:latest\n\nENV VERSION_ENV 1.2.3";
        let mut d = docker(&dir, "Dockerfile", Some(content), source("VERSION_ENV"));
        assert_eq!(d.get_version().unwrap(), "1.2.3");

        let mut d = docker(&dir, "Dockerfile", Some(content), source("NOT_FOUND"));
        assert_eq!(
            d.get_version().unwrap_err().to_string(),
            "no version information available in ENV 'NOT_FOUND'"
        );
    }

    #[test]
    fn test_empty_source_reads_version_file() {
        let dir = TempDir::new().unwrap();
        let mut d = docker(&dir, "Dockerfile", Some("FROM test:1.0.0"), source(""));
        let err = d.get_version().unwrap_err();
        assert!(err.to_string().contains("VERSION"));

        std::fs::write(dir.path().join("VERSION"), "2.0.0\n").unwrap();
        assert_eq!(d.get_version().unwrap(), "2.0.0");
    }

    #[test]
    fn test_set_version_writes_version_file() {
        let dir = TempDir::new().unwrap();
        let mut d = docker(&dir, "Dockerfile", Some("FROM test:1.2.3"), source("FROM"));
        d.set_version("1.2.4").unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("VERSION")).unwrap(), "1.2.4");
        assert_eq!(d.get_version().unwrap(), "1.2.4");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Dockerfile")).unwrap(),
            "FROM test:1.2.3"
        );
    }

    #[test]
    fn test_delegates_to_build_tool() {
        let dir = TempDir::new().unwrap();
        let mut d = docker(&dir, "package.json", Some(r#"{"version": "1.2.3"}"#), source("npm"));
        assert_eq!(d.get_version().unwrap(), "1.2.3");

        d.set_version("1.2.4").unwrap();
        let package = std::fs::read_to_string(dir.path().join("package.json")).unwrap();
        assert!(package.contains(r#""version": "1.2.4""#));
        assert_eq!(std::fs::read_to_string(dir.path().join("VERSION")).unwrap(), "1.2.4");
    }

    #[test]
    fn test_coordinates_from_image() {
        let dir = TempDir::new().unwrap();
        let opts = source("FROM").with_docker_image("my/test/image:tag");
        let mut d = docker(&dir, "Dockerfile", Some("FROM test:1.2.3"), opts);
        assert_eq!(
            d.get_coordinates().unwrap(),
            Coordinates {
                group_id: String::new(),
                artifact_id: "my_test_image_tag".into(),
                version: String::new(),
                packaging: String::new(),
            }
        );
    }

    #[test]
    fn test_scheme_override() {
        let dir = TempDir::new().unwrap();
        let d = docker(&dir, "Dockerfile", None, source("FROM"));
        assert_eq!(d.versioning_scheme(), VersioningScheme::Docker);

        let d = docker(&dir, "Dockerfile", None, source("FROM").with_versioning_scheme("semver2"));
        assert_eq!(d.versioning_scheme(), VersioningScheme::Semver2);

        let err = Docker::new(
            dir.path().join("Dockerfile"),
            source("FROM").with_versioning_scheme("calver"),
            Arc::new(MockMavenRunner::new()),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "versioning scheme 'calver' not supported");
    }
}
