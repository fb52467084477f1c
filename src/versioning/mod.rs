//! Versioning engine
//!
//! A [`VersionedArtifact`] reads and writes the canonical version of a
//! project and reports its [`Coordinates`]. There is one implementation per
//! build descriptor family; [`get_artifact`] picks the right one for a build
//! tool name.
//!
//! ```no_run
//! use steplib::versioning::{get_artifact, Options};
//!
//! let mut artifact = get_artifact("npm", None, &Options::default())?;
//! let version = artifact.get_version()?;
//! artifact.set_version(&format!("{version}-rc"))?;
//! # Ok::<(), steplib::versioning::VersioningError>(())
//! ```

mod docker;
mod errors;
mod gomod;
mod helm;
mod ini_file;
mod json_file;
pub mod maven;
mod pip;
mod properties_file;
mod pyproject;
mod version_file;
mod yaml_file;

pub use docker::Docker;
pub use errors::VersioningError;
pub use gomod::GoMod;
pub use helm::HelmChart;
pub use ini_file::IniFile;
pub use json_file::JsonFile;
pub use maven::{CommandMavenRunner, EvaluateOptions, ExecuteOptions, Maven, MavenRunner};
pub use pip::Pip;
pub use properties_file::PropertiesFile;
pub use pyproject::Toml;
pub use version_file::VersionFileArtifact;
pub use yaml_file::YamlFile;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Version returned for Go modules that declare no version anywhere.
pub const UNSPECIFIED_VERSION: &str = "unspecified";

/// Artifact coordinates across build ecosystems.
///
/// Any field may be empty where the ecosystem has no such concept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Group, e.g. Maven `groupId` or the Go module prefix
    pub group_id: String,
    /// Artifact name
    pub artifact_id: String,
    /// Version
    pub version: String,
    /// Packaging, e.g. `jar`
    pub packaging: String,
}

impl Coordinates {
    /// Coordinates carrying a version only.
    #[must_use]
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }
}

/// Version comparison semantics of a build tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersioningScheme {
    /// Semantic versioning 2.0
    Semver2,
    /// Maven version ordering
    Maven,
    /// Python PEP 440
    Pep440,
    /// Docker tags
    Docker,
}

impl VersioningScheme {
    /// Lowercase tag, e.g. `semver2`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Semver2 => "semver2",
            Self::Maven => "maven",
            Self::Pep440 => "pep440",
            Self::Docker => "docker",
        }
    }

    /// Parses an optional override; empty means `fallback`.
    pub fn or_default(value: &str, fallback: Self) -> Result<Self, VersioningError> {
        if value.is_empty() {
            Ok(fallback)
        } else {
            value.parse()
        }
    }
}

impl fmt::Display for VersioningScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersioningScheme {
    type Err = VersioningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "semver2" => Ok(Self::Semver2),
            "maven" => Ok(Self::Maven),
            "pep440" => Ok(Self::Pep440),
            "docker" => Ok(Self::Docker),
            other => Err(VersioningError::Configuration(format!(
                "versioning scheme '{other}' not supported"
            ))),
        }
    }
}

/// Build tools with a versioning adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildTool {
    /// Generic file chosen by extension
    Custom,
    /// Dockerfile, optionally delegating to another tool
    Docker,
    /// `dub.json`
    Dub,
    /// `gradle.properties`
    Gradle,
    /// `go.mod` with `VERSION` sidecar
    Go,
    /// `Chart.yaml`
    Helm,
    /// `pom.xml` via the Maven evaluator
    Maven,
    /// `mta.yaml`
    Mta,
    /// `package.json`
    Npm,
    /// `package.json`
    Yarn,
    /// `setup.py` or a version file
    Pip,
    /// `pyproject.toml`
    Pyproject,
    /// `sbtDescriptor.json`
    Sbt,
    /// SAP Cloud Application Programming model; resolves to Maven or npm
    Cap,
}

impl FromStr for BuildTool {
    type Err = VersioningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "custom" => Self::Custom,
            "docker" => Self::Docker,
            "dub" => Self::Dub,
            "gradle" => Self::Gradle,
            "go" | "golang" => Self::Go,
            "helm" => Self::Helm,
            "maven" => Self::Maven,
            "mta" => Self::Mta,
            "npm" => Self::Npm,
            "yarn" => Self::Yarn,
            "pip" => Self::Pip,
            "pyproject" => Self::Pyproject,
            "sbt" => Self::Sbt,
            "CAP" => Self::Cap,
            other => {
                return Err(VersioningError::Configuration(format!(
                    "build tool '{other}' not supported"
                )));
            }
        })
    }
}

/// Build tool specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Maven `settings.xml` of the project
    pub project_settings_file: String,
    /// Image name used for Docker coordinates
    pub docker_image: String,
    /// Maven global `settings.xml`
    pub global_settings_file: String,
    /// Local Maven repository
    pub m2_path: String,
    /// Extra `-D` defines passed to Maven
    pub defines: Vec<String>,
    /// Docker version source: `FROM`, a build tool name or an `ENV` name
    pub version_source: String,
    /// INI section holding the version
    pub version_section: String,
    /// Field holding the version
    pub version_field: String,
    /// Override of the versioning scheme
    pub versioning_scheme: String,
    /// Also update `appVersion` of a Helm chart
    pub helm_update_app_version: bool,
    /// `maven` or `npm`, used when the build tool is `CAP`
    pub cap_versioning_preference: String,
}

impl Options {
    /// Sets the Docker version source.
    #[must_use]
    pub fn with_version_source(mut self, source: impl Into<String>) -> Self {
        self.version_source = source.into();
        self
    }

    /// Sets the version field.
    #[must_use]
    pub fn with_version_field(mut self, field: impl Into<String>) -> Self {
        self.version_field = field.into();
        self
    }

    /// Sets the INI section.
    #[must_use]
    pub fn with_version_section(mut self, section: impl Into<String>) -> Self {
        self.version_section = section.into();
        self
    }

    /// Overrides the versioning scheme.
    #[must_use]
    pub fn with_versioning_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.versioning_scheme = scheme.into();
        self
    }

    /// Sets the Docker image name.
    #[must_use]
    pub fn with_docker_image(mut self, image: impl Into<String>) -> Self {
        self.docker_image = image.into();
        self
    }

    /// Enables `appVersion` updates for Helm charts.
    #[must_use]
    pub fn with_helm_update_app_version(mut self, enabled: bool) -> Self {
        self.helm_update_app_version = enabled;
        self
    }

    /// Sets the CAP preference (`maven` or `npm`).
    #[must_use]
    pub fn with_cap_versioning_preference(mut self, preference: impl Into<String>) -> Self {
        self.cap_versioning_preference = preference.into();
        self
    }

    /// Version field, defaulting to `version`.
    #[must_use]
    pub fn version_field_or_default(&self) -> &str {
        if self.version_field.is_empty() {
            "version"
        } else {
            &self.version_field
        }
    }
}

/// Versioning operations of a build descriptor.
///
/// Implementations cache what they read: a [`set_version`] followed by a
/// [`get_version`] on the same value returns the new version without
/// touching the file again.
///
/// [`set_version`]: VersionedArtifact::set_version
/// [`get_version`]: VersionedArtifact::get_version
pub trait VersionedArtifact: fmt::Debug + Send {
    /// Version comparison semantics of this artifact.
    fn versioning_scheme(&self) -> VersioningScheme;

    /// Reads the canonical version.
    fn get_version(&mut self) -> Result<String, VersioningError>;

    /// Writes the version back to every place that carries it.
    fn set_version(&mut self, version: &str) -> Result<(), VersioningError>;

    /// Coordinates of the artifact; defaults to the version only.
    fn get_coordinates(&mut self) -> Result<Coordinates, VersioningError> {
        Ok(Coordinates::with_version(self.get_version()?))
    }

    /// Descriptor the artifact reads from, once known.
    fn descriptor_path(&self) -> Option<&Path>;
}

/// Umbrella artifact handed to scan and release steps.
///
/// Either a direct build tool adapter or a [`Docker`] adapter that may wrap one.
pub type Artifact = Box<dyn VersionedArtifact>;

fn default_path(path: Option<&Path>, default: &str) -> PathBuf {
    path.map_or_else(|| PathBuf::from(default), Path::to_path_buf)
}

fn searched_path(path: Option<&Path>, candidates: &[&str]) -> Result<PathBuf, VersioningError> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => crate::descriptor::search(Path::new(""), candidates),
    }
}

fn file_name_is(path: &Path, name: &str) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(name)
}

/// Returns the artifact adapter for `build_tool`, using the default Maven runner.
///
/// `descriptor` overrides the default descriptor location of the tool.
pub fn get_artifact(
    build_tool: &str,
    descriptor: Option<&Path>,
    opts: &Options,
) -> Result<Artifact, VersioningError> {
    get_artifact_with_runner(
        build_tool,
        descriptor,
        opts,
        Arc::new(CommandMavenRunner::default()),
    )
}

/// Same as [`get_artifact`] with an explicit Maven runner.
pub fn get_artifact_with_runner(
    build_tool: &str,
    descriptor: Option<&Path>,
    opts: &Options,
    runner: Arc<dyn MavenRunner>,
) -> Result<Artifact, VersioningError> {
    let descriptor = descriptor.filter(|p| !p.as_os_str().is_empty());
    let tool: BuildTool = build_tool.parse()?;
    if tool == BuildTool::Cap {
        let preference = opts.cap_versioning_preference.as_str();
        if !matches!(preference, "maven" | "npm") {
            return Err(VersioningError::Configuration(format!(
                "CAP versioning preference '{preference}' not supported, use 'maven' or 'npm'"
            )));
        }
        return get_artifact_with_runner(preference, descriptor, opts, runner);
    }
    tracing::debug!(build_tool, ?tool, descriptor = ?descriptor, "Selecting versioning adapter");

    let artifact: Artifact = match tool {
        BuildTool::Custom => {
            let path = descriptor.ok_or_else(|| {
                VersioningError::Configuration(
                    "build tool 'custom' requires a build descriptor file".to_string(),
                )
            })?;
            custom_artifact(path, opts)?
        }
        BuildTool::Docker => Box::new(Docker::new(
            default_path(descriptor, "Dockerfile"),
            opts.clone(),
            Arc::clone(&runner),
        )?),
        BuildTool::Dub => Box::new(JsonFile::new(default_path(descriptor, "dub.json"), "version")),
        BuildTool::Gradle => Box::new(PropertiesFile::gradle(
            default_path(descriptor, "gradle.properties"),
            opts.version_field_or_default(),
        )),
        BuildTool::Go => {
            let path = searched_path(descriptor, &["go.mod", "VERSION", "version.txt"])?;
            if file_name_is(&path, "go.mod") {
                Box::new(GoMod::new(path))
            } else {
                Box::new(VersionFileArtifact::new(path, VersioningScheme::Semver2))
            }
        }
        BuildTool::Helm => Box::new(HelmChart::new(
            descriptor.map(Path::to_path_buf),
            opts.helm_update_app_version,
        )),
        BuildTool::Maven => Box::new(Maven::new(
            EvaluateOptions::from_options(default_path(descriptor, "pom.xml"), opts),
            runner,
        )),
        BuildTool::Mta => Box::new(
            YamlFile::new(default_path(descriptor, "mta.yaml"), "version")
                .with_artifact_id_field("ID"),
        ),
        BuildTool::Npm | BuildTool::Yarn => {
            Box::new(JsonFile::new(default_path(descriptor, "package.json"), "version"))
        }
        BuildTool::Pip => {
            let path = searched_path(
                descriptor,
                &["setup.py", "version.txt", "VERSION", "pyproject.toml"],
            )?;
            if file_name_is(&path, "pyproject.toml") {
                Box::new(Toml::new(path))
            } else {
                Box::new(Pip::new(path))
            }
        }
        BuildTool::Pyproject => Box::new(Toml::new(default_path(descriptor, "pyproject.toml"))),
        BuildTool::Sbt => {
            let path = searched_path(descriptor, &["sbtDescriptor.json", "build.sbt"])?;
            Box::new(JsonFile::new(path, "version"))
        }
        BuildTool::Cap => {
            return Err(VersioningError::Configuration(
                "build tool 'CAP' must be resolved to maven or npm".to_string(),
            ));
        }
    };
    Ok(artifact)
}

/// Chooses a generic codec by file extension.
fn custom_artifact(
    path: &Path,
    opts: &Options,
) -> Result<Artifact, VersioningError> {
    let scheme = VersioningScheme::or_default(&opts.versioning_scheme, VersioningScheme::Semver2)?;
    let field = opts.version_field_or_default();
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    Ok(match extension {
        "cfg" | "ini" => Box::new(IniFile::new(path, field, &opts.version_section, scheme)),
        "json" => Box::new(JsonFile::new(path, field).with_scheme(scheme)),
        "yaml" | "yml" => Box::new(YamlFile::new(path, field).with_scheme(scheme)),
        "properties" => Box::new(PropertiesFile::new(path, field, scheme)),
        "txt" | "" => Box::new(VersionFileArtifact::new(path, scheme)),
        _ => {
            return Err(VersioningError::Configuration(format!(
                "file type not supported: '{}'",
                path.display()
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_descriptors() {
        let cases = [
            ("npm", "package.json", VersioningScheme::Semver2),
            ("yarn", "package.json", VersioningScheme::Semver2),
            ("dub", "dub.json", VersioningScheme::Semver2),
            ("gradle", "gradle.properties", VersioningScheme::Semver2),
            ("mta", "mta.yaml", VersioningScheme::Semver2),
            ("maven", "pom.xml", VersioningScheme::Maven),
            ("pyproject", "pyproject.toml", VersioningScheme::Pep440),
            ("docker", "Dockerfile", VersioningScheme::Docker),
        ];
        for (tool, path, scheme) in cases {
            let artifact = get_artifact(tool, None, &Options::default()).unwrap();
            assert_eq!(artifact.descriptor_path(), Some(Path::new(path)), "{tool}");
            assert_eq!(artifact.versioning_scheme(), scheme, "{tool}");
        }
    }

    #[test]
    fn test_unsupported_build_tool() {
        let err = get_artifact("nosupport", Some(Path::new("whatever")), &Options::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "build tool 'nosupport' not supported");
    }

    #[test]
    fn test_cap_preference() {
        let opts = Options::default().with_cap_versioning_preference("maven");
        let artifact = get_artifact("CAP", None, &opts).unwrap();
        assert_eq!(artifact.versioning_scheme(), VersioningScheme::Maven);

        let opts = Options::default().with_cap_versioning_preference("npm");
        let artifact = get_artifact("CAP", None, &opts).unwrap();
        assert_eq!(artifact.descriptor_path(), Some(Path::new("package.json")));

        assert!(get_artifact("CAP", None, &Options::default()).is_err());
    }

    #[test]
    fn test_custom_by_extension() {
        let opts = Options::default()
            .with_version_field("testField")
            .with_version_section("testSection");
        let files = [
            "test.cfg",
            "test.ini",
            "test.json",
            "test.yaml",
            "test.yml",
            "test.properties",
            "test.txt",
            "test",
        ];
        for file in files {
            let artifact = get_artifact("custom", Some(Path::new(file)), &opts).unwrap();
            assert_eq!(artifact.descriptor_path(), Some(Path::new(file)));
            assert_eq!(artifact.versioning_scheme(), VersioningScheme::Semver2);
        }

        let maven = opts.clone().with_versioning_scheme("maven");
        let artifact = get_artifact("custom", Some(Path::new("test")), &maven).unwrap();
        assert_eq!(artifact.versioning_scheme(), VersioningScheme::Maven);

        let err = get_artifact("custom", Some(Path::new("not.supported")), &opts).unwrap_err();
        assert_eq!(err.to_string(), "file type not supported: 'not.supported'");
    }

    #[test]
    fn test_scheme_round_trip() {
        for scheme in [
            VersioningScheme::Semver2,
            VersioningScheme::Maven,
            VersioningScheme::Pep440,
            VersioningScheme::Docker,
        ] {
            assert_eq!(scheme.as_str().parse::<VersioningScheme>().unwrap(), scheme);
        }
        assert!("calver".parse::<VersioningScheme>().is_err());
    }

    #[test]
    fn test_go_aliases() {
        assert_eq!("go".parse::<BuildTool>().unwrap(), BuildTool::Go);
        assert_eq!("golang".parse::<BuildTool>().unwrap(), BuildTool::Go);
    }
}
