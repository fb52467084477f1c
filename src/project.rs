//! Project name and version resolution
//!
//! Scan and release steps address a project by a name rendered from its
//! coordinates and by a version normalized to a model such as `major` or
//! `semantic`. Both are rendered with the sandboxed [`template`] engine.
//!
//! [`template`]: crate::template

use crate::template::{self, Value};
use crate::versioning::{Coordinates, VersioningError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `groupId-artifactId`, without dangling dashes when the group is empty.
pub const DEFAULT_NAME_TEMPLATE: &str = r#"{{list .GroupID .ArtifactID | join "-" | trimAll "-"}}"#;

const MAJOR: &str = r#"{{(split "." (split "-" .Version)._0)._0}}"#;
const MAJOR_MINOR: &str = r#"{{(split "." (split "-" .Version)._0)._0}}.{{(split "." (split "-" .Version)._0)._1}}"#;
const SEMANTIC: &str = r#"{{(split "." (split "-" .Version)._0)._0}}.{{(split "." (split "-" .Version)._0)._1}}.{{(split "." (split "-" .Version)._0)._2}}"#;
const FULL: &str = "{{.Version}}";

/// How much of a version a project version keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionModel {
    /// Unchanged
    Full,
    /// `major.minor.patch`
    Semantic,
    /// `major.minor`
    MajorMinor,
    /// `major`
    Major,
}

impl VersionModel {
    /// Model name as used in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Semantic => "semantic",
            Self::MajorMinor => "major-minor",
            Self::Major => "major",
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::Full => FULL,
            Self::Semantic => SEMANTIC,
            Self::MajorMinor => MAJOR_MINOR,
            Self::Major => MAJOR,
        }
    }

    /// Applies the model to `version`.
    ///
    /// Everything from the first `-` is dropped unless the model is
    /// [`VersionModel::Full`]. Missing segments render as
    /// [`template::NO_VALUE`] instead of being padded.
    #[must_use]
    pub fn apply(self, version: &str) -> String {
        let data = Value::map([("Version", version)]);
        match template::render(self.template(), &data) {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::warn!(model = %self, version, error = %e, "Unable to normalize version");
                String::new()
            }
        }
    }
}

impl fmt::Display for VersionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionModel {
    type Err = VersioningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "semantic" => Ok(Self::Semantic),
            "major-minor" => Ok(Self::MajorMinor),
            "major" => Ok(Self::Major),
            other => Err(VersioningError::Configuration(format!(
                "versioning model '{other}' not supported"
            ))),
        }
    }
}

/// Template data for coordinates: `.GroupID`, `.ArtifactID`, `.Version`, `.Packaging`.
#[must_use]
pub fn coordinates_data(coordinates: &Coordinates) -> Value {
    Value::map([
        ("GroupID", coordinates.group_id.as_str()),
        ("ArtifactID", coordinates.artifact_id.as_str()),
        ("Version", coordinates.version.as_str()),
        ("Packaging", coordinates.packaging.as_str()),
    ])
}

/// Normalizes `version` to the model named `model`.
///
/// An unknown model is logged and yields an empty string.
#[must_use]
pub fn normalize_version(version: &str, model: &str) -> String {
    match model.parse::<VersionModel>() {
        Ok(model) => model.apply(version),
        Err(e) => {
            tracing::warn!(model, error = %e, "Unknown versioning model, project version is empty");
            String::new()
        }
    }
}

/// Renders the project name from `name_template`.
///
/// Template errors are logged and yield an empty name.
#[must_use]
pub fn project_name(name_template: &str, coordinates: &Coordinates) -> String {
    template::render(name_template, &coordinates_data(coordinates)).unwrap_or_else(|e| {
        tracing::warn!(template = name_template, error = %e, "Unable to resolve project name");
        String::new()
    })
}

/// Resolves `(name, version)` of a project for third party tools.
#[must_use]
pub fn determine_project_coordinates(
    name_template: &str,
    model: &str,
    coordinates: &Coordinates,
) -> (String, String) {
    (
        project_name(name_template, coordinates),
        normalize_version(&coordinates.version, model),
    )
}

/// The version a project is reported under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVersion {
    /// Reported version
    pub version: String,
    /// True when a literal override was used
    pub overridden: bool,
}

impl ProjectVersion {
    /// Uses `override_version` verbatim when given, else normalizes the
    /// coordinate version with `model`.
    #[must_use]
    pub fn resolve(override_version: Option<&str>, model: &str, coordinates: &Coordinates) -> Self {
        match override_version.filter(|v| !v.is_empty()) {
            Some(version) => Self {
                version: version.to_string(),
                overridden: true,
            },
            None => Self {
                version: normalize_version(&coordinates.version, model),
                overridden: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn coordinates(group_id: &str, artifact_id: &str, version: &str) -> Coordinates {
        Coordinates {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            packaging: "jar".to_string(),
        }
    }

    #[test]
    fn test_models() {
        let version = "1.2.3-20200101";
        assert_eq!(normalize_version(version, "full"), "1.2.3-20200101");
        assert_eq!(normalize_version(version, "semantic"), "1.2.3");
        assert_eq!(normalize_version(version, "major-minor"), "1.2");
        assert_eq!(normalize_version(version, "major"), "1");
    }

    #[test]
    fn test_missing_segments_are_not_padded() {
        assert_eq!(normalize_version("1", "semantic"), "1.<no value>.<no value>");
        assert_eq!(normalize_version("1-SNAPSHOT", "major-minor"), "1.<no value>");
    }

    #[test]
    fn test_unknown_model_is_empty() {
        assert_eq!(normalize_version("1.2.3", "calver"), "");
        assert!("calver".parse::<VersionModel>().is_err());
    }

    #[test]
    fn test_project_coordinates() {
        let (name, version) = determine_project_coordinates(
            DEFAULT_NAME_TEMPLATE,
            "major",
            &coordinates("com.test.pkg", "analyzer", "1.2.3"),
        );
        assert_eq!(name, "com.test.pkg-analyzer");
        assert_eq!(version, "1");

        let (name, _) =
            determine_project_coordinates(DEFAULT_NAME_TEMPLATE, "full", &coordinates("", "app", "1"));
        assert_eq!(name, "app");
    }

    #[test]
    fn test_invalid_name_template_is_empty() {
        assert_eq!(project_name("{{.GroupID", &coordinates("g", "a", "1")), "");
    }

    #[test]
    fn test_override_bypasses_normalizer() {
        let c = coordinates("g", "a", "1.2.3");
        assert_eq!(
            ProjectVersion::resolve(Some("custom-7"), "major", &c),
            ProjectVersion {
                version: "custom-7".to_string(),
                overridden: true
            }
        );
        assert_eq!(ProjectVersion::resolve(Some(""), "major", &c).version, "1");
        assert_eq!(ProjectVersion::resolve(None, "major-minor", &c).version, "1.2");
    }

    proptest! {
        #[test]
        fn normalizing_twice_is_stable(
            version in "[0-9]{1,3}(\\.[0-9]{1,3}){2,4}(-[a-z0-9]{1,8})?",
            model in prop::sample::select(vec!["full", "semantic", "major-minor", "major"]),
        ) {
            let once = normalize_version(&version, model);
            prop_assert_eq!(normalize_version(&once, model), once.clone());
            if model != "full" {
                prop_assert!(!once.contains('-'));
            }
        }
    }
}
