//! Configuration management

use crate::errors::ErrorKind;
use crate::orchestrator;
use crate::project::DEFAULT_NAME_TEMPLATE;
use crate::versioning;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration file errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read configuration '{path}': {message}")]
    Read {
        /// Configuration file.
        path: String,
        /// I/O message.
        message: String,
    },

    /// File is not valid YAML for [`Config`]
    #[error("failed to parse configuration '{path}': {message}")]
    Parse {
        /// Configuration file.
        path: String,
        /// Parser message.
        message: String,
    },
}

impl ConfigError {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } => ErrorKind::Io,
            Self::Parse { .. } => ErrorKind::Parse,
        }
    }
}

/// How the project is reported to scan and release tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Template for the project name
    pub name_template: String,
    /// `full`, `semantic`, `major-minor` or `major`
    pub versioning_model: String,
    /// Literal version used instead of the normalized one
    pub version_override: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name_template: DEFAULT_NAME_TEMPLATE.to_string(),
            versioning_model: "major".to_string(),
            version_override: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Log level
    pub log_level: String,
    /// Build tool, e.g. `maven` or `npm`
    pub build_tool: String,
    /// Build descriptor; searched for when empty
    pub build_descriptor_file: String,
    /// Build tool specific settings
    pub versioning: versioning::Options,
    /// Project name and version settings
    pub project: ProjectConfig,
    /// Orchestrator credentials and HTTP settings
    pub orchestrator: orchestrator::Options,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            build_tool: String::new(),
            build_descriptor_file: String::new(),
            versioning: versioning::Options::default(),
            project: ProjectConfig::default(),
            orchestrator: orchestrator::Options::default(),
        }
    }
}

impl Config {
    /// Loads a YAML configuration file; absent keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "Loading configuration");
        Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parses YAML configuration; an empty document is the default configuration.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: String::new(),
            message: e.to_string(),
        })
    }

    /// Descriptor path, if one is configured.
    #[must_use]
    pub fn descriptor(&self) -> Option<&Path> {
        (!self.build_descriptor_file.is_empty()).then(|| Path::new(&self.build_descriptor_file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.project.versioning_model, "major");
        assert_eq!(config.orchestrator.timeout_secs, 10);
        assert_eq!(config.orchestrator.max_retries, 3);
        assert!(config.descriptor().is_none());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r"
logLevel: debug
buildTool: docker
buildDescriptorFile: build/Dockerfile
versioning:
  versionSource: FROM
  dockerImage: acme/app
project:
  versioningModel: semantic
  versionOverride: 2.0.0-custom
orchestrator:
  jenkinsUser: ci
  maxRetries: 1
"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.build_tool, "docker");
        assert_eq!(config.descriptor(), Some(Path::new("build/Dockerfile")));
        assert_eq!(config.versioning.version_source, "FROM");
        assert_eq!(config.versioning.docker_image, "acme/app");
        assert_eq!(config.project.versioning_model, "semantic");
        assert_eq!(config.project.name_template, DEFAULT_NAME_TEMPLATE);
        assert_eq!(config.project.version_override.as_deref(), Some("2.0.0-custom"));
        assert_eq!(config.orchestrator.jenkins_user, "ci");
        assert_eq!(config.orchestrator.max_retries, 1);
        assert_eq!(config.orchestrator.timeout_secs, 10);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::from_yaml("").unwrap().log_level, "info");
    }

    #[test]
    fn test_errors() {
        let err = Config::from_file("/nonexistent/steplib.yaml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);

        let err = Config::from_yaml("logLevel: [unclosed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
