//! Error types for the versioning engine

use crate::errors::ErrorKind;
use thiserror::Error;

/// Errors raised while reading or writing build descriptors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersioningError {
    /// Descriptor does not exist
    #[error("failed to read file '{path}': file not found")]
    FileNotFound {
        /// Path that was looked up.
        path: String,
    },

    /// Descriptor could not be read
    #[error("failed to read file '{path}': {message}")]
    Read {
        /// Path that failed.
        path: String,
        /// Underlying error message.
        message: String,
    },

    /// Descriptor could not be written
    #[error("failed to write file '{path}': {message}")]
    Write {
        /// Path that failed.
        path: String,
        /// Underlying error message.
        message: String,
    },

    /// Descriptor content is malformed
    #[error("{message} '{path}'")]
    Parse {
        /// Path of the malformed descriptor.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// Field is not present in the descriptor
    #[error("no {field} information found in file '{path}'")]
    FieldNotFound {
        /// Path of the descriptor.
        path: String,
        /// Name of the missing field.
        field: String,
    },

    /// Dockerfile carries no version at the requested place
    #[error("no version information available in {location}")]
    VersionUnavailable {
        /// `FROM statement` or `ENV 'NAME'`.
        location: String,
    },

    /// Invalid combination of build tool, descriptor or options
    #[error("{0}")]
    Configuration(String),

    /// Maven evaluation failed
    #[error("failed to evaluate '{expression}' in '{pom}': {message}")]
    Eval {
        /// POM the expression was evaluated against.
        pom: String,
        /// Maven expression, e.g. `project.version`.
        expression: String,
        /// Evaluator output or launch failure.
        message: String,
    },
}

impl VersioningError {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } | Self::Read { .. } | Self::Write { .. } => ErrorKind::Io,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::FieldNotFound { .. } | Self::VersionUnavailable { .. } => {
                ErrorKind::FieldNotFound
            }
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Eval { .. } => ErrorKind::Eval,
        }
    }

    /// Path of the descriptor the error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::FileNotFound { path }
            | Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Parse { path, .. }
            | Self::FieldNotFound { path, .. } => Some(path),
            Self::Eval { pom, .. } => Some(pom),
            Self::Configuration(_) | Self::VersionUnavailable { .. } => None,
        }
    }

    pub(crate) fn read(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        let path = path.as_ref().display().to_string();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::Read {
                path,
                message: err.to_string(),
            }
        }
    }

    pub(crate) fn write(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        Self::Write {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn parse(path: impl AsRef<std::path::Path>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.as_ref().display().to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn field_not_found(path: impl AsRef<std::path::Path>, field: &str) -> Self {
        Self::FieldNotFound {
            path: path.as_ref().display().to_string(),
            field: field.to_string(),
        }
    }
}
