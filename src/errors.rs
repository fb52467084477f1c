//! Error taxonomy shared by the versioning engine and the orchestrator layer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of every error the core can surface.
///
/// Callers map these to exit codes with [`ErrorKind::exit_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Missing required input, unknown build tool or unsupported model
    Configuration,
    /// File not found or read/write failure on a descriptor
    Io,
    /// Malformed descriptor content
    Parse,
    /// Expected version or name field is absent
    FieldNotFound,
    /// HTTP failure against an orchestrator API
    Remote,
    /// Maven evaluator failed or returned the unresolved sentinel
    Eval,
}

impl ErrorKind {
    /// Stable process exit code for this kind.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Configuration => 2,
            Self::Io => 3,
            Self::Parse => 4,
            Self::FieldNotFound => 5,
            Self::Remote => 6,
            Self::Eval => 7,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "CONFIGURATION",
            Self::Io => "IO",
            Self::Parse => "PARSE",
            Self::FieldNotFound => "FIELD_NOT_FOUND",
            Self::Remote => "REMOTE",
            Self::Eval => "EVAL",
        };
        f.write_str(name)
    }
}
