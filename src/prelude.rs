//! Prelude module for common imports

// Errors
pub use crate::errors::ErrorKind;
pub use crate::orchestrator::OrchestratorError;
pub use crate::template::TemplateError;
pub use crate::versioning::VersioningError;

// Versioning
pub use crate::versioning::{
    Artifact, BuildTool, Coordinates, Options, VersionedArtifact, VersioningScheme, get_artifact,
    get_artifact_with_runner,
};

// Project coordinates
pub use crate::project::{
    DEFAULT_NAME_TEMPLATE, ProjectVersion, VersionModel, determine_project_coordinates,
    normalize_version,
};

// Orchestrators
pub use crate::orchestrator::{
    BuildReason, BuildStatus, ChangeSet, Environment, OrchestratorFacts, OrchestratorKind,
    OrchestratorProvider, PullRequestConfig, get_orchestrator_config,
};
