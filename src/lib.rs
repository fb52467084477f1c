//! # steplib - Project-reporter core for CI/CD steps
//!
//! Pipeline steps such as build, scan and publish need two things from the
//! project they run on: its version and coordinates, and the facts of the
//! CI system running them. This crate provides both.
//!
//! ## Features
//!
//! - **Versioning**: read and write versions in Maven, npm, Go, Python,
//!   Gradle, Helm, MTA, Docker and generic descriptors ([`versioning`])
//! - **Project coordinates**: render project names and normalize versions
//!   with a sandboxed template engine ([`project`], [`template`])
//! - **Orchestrators**: one view over Azure DevOps, GitHub Actions and
//!   Jenkins, including build status and logs ([`orchestrator`])
//!
//! ## Quick Start
//!
//! ```no_run
//! use steplib::prelude::*;
//!
//! let mut artifact = get_artifact("maven", None, &Options::default())?;
//! let coordinates = artifact.get_coordinates()?;
//! let (name, version) =
//!     determine_project_coordinates(DEFAULT_NAME_TEMPLATE, "major", &coordinates);
//! println!("{name} {version}");
//!
//! let orchestrator = get_orchestrator_config()?;
//! println!("running on {} for {}", orchestrator.kind(), orchestrator.branch());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## License
//!
//! Licensed under either of
//! - Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <https://www.apache.org/licenses/LICENSE-2.0>)
//! - MIT license ([LICENSE-MIT](LICENSE-MIT) or <https://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod descriptor;
pub mod errors;
pub mod executor;
pub mod infrastructure;
pub mod orchestrator;
pub mod project;
pub mod template;
pub mod versioning;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use errors::ErrorKind;
pub use infrastructure::{Config, init_logging};
pub use orchestrator::{
    OrchestratorError, OrchestratorFacts, OrchestratorKind, OrchestratorProvider,
    get_orchestrator_config,
};
pub use project::{ProjectVersion, VersionModel, determine_project_coordinates};
pub use versioning::{
    Artifact, Coordinates, VersionedArtifact, VersioningError, VersioningScheme, get_artifact,
};

/// Version of the steplib crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
