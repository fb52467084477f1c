//! steplib - versioning and orchestrator facts for CI/CD steps
//!
//! ## Commands
//!
//! - `steplib version` - Print the project version
//! - `steplib set-version` - Write a new project version
//! - `steplib coordinates` - Print artifact coordinates as JSON
//! - `steplib project` - Print the normalized project name and version
//! - `steplib orchestrator` - Print the facts of the detected CI system
//! - `steplib completions` - Generate shell completions
//!
//! ## Quick Start
//!
//! ```bash
//! # Read the version of a Maven project
//! steplib version --build-tool maven
//!
//! # Bump a Helm chart
//! steplib set-version 1.4.0 --build-tool helm --path charts/app/Chart.yaml
//!
//! # Project name and major version for a scanner
//! steplib project --build-tool npm --scheme major
//!
//! # Logs of the current build
//! steplib --config steplib.yaml orchestrator --logs > build.log
//! ```
//!
//! Exit codes follow the error kind: 2 configuration, 3 I/O, 4 parse,
//! 5 missing field, 6 remote, 7 Maven evaluation, 1 anything else.

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if std::env::var("STEPLIB_VERBOSE").is_ok() {
                eprintln!("{e:?}");
            }
            cli::error_kind(&e).map_or(ExitCode::FAILURE, |kind| ExitCode::from(kind.exit_code()))
        }
    }
}
