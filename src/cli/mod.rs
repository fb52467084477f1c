//! CLI for steplib
//!
//! Thin commands over the library so a pipeline shell step can use it:
//! - `version` / `set-version`: read or write the project version
//! - `coordinates`: print artifact coordinates
//! - `project`: print the normalized project name and version
//! - `orchestrator`: print the facts of the detected CI system
//! - `completions`: generate shell completions

pub mod completions;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, CommandFactory, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use steplib::errors::ErrorKind;
use steplib::infrastructure::{init_logging, Config, ConfigError, HttpError};
use steplib::orchestrator::{self, OrchestratorError, OrchestratorFacts};
use steplib::project::{self, ProjectVersion};
use steplib::template::TemplateError;
use steplib::versioning::{self, Artifact, VersioningError};

/// CLI arguments for steplib
#[derive(Parser, Debug)]
#[command(name = "steplib")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overrides the configuration
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Selects the build descriptor
#[derive(ClapArgs, Debug, Clone, Default)]
struct ArtifactArgs {
    /// Build tool, e.g. maven, npm, docker
    #[arg(short, long)]
    build_tool: Option<String>,

    /// Build descriptor; searched for when omitted
    #[arg(short, long)]
    path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the version of the project
    Version {
        #[command(flatten)]
        artifact: ArtifactArgs,
    },

    /// Write a new version into the build descriptor
    SetVersion {
        /// New version
        version: String,
        #[command(flatten)]
        artifact: ArtifactArgs,
    },

    /// Print the coordinates of the project as JSON
    Coordinates {
        #[command(flatten)]
        artifact: ArtifactArgs,
    },

    /// Print the project name and normalized version as JSON
    Project {
        #[command(flatten)]
        artifact: ArtifactArgs,
        /// Template for the project name
        #[arg(long)]
        name_template: Option<String>,
        /// Versioning model: full, semantic, major-minor or major
        #[arg(long)]
        scheme: Option<String>,
        /// Report this version instead of the normalized one
        #[arg(long)]
        version_override: Option<String>,
    },

    /// Print the facts of the detected orchestrator as JSON
    Orchestrator {
        /// Print the full build log instead
        #[arg(long)]
        logs: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectReport {
    name: String,
    version: String,
    version_overridden: bool,
}

/// Build the CLI command for completion generation
pub fn build_cli() -> clap::Command {
    Args::command()
}

fn artifact(config: &Config, args: &ArtifactArgs) -> Result<Artifact> {
    let build_tool = args
        .build_tool
        .as_deref()
        .unwrap_or(&config.build_tool);
    if build_tool.is_empty() {
        anyhow::bail!(VersioningError::Configuration(
            "no build tool given, use --build-tool or 'buildTool' in the configuration"
                .to_string()
        ));
    }
    let descriptor = args.path.as_deref().or_else(|| config.descriptor());
    Ok(versioning::get_artifact(
        build_tool,
        descriptor,
        &config.versioning,
    )?)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse and execute CLI arguments
pub fn run() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    init_logging(args.log_level.as_deref().unwrap_or(&config.log_level));

    match args.command {
        Command::Version { artifact: selection } => {
            let version = artifact(&config, &selection)?.get_version()?;
            println!("{version}");
        }
        Command::SetVersion {
            version,
            artifact: selection,
        } => {
            artifact(&config, &selection)?.set_version(&version)?;
            tracing::info!(version = %version, "Version updated");
        }
        Command::Coordinates { artifact: selection } => {
            let coordinates = artifact(&config, &selection)?.get_coordinates()?;
            print_json(&coordinates)?;
        }
        Command::Project {
            artifact: selection,
            name_template,
            scheme,
            version_override,
        } => {
            let coordinates = artifact(&config, &selection)?.get_coordinates()?;
            let name_template =
                name_template.unwrap_or_else(|| config.project.name_template.clone());
            let scheme = scheme.unwrap_or_else(|| config.project.versioning_model.clone());
            let version_override =
                version_override.or_else(|| config.project.version_override.clone());

            let version = ProjectVersion::resolve(version_override.as_deref(), &scheme, &coordinates);
            print_json(&ProjectReport {
                name: project::project_name(&name_template, &coordinates),
                version: version.version,
                version_overridden: version.overridden,
            })?;
        }
        Command::Orchestrator { logs } => {
            let provider = orchestrator::get_orchestrator_config()?;
            provider.configure(&config.orchestrator)?;
            if logs {
                let bytes = provider.full_logs()?;
                std::io::stdout()
                    .lock()
                    .write_all(&bytes)
                    .context("Failed to write logs")?;
            } else {
                print_json(&OrchestratorFacts::collect(provider.as_ref()))?;
            }
        }
        Command::Completions { shell, output } => {
            use clap_complete::Shell;

            let shell_enum = match shell {
                ShellArg::Bash => Shell::Bash,
                ShellArg::Zsh => Shell::Zsh,
                ShellArg::Fish => Shell::Fish,
                ShellArg::PowerShell => Shell::PowerShell,
            };

            let completions = completions::generate_completions(shell_enum)?;

            if let Some(output_path) = output {
                completions::save_completions(&completions, &output_path)?;
            } else {
                println!("{completions}");
            }
        }
    }

    Ok(())
}

/// Error kind behind `error`, when it comes from the library.
pub fn error_kind(error: &anyhow::Error) -> Option<ErrorKind> {
    if let Some(e) = error.downcast_ref::<VersioningError>() {
        Some(e.kind())
    } else if let Some(e) = error.downcast_ref::<OrchestratorError>() {
        Some(e.kind())
    } else if let Some(e) = error.downcast_ref::<ConfigError>() {
        Some(e.kind())
    } else if let Some(e) = error.downcast_ref::<TemplateError>() {
        Some(e.kind())
    } else if error.downcast_ref::<HttpError>().is_some() {
        Some(ErrorKind::Remote)
    } else {
        None
    }
}
