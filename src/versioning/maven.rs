//! Maven adapter and evaluator bridge
//!
//! Versions and coordinates of a Maven project are asked from Maven itself
//! through the help plugin's `evaluate` goal, so parent POMs, properties and
//! profiles resolve exactly as in the build. Writes go through the versions
//! plugin.

use super::{Coordinates, Options, VersionedArtifact, VersioningError, VersioningScheme};
use crate::descriptor::Pom;
use crate::executor::{CommandRunner, LocalCommandRunner};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Goal used to evaluate an expression against a POM.
pub const EVALUATE_GOAL: &str = "org.apache.maven.plugins:maven-help-plugin:3.1.0:evaluate";
/// Goal used to rewrite the project version.
pub const SET_VERSION_GOAL: &str = "org.codehaus.mojo:versions-maven-plugin:set";
/// Evaluator output for an expression Maven cannot resolve.
pub const UNRESOLVED_SENTINEL: &str = "null object or invalid expression";

const TRANSFER_LOG_DEFINE: &str =
    "-Dorg.slf4j.simpleLogger.log.org.apache.maven.cli.transfer.Slf4jMavenTransferListener=warn";

/// Settings for evaluating expressions against one POM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluateOptions {
    /// POM to evaluate against
    pub pom_path: PathBuf,
    /// Project `settings.xml`
    pub project_settings_file: String,
    /// Global `settings.xml`
    pub global_settings_file: String,
    /// Local repository
    pub m2_path: String,
    /// Extra `-D` defines
    pub defines: Vec<String>,
}

impl EvaluateOptions {
    /// Options for `pom_path` taking Maven settings from `opts`.
    #[must_use]
    pub fn from_options(pom_path: impl Into<PathBuf>, opts: &Options) -> Self {
        Self {
            pom_path: pom_path.into(),
            project_settings_file: opts.project_settings_file.clone(),
            global_settings_file: opts.global_settings_file.clone(),
            m2_path: opts.m2_path.clone(),
            defines: opts.defines.clone(),
        }
    }
}

/// A full Maven invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// `--file`
    pub pom_path: PathBuf,
    /// Goals, appended last
    pub goals: Vec<String>,
    /// Flags placed before the defines
    pub flags: Vec<String>,
    /// `-D` defines
    pub defines: Vec<String>,
    /// `--settings`
    pub project_settings_file: String,
    /// `--global-settings`
    pub global_settings_file: String,
    /// `-Dmaven.repo.local`
    pub m2_path: String,
    /// Keep Maven's stdout as the result
    pub return_stdout: bool,
}

impl ExecuteOptions {
    /// Invocation of `goals` with the settings of `options`.
    #[must_use]
    pub fn for_pom(options: &EvaluateOptions, goals: &[&str], defines: Vec<String>) -> Self {
        Self {
            pom_path: options.pom_path.clone(),
            goals: goals.iter().map(|g| (*g).to_string()).collect(),
            flags: Vec::new(),
            defines,
            project_settings_file: options.project_settings_file.clone(),
            global_settings_file: options.global_settings_file.clone(),
            m2_path: options.m2_path.clone(),
            return_stdout: false,
        }
    }

    /// Command line arguments in Maven's expected order.
    #[must_use]
    pub fn parameters(&self) -> Vec<String> {
        let mut parameters = Vec::new();
        if !self.global_settings_file.is_empty() {
            parameters.push("--global-settings".to_string());
            parameters.push(self.global_settings_file.clone());
        }
        if !self.project_settings_file.is_empty() {
            parameters.push("--settings".to_string());
            parameters.push(self.project_settings_file.clone());
        }
        if !self.m2_path.is_empty() {
            parameters.push(format!("-Dmaven.repo.local={}", self.m2_path));
        }
        if !self.pom_path.as_os_str().is_empty() {
            parameters.push("--file".to_string());
            parameters.push(self.pom_path.display().to_string());
        }
        parameters.extend(self.flags.iter().cloned());
        parameters.extend(self.defines.iter().cloned());
        parameters.push(TRANSFER_LOG_DEFINE.to_string());
        parameters.push("--batch-mode".to_string());
        parameters.extend(self.goals.iter().cloned());
        parameters
    }
}

/// Bridge to a Maven installation.
pub trait MavenRunner: fmt::Debug + Send + Sync {
    /// Evaluates `expression` (e.g. `project.version`) and returns raw stdout.
    fn evaluate(&self, options: &EvaluateOptions, expression: &str)
    -> Result<String, VersioningError>;

    /// Runs Maven; returns stdout when `return_stdout` is set.
    fn execute(&self, options: &ExecuteOptions) -> Result<String, VersioningError>;
}

/// Runs the `mvn` executable through a [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct CommandMavenRunner {
    executable: String,
    runner: Arc<dyn CommandRunner>,
}

impl Default for CommandMavenRunner {
    fn default() -> Self {
        Self::new(Arc::new(LocalCommandRunner::new()))
    }
}

impl CommandMavenRunner {
    /// Maven runner on top of `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            executable: "mvn".to_string(),
            runner,
        }
    }

    /// Uses another Maven executable, e.g. `./mvnw`.
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }
}

impl MavenRunner for CommandMavenRunner {
    fn evaluate(
        &self,
        options: &EvaluateOptions,
        expression: &str,
    ) -> Result<String, VersioningError> {
        let mut defines = options.defines.clone();
        defines.push(format!("-Dexpression={expression}"));
        defines.push("-DforceStdout".to_string());
        defines.push("-q".to_string());
        let mut execute = ExecuteOptions::for_pom(options, &[EVALUATE_GOAL], defines);
        execute.return_stdout = true;
        self.execute(&execute).map_err(|e| match e {
            VersioningError::Eval { pom, message, .. } => VersioningError::Eval {
                pom,
                expression: expression.to_string(),
                message,
            },
            other => other,
        })
    }

    fn execute(&self, options: &ExecuteOptions) -> Result<String, VersioningError> {
        let output = self
            .runner
            .run(&self.executable, &options.parameters())
            .map_err(|e| VersioningError::Eval {
                pom: options.pom_path.display().to_string(),
                expression: options.goals.join(" "),
                message: e.to_string(),
            })?;
        Ok(if options.return_stdout {
            output.stdout
        } else {
            String::new()
        })
    }
}

/// Maven project adapter.
#[derive(Debug)]
pub struct Maven {
    options: EvaluateOptions,
    runner: Arc<dyn MavenRunner>,
    version: Option<String>,
}

impl Maven {
    /// Adapter for the POM in `options`.
    #[must_use]
    pub fn new(options: EvaluateOptions, runner: Arc<dyn MavenRunner>) -> Self {
        Self {
            options,
            runner,
            version: None,
        }
    }

    fn evaluate(&self, expression: &str) -> Result<String, VersioningError> {
        evaluate(self.runner.as_ref(), &self.options, expression)
    }
}

/// Evaluates an expression and rejects Maven's unresolved sentinel.
fn evaluate(
    runner: &dyn MavenRunner,
    options: &EvaluateOptions,
    expression: &str,
) -> Result<String, VersioningError> {
    tracing::debug!(pom = %options.pom_path.display(), expression, "Evaluating Maven expression");
    let output = runner.evaluate(options, expression)?;
    let value = output.trim();
    if value.starts_with(UNRESOLVED_SENTINEL) {
        return Err(VersioningError::Eval {
            pom: options.pom_path.display().to_string(),
            expression: expression.to_string(),
            message: "expression could not be resolved".to_string(),
        });
    }
    Ok(value.to_string())
}

impl VersionedArtifact for Maven {
    fn versioning_scheme(&self) -> VersioningScheme {
        VersioningScheme::Maven
    }

    fn get_version(&mut self) -> Result<String, VersioningError> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }
        let version = self.evaluate("project.version")?;
        self.version = Some(version.clone());
        Ok(version)
    }

    fn set_version(&mut self, version: &str) -> Result<(), VersioningError> {
        let group_id = self.evaluate("project.groupId")?;
        let defines = vec![
            format!("-DnewVersion={version}"),
            format!("-DgroupId={group_id}"),
            "-DartifactId=*".to_string(),
            "-DoldVersion=*".to_string(),
            "-DgenerateBackupPoms=false".to_string(),
        ];
        let options = ExecuteOptions::for_pom(&self.options, &[SET_VERSION_GOAL], defines);
        self.runner.execute(&options)?;
        tracing::info!(pom = %self.options.pom_path.display(), version, "Updated Maven project version");
        self.version = Some(version.to_string());
        Ok(())
    }

    fn get_coordinates(&mut self) -> Result<Coordinates, VersioningError> {
        Ok(Coordinates {
            group_id: self.evaluate("project.groupId")?,
            artifact_id: self.evaluate("project.artifactId")?,
            version: self.get_version()?,
            packaging: self.evaluate("project.packaging")?,
        })
    }

    fn descriptor_path(&self) -> Option<&Path> {
        Some(&self.options.pom_path)
    }
}

/// Reads coordinates from the POM, asking Maven only for unresolved values.
///
/// Literal values are taken as-is; empty values or values holding a
/// `${...}` placeholder are evaluated. The artifact id is never evaluated.
pub fn descriptor_coordinates(
    options: &EvaluateOptions,
    runner: &dyn MavenRunner,
) -> Result<Coordinates, VersioningError> {
    let pom = Pom::load(&options.pom_path)?;
    if Pom::is_unresolved(&pom.artifact_id) {
        return Err(VersioningError::field_not_found(&options.pom_path, "artifactId"));
    }
    let resolve = |value: String, expression: &str| {
        if Pom::is_unresolved(&value) {
            evaluate(runner, options, expression)
        } else {
            Ok(value)
        }
    };
    Ok(Coordinates {
        group_id: resolve(pom.group_id, "project.groupId")?,
        artifact_id: pom.artifact_id,
        version: resolve(pom.version, "project.version")?,
        packaging: resolve(pom.packaging, "project.packaging")?,
    })
}

/// Maven runner returning canned evaluation results, for tests.
#[derive(Debug, Default)]
pub struct MockMavenRunner {
    values: std::collections::HashMap<String, String>,
    calls: parking_lot::Mutex<Vec<Vec<String>>>,
}

impl MockMavenRunner {
    /// Empty mock; unknown expressions evaluate to the sentinel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the result of an expression.
    #[must_use]
    pub fn with_value(mut self, expression: &str, value: &str) -> Self {
        self.values.insert(expression.to_string(), value.to_string());
        self
    }

    /// Parameter lists of every `execute` call so far.
    #[must_use]
    pub fn executions(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

impl MavenRunner for MockMavenRunner {
    fn evaluate(
        &self,
        _options: &EvaluateOptions,
        expression: &str,
    ) -> Result<String, VersioningError> {
        Ok(self
            .values
            .get(expression)
            .cloned()
            .unwrap_or_else(|| UNRESOLVED_SENTINEL.to_string()))
    }

    fn execute(&self, options: &ExecuteOptions) -> Result<String, VersioningError> {
        self.calls.lock().push(options.parameters());
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn maven(runner: MockMavenRunner) -> (Arc<MockMavenRunner>, Maven) {
        let runner = Arc::new(runner);
        let options = EvaluateOptions::from_options("pom.xml", &Options::default());
        let maven = Maven::new(options, Arc::clone(&runner) as Arc<dyn MavenRunner>);
        (runner, maven)
    }

    #[test]
    fn test_coordinates_via_evaluator() {
        let (_, mut maven) = maven(
            MockMavenRunner::new()
                .with_value("project.groupId", "com.test.pkg")
                .with_value("project.artifactId", "analyzer")
                .with_value("project.version", "1.2.3\n")
                .with_value("project.packaging", "jar"),
        );
        assert_eq!(
            maven.get_coordinates().unwrap(),
            Coordinates {
                group_id: "com.test.pkg".into(),
                artifact_id: "analyzer".into(),
                version: "1.2.3".into(),
                packaging: "jar".into(),
            }
        );
    }

    #[test]
    fn test_sentinel_is_eval_error() {
        let (_, mut maven) = maven(MockMavenRunner::new());
        let err = maven.get_version().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Eval);
        assert!(err.to_string().contains("project.version"));
    }

    #[test]
    fn test_sentinel_after_whitespace_is_eval_error() {
        let sentinel = format!("\n  {UNRESOLVED_SENTINEL}\n");
        let (_, mut unresolved) = maven(
            MockMavenRunner::new()
                .with_value("project.groupId", "  com.test\n")
                .with_value("project.version", &sentinel),
        );
        let err = unresolved.get_version().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Eval);

        let (_, mut padded) = maven(MockMavenRunner::new().with_value("project.version", " 1.0\n"));
        assert_eq!(padded.get_version().unwrap(), "1.0");
    }

    #[test]
    fn test_set_version_invokes_versions_plugin() {
        let (runner, mut maven) = maven(
            MockMavenRunner::new().with_value("project.groupId", "com.test.pkg"),
        );
        maven.set_version("2.0.0").unwrap();
        assert_eq!(maven.get_version().unwrap(), "2.0.0");

        let executions = runner.executions();
        assert_eq!(executions.len(), 1);
        assert_eq!(
            executions[0],
            vec![
                "--file",
                "pom.xml",
                "-DnewVersion=2.0.0",
                "-DgroupId=com.test.pkg",
                "-DartifactId=*",
                "-DoldVersion=*",
                "-DgenerateBackupPoms=false",
                TRANSFER_LOG_DEFINE,
                "--batch-mode",
                SET_VERSION_GOAL,
            ]
        );
    }

    #[test]
    fn test_evaluate_parameters() {
        #[derive(Debug, Default)]
        struct Recorder(parking_lot::Mutex<Vec<String>>);
        impl CommandRunner for Recorder {
            fn run(
                &self,
                executable: &str,
                args: &[String],
            ) -> Result<crate::executor::CommandOutput, crate::executor::CommandError> {
                *self.0.lock() = std::iter::once(executable.to_string())
                    .chain(args.iter().cloned())
                    .collect();
                Ok(crate::executor::CommandOutput {
                    stdout: "1.0.0".to_string(),
                    ..Default::default()
                })
            }
        }

        let recorder = Arc::new(Recorder::default());
        let runner = CommandMavenRunner::new(Arc::clone(&recorder) as Arc<dyn CommandRunner>);
        let opts = Options {
            m2_path: ".m2".into(),
            project_settings_file: "settings.xml".into(),
            ..Options::default()
        };
        let options = EvaluateOptions::from_options("pom.xml", &opts);

        assert_eq!(runner.evaluate(&options, "project.version").unwrap(), "1.0.0");
        assert_eq!(
            *recorder.0.lock(),
            vec![
                "mvn",
                "--settings",
                "settings.xml",
                "-Dmaven.repo.local=.m2",
                "--file",
                "pom.xml",
                "-Dexpression=project.version",
                "-DforceStdout",
                "-q",
                TRANSFER_LOG_DEFINE,
                "--batch-mode",
                EVALUATE_GOAL,
            ]
        );
    }

    #[test]
    fn test_descriptor_coordinates_prefers_pom() {
        let dir = tempfile::TempDir::new().unwrap();
        let pom = dir.path().join("pom.xml");
        std::fs::write(
            &pom,
            "<project><groupId>com.test</groupId><artifactId>app</artifactId><version>${revision}</version></project>",
        )
        .unwrap();
        let runner = MockMavenRunner::new()
            .with_value("project.version", "3.1.0")
            .with_value("project.packaging", "jar")
            .with_value("project.groupId", "ignored");
        let options = EvaluateOptions::from_options(&pom, &Options::default());

        let coordinates = descriptor_coordinates(&options, &runner).unwrap();
        assert_eq!(coordinates.group_id, "com.test");
        assert_eq!(coordinates.version, "3.1.0");
        assert_eq!(coordinates.packaging, "jar");
    }
}
