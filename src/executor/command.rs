//! External command execution
//!
//! Build tools such as Maven are invoked through the [`CommandRunner`] trait
//! so tests can substitute canned output.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised while running an external command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The executable could not be started
    #[error("failed to run executable, command: '{command}', error: {message}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// OS error message.
        message: String,
    },

    /// The command exited with a non-zero code
    #[error("command '{command}' failed with exit code {code}: {stderr}")]
    Failed {
        /// Rendered command line.
        command: String,
        /// Exit code returned by the command.
        code: i32,
        /// Standard error output.
        stderr: String,
    },
}

/// Captured outcome of a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code
    pub exit_code: i32,
    /// Wall-clock duration
    pub duration: Duration,
}

impl CommandOutput {
    /// Returns true if command succeeded (exit code 0)
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs executables with arguments.
pub trait CommandRunner: fmt::Debug + Send + Sync {
    /// Runs `executable` with `args` and captures its output.
    ///
    /// A non-zero exit code is an error.
    fn run(&self, executable: &str, args: &[String]) -> Result<CommandOutput, CommandError>;
}

/// Runs commands on the local machine.
#[derive(Debug, Clone, Default)]
pub struct LocalCommandRunner {
    cwd: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl LocalCommandRunner {
    /// Runner using the current directory and environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Adds an environment variable for every command
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Renders a command line the way a shell would accept it.
#[must_use]
pub fn command_line(executable: &str, args: &[String]) -> String {
    shell_words::join(std::iter::once(executable).chain(args.iter().map(String::as_str)))
}

impl CommandRunner for LocalCommandRunner {
    fn run(&self, executable: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        let rendered = command_line(executable, args);
        tracing::debug!(command = %rendered, "Executing command");

        let mut cmd = Command::new(executable);
        cmd.args(args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(&self.env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let start = Instant::now();
        let output = cmd.output().map_err(|e| CommandError::Spawn {
            command: rendered.clone(),
            message: e.to_string(),
        })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        };
        tracing::debug!(
            command = %rendered,
            exit_code = result.exit_code,
            duration_ms = result.duration.as_millis(),
            "Command finished"
        );

        if !result.is_success() {
            return Err(CommandError::Failed {
                command: rendered,
                code: result.exit_code,
                stderr: result.stderr,
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_arguments() {
        let args = vec!["-q".to_string(), "a b".to_string()];
        assert_eq!(command_line("mvn", &args), "mvn -q 'a b'");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_stdout() {
        let runner = LocalCommandRunner::new().with_env("STEPLIB_TEST", "value");
        let output = runner
            .run("sh", &["-c".to_string(), "printf %s \"$STEPLIB_TEST\"".to_string()])
            .unwrap();
        assert_eq!(output.stdout, "value");
        assert!(output.is_success());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_error() {
        let runner = LocalCommandRunner::new();
        let err = runner
            .run("sh", &["-c".to_string(), "echo boom >&2; exit 3".to_string()])
            .unwrap_err();
        assert!(matches!(err, CommandError::Failed { code: 3, .. }));
    }

    #[test]
    fn test_missing_executable() {
        let runner = LocalCommandRunner::new();
        let err = runner.run("definitely-not-a-binary-xyz", &[]).unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
