//! Command execution layer
//!
//! Runs the external build tools the versioning engine depends on.

mod command;

pub use command::{CommandError, CommandOutput, CommandRunner, LocalCommandRunner, command_line};
