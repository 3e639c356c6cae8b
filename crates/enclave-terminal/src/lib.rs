//! Command interpreter and command set.
//!
//! The terminal is a registry-based dispatch system. Commands implement the
//! `Command` trait and are registered by name. The interpreter tokenizes
//! input lines, resolves the command name, and dispatches `execute()`
//! against a virtual filesystem, never letting a path escape the project
//! root.

mod commands;
pub mod errors;
mod file_commands;
mod flags;
pub mod guard;
mod interpreter;
mod shell;
mod text_commands;

/// Register every built-in command into a registry.
pub use commands::register_builtins;
/// Failure carried out of a command, rendered by the error mapper.
pub use errors::Failure;
/// A single executable command trait.
pub use interpreter::Command;
/// Name, description and usage of a registered command.
pub use interpreter::CommandDescriptor;
/// Registry of available commands with dispatch.
pub use interpreter::CommandRegistry;
/// Exit code plus captured stdout/stderr of one invocation.
pub use interpreter::CommandResult;
/// Per-invocation environment passed to every command.
pub use interpreter::Environment;
/// Split a command line into argv-style tokens.
pub use interpreter::tokenize;
/// Dispatcher owning the registry, filesystem and working directory.
pub use shell::Shell;
