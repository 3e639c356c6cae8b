//! Command trait, registry, and dispatch logic.
//!
//! A line is tokenized with POSIX-style quoting, the first token names the
//! command, and the rest are handed to it as argv. No variable, glob, or
//! history expansion happens here.

use std::collections::BTreeMap;

use enclave_vfs::Vfs;
use serde::Serialize;

use crate::errors::Failure;

/// Outcome of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// 0 on success, nonzero on failure.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Set only by directory-changing commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_cwd: Option<String>,
    /// `(stdout length, stderr offset)` at each `push_error`, so `render`
    /// can replay the two streams in the order they were written.
    #[serde(skip)]
    error_marks: Vec<(usize, usize)>,
}

impl CommandResult {
    /// Successful result with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// Failed result (exit 1) with one stderr line.
    pub fn failure(line: impl Into<String>) -> Self {
        let mut result = Self::default();
        result.push_error(&line.into());
        result
    }

    /// Successful result asking the dispatcher to switch directories.
    pub fn change_dir(path: String) -> Self {
        Self {
            new_cwd: Some(path),
            ..Self::default()
        }
    }

    /// Append a stderr line and mark the result failed, keeping any output
    /// already produced.
    pub fn push_error(&mut self, line: &str) {
        self.error_marks.push((self.stdout.len(), self.stderr.len()));
        self.stderr.push_str(line);
        if !line.ends_with('\n') {
            self.stderr.push('\n');
        }
        if self.exit_code == 0 {
            self.exit_code = 1;
        }
    }

    /// Append a failure rendered for `command`.
    pub fn push_failure(&mut self, command: &str, failure: &Failure) {
        self.push_error(&failure.line(command));
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Both streams interleaved in write order, for terminal-style display.
    /// Stderr written without `push_error` follows the stdout written
    /// before it.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len());
        let (mut out_pos, mut err_pos) = (0, 0);
        for (i, &(out_at, _)) in self.error_marks.iter().enumerate() {
            let err_end = self
                .error_marks
                .get(i + 1)
                .map_or(self.stderr.len(), |&(_, next)| next);
            let out_at = out_at.max(out_pos);
            out.push_str(self.stdout.get(out_pos..out_at).unwrap_or_default());
            push_segment(&mut out, self.stderr.get(err_pos..err_end).unwrap_or_default());
            out_pos = out_at;
            err_pos = err_end.max(err_pos);
        }
        out.push_str(self.stdout.get(out_pos..).unwrap_or_default());
        push_segment(&mut out, self.stderr.get(err_pos..).unwrap_or_default());
        out
    }
}

/// Append `text` on a fresh line.
fn push_segment(out: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(text);
}

/// Per-invocation environment passed to every command.
pub struct Environment<'a> {
    /// Current working directory (normalized virtual path).
    pub cwd: &'a str,
    /// The virtual file system.
    pub vfs: &'a mut dyn Vfs,
    /// Piped input for commands that accept it.
    pub stdin: Option<&'a str>,
    /// Read-only view of the registry, for lookups such as `which`.
    pub registry: &'a CommandRegistry,
}

/// A single executable command.
pub trait Command {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// One-line description for discovery.
    fn description(&self) -> &str;

    /// Usage string (e.g. "ls \[-la\] \[path...\]").
    fn usage(&self) -> &str;

    /// Run the command. Failures carry the operand they refer to.
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandResult, Failure>;

    /// Run the command and render any failure into the result. Nothing
    /// escapes this boundary.
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> CommandResult {
        self.run(args, env)
            .unwrap_or_else(|failure| failure.into_result(self.name()))
    }
}

/// Static description of a registered command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    pub usage: String,
}

/// Registry of available commands with dispatch.
///
/// Built once, then only read: the shell never hands out mutable access.
pub struct CommandRegistry {
    commands: BTreeMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Create an empty command registry.
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in command with default settings.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        crate::register_builtins(&mut reg, &enclave_types::config::EnclaveConfig::default());
        reg
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Descriptors of every command, sorted by name.
    pub fn list_commands(&self) -> Vec<CommandDescriptor> {
        self.commands
            .values()
            .map(|c| CommandDescriptor {
                name: c.name().to_string(),
                description: c.description().to_string(),
                usage: c.usage().to_string(),
            })
            .collect()
    }

    /// Tokenize and execute one line against `cwd`.
    ///
    /// The caller owns the working directory and applies `new_cwd` itself.
    pub fn dispatch(
        &self,
        line: &str,
        cwd: &str,
        vfs: &mut dyn Vfs,
        stdin: Option<&str>,
    ) -> CommandResult {
        let tokens = tokenize(line);
        let Some((name, rest)) = tokens.split_first() else {
            return CommandResult::default();
        };
        let args: Vec<&str> = rest.iter().map(|s| s.as_str()).collect();

        match self.commands.get(name.as_str()) {
            Some(cmd) => {
                log::debug!("dispatch {name} {args:?} (cwd {cwd})");
                let mut env = Environment {
                    cwd,
                    vfs,
                    stdin,
                    registry: self,
                };
                let result = cmd.execute(&args, &mut env);
                if !result.is_success() {
                    log::debug!("{name} exited with {}", result.exit_code);
                }
                result
            },
            None => {
                log::warn!("unknown command: {name}");
                let mut result = CommandResult::failure(format!("{name}: command not found"));
                result.exit_code = 127;
                result
            },
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tokenizer: handles single quotes, double quotes, and backslash escapes.
// ---------------------------------------------------------------------------

/// Tokenize a command line respecting quotes and backslash escapes.
///
/// - Single-quoted strings preserve all characters literally.
/// - Inside double quotes a backslash escapes only `"` and `\`.
/// - Outside quotes a backslash escapes whitespace, quotes, and itself; any
///   other backslash is kept literally so host-style paths such as `C:\x`
///   reach the path guard intact.
/// - Quotes may open mid-word (`a'b c'd` is one token) and an empty quoted
///   string is an empty token.
/// - An unterminated quote is closed at end of input.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = input.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = chars.next() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
        } else if in_double {
            if ch == '"' {
                in_double = false;
            } else if ch == '\\'
                && let Some(&next) = chars.peek()
                && matches!(next, '"' | '\\')
            {
                current.push(next);
                chars.next();
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '\'' => {
                    in_single = true;
                    in_token = true;
                },
                '"' => {
                    in_double = true;
                    in_token = true;
                },
                '\\' => {
                    in_token = true;
                    match chars.peek() {
                        Some(&next) if next.is_whitespace() || matches!(next, '\'' | '"' | '\\') => {
                            current.push(next);
                            chars.next();
                        },
                        _ => current.push('\\'),
                    }
                },
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                },
                _ => {
                    current.push(ch);
                    in_token = true;
                },
            }
        }
    }

    if in_single || in_double {
        log::debug!("unterminated quote in {input:?}; closing at end of input");
    }
    if in_token {
        tokens.push(current);
    }

    tokens
}
