//! Built-in commands: navigation (cd, pwd), echo, and which.
//!
//! File and text commands live in `file_commands` and `text_commands`.

use enclave_types::config::EnclaveConfig;
use enclave_types::error::EnclaveError;

use crate::errors::{Failure, OperandContext};
use crate::flags::split_flags;
use crate::guard::resolve;
use crate::interpreter::{Command, CommandRegistry, CommandResult, Environment};

/// Register all built-in commands into a registry.
pub fn register_builtins(reg: &mut CommandRegistry, config: &EnclaveConfig) {
    reg.register(Box::new(CdCmd));
    reg.register(Box::new(PwdCmd));
    reg.register(Box::new(EchoCmd));
    reg.register(Box::new(WhichCmd));
    crate::file_commands::register_file_commands(reg);
    crate::text_commands::register_text_commands(reg, config.head_lines);
}

// ---------------------------------------------------------------------------
// cd
// ---------------------------------------------------------------------------

struct CdCmd;
impl Command for CdCmd {
    fn name(&self) -> &str {
        "cd"
    }
    fn description(&self) -> &str {
        "Change working directory"
    }
    fn usage(&self) -> &str {
        "cd [dir]"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandResult, Failure> {
        let target = match args {
            [] => return Ok(CommandResult::default()),
            [target] => *target,
            _ => return Err(Failure::usage("too many arguments")),
        };
        let path = resolve(target, env.cwd).at(target)?;
        let meta = env.vfs.stat(&path).at(target)?;
        if !meta.is_dir() {
            return Err(Failure::at(target, EnclaveError::NotADirectory(path)));
        }
        Ok(CommandResult::change_dir(path))
    }
}

// ---------------------------------------------------------------------------
// pwd
// ---------------------------------------------------------------------------

struct PwdCmd;
impl Command for PwdCmd {
    fn name(&self) -> &str {
        "pwd"
    }
    fn description(&self) -> &str {
        "Print working directory"
    }
    fn usage(&self) -> &str {
        "pwd"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandResult, Failure> {
        if !args.is_empty() {
            return Err(Failure::usage("too many arguments"));
        }
        Ok(CommandResult::success(format!("{}\n", env.cwd)))
    }
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoCmd;
impl Command for EchoCmd {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Print text"
    }
    fn usage(&self) -> &str {
        "echo [text...]"
    }
    fn run(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandResult, Failure> {
        Ok(CommandResult::success(format!("{}\n", args.join(" "))))
    }
}

// ---------------------------------------------------------------------------
// which
// ---------------------------------------------------------------------------

/// Directory every command pretends to be installed in.
const BIN_DIR: &str = "/usr/bin";

struct WhichCmd;
impl Command for WhichCmd {
    fn name(&self) -> &str {
        "which"
    }
    fn description(&self) -> &str {
        "Locate a command"
    }
    fn usage(&self) -> &str {
        "which <command...>"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandResult, Failure> {
        let parsed = split_flags(args);
        let mut result = CommandResult::default();
        if parsed.operands.is_empty() {
            result.exit_code = 1;
            return Ok(result);
        }
        for name in parsed.operands {
            if env.registry.contains(name) {
                result.stdout.push_str(&format!("{BIN_DIR}/{name}\n"));
            } else {
                result.push_error(&format!("which: no {name} in ({BIN_DIR})"));
            }
        }
        Ok(result)
    }
}
