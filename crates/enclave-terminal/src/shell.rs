//! Stateful front end: one registry, one filesystem, one working directory.

use enclave_types::config::EnclaveConfig;
use enclave_vfs::Vfs;

use crate::guard::resolve_start;
use crate::interpreter::{CommandDescriptor, CommandRegistry, CommandResult};

/// A shell session over a virtual filesystem.
///
/// The working directory changes only when a command succeeds and reports a
/// new one.
pub struct Shell {
    registry: CommandRegistry,
    vfs: Box<dyn Vfs>,
    cwd: String,
}

impl Shell {
    /// Shell with default settings, starting at the project root.
    pub fn new(vfs: Box<dyn Vfs>) -> Self {
        Self::with_config(vfs, &EnclaveConfig::default())
    }

    /// Shell configured from `config`. An unusable `initial_cwd` falls back
    /// to the root.
    pub fn with_config(vfs: Box<dyn Vfs>, config: &EnclaveConfig) -> Self {
        let mut registry = CommandRegistry::new();
        crate::register_builtins(&mut registry, config);

        let cwd = match resolve_start(&config.initial_cwd) {
            Ok(path) if vfs.stat(&path).is_ok_and(|m| m.is_dir()) => path,
            _ => {
                log::warn!(
                    "initial_cwd {:?} is not a directory in the project; starting at /",
                    config.initial_cwd
                );
                "/".to_string()
            },
        };
        log::debug!("shell ready with {} commands, cwd {cwd}", registry.len());
        Self { registry, vfs, cwd }
    }

    /// Execute one command line.
    pub fn execute(&mut self, line: &str) -> CommandResult {
        self.run_line(line, None)
    }

    /// Execute one command line with piped input.
    pub fn execute_with_input(&mut self, line: &str, stdin: &str) -> CommandResult {
        self.run_line(line, Some(stdin))
    }

    fn run_line(&mut self, line: &str, stdin: Option<&str>) -> CommandResult {
        let result = self
            .registry
            .dispatch(line, &self.cwd, self.vfs.as_mut(), stdin);
        if result.is_success()
            && let Some(new_cwd) = &result.new_cwd
        {
            log::debug!("cwd {} -> {new_cwd}", self.cwd);
            self.cwd = new_cwd.clone();
        }
        result
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn list_commands(&self) -> Vec<CommandDescriptor> {
        self.registry.list_commands()
    }

    pub fn vfs(&self) -> &dyn Vfs {
        self.vfs.as_ref()
    }

    pub fn vfs_mut(&mut self) -> &mut dyn Vfs {
        self.vfs.as_mut()
    }
}
