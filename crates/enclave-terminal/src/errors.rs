//! Error mapper: turns [`EnclaveError`]s into POSIX-style report lines.
//!
//! Every command funnels failures through here, so the text users see is
//! `<command>: [<operand>: ]<message>` across the whole command set.

use enclave_types::error::EnclaveError;

use crate::interpreter::CommandResult;

/// POSIX wording for an error, without any path or operand.
///
/// Filesystem kinds map to the familiar `strerror` text; anything else is
/// passed through verbatim so unexpected failures are never swallowed.
pub fn posix_message(err: &EnclaveError) -> String {
    match err {
        EnclaveError::NotFound(_) => "No such file or directory".to_string(),
        EnclaveError::PermissionDenied(_) => "Permission denied".to_string(),
        EnclaveError::NotADirectory(_) => "Not a directory".to_string(),
        EnclaveError::IsADirectory(_) => "Is a directory".to_string(),
        EnclaveError::AlreadyExists(_) => "File exists".to_string(),
        EnclaveError::DirectoryNotEmpty(_) => "Directory not empty".to_string(),
        EnclaveError::OutsideRoot => "Permission denied (cannot access parent directory)".to_string(),
        EnclaveError::Usage(msg) | EnclaveError::Security(msg) | EnclaveError::Other(msg) => {
            msg.clone()
        },
        EnclaveError::Io(e) => e.to_string(),
        other => other.to_string(),
    }
}

/// A failed command step: the error plus the operand it concerns.
#[derive(Debug)]
pub struct Failure {
    operand: Option<String>,
    error: EnclaveError,
}

impl Failure {
    /// Failure not tied to any operand.
    pub fn new(error: EnclaveError) -> Self {
        Self {
            operand: None,
            error,
        }
    }

    /// Failure concerning `operand` as the user typed it.
    pub fn at(operand: &str, error: EnclaveError) -> Self {
        Self {
            operand: Some(operand.to_string()),
            error,
        }
    }

    /// Usage error with a fixed message.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(EnclaveError::Usage(message.into()))
    }

    pub fn error(&self) -> &EnclaveError {
        &self.error
    }

    pub fn operand(&self) -> Option<&str> {
        self.operand.as_deref()
    }

    /// Render the single report line for `command` (no trailing newline).
    pub fn line(&self, command: &str) -> String {
        let message = posix_message(&self.error);
        match &self.operand {
            Some(operand) => format!("{command}: {operand}: {message}"),
            None => format!("{command}: {message}"),
        }
    }

    /// Convert into a failed [`CommandResult`].
    pub fn into_result(self, command: &str) -> CommandResult {
        CommandResult::failure(self.line(command))
    }
}

impl From<EnclaveError> for Failure {
    fn from(error: EnclaveError) -> Self {
        Self::new(error)
    }
}

/// Attach the operand a fallible step was working on.
pub trait OperandContext<T> {
    fn at(self, operand: &str) -> Result<T, Failure>;
}

impl<T> OperandContext<T> for enclave_types::error::Result<T> {
    fn at(self, operand: &str) -> Result<T, Failure> {
        self.map_err(|e| Failure::at(operand, e))
    }
}
