//! Path resolver and sandbox guard.
//!
//! Every command that takes a path operand resolves it here, so the project
//! root is enforced uniformly: absolute addressing is refused outright and
//! `..` never climbs above `/`.

use enclave_types::error::{EnclaveError, Result};
use enclave_vfs::path::{is_absolute_pattern, parent};

/// Message reported for host-style absolute operands.
pub const ABSOLUTE_PATH_MESSAGE: &str = "absolute paths are not supported";

/// Resolve `candidate` against `cwd` into a normalized virtual path.
///
/// `cwd` must already be a normalized virtual path inside the root.
pub fn resolve(candidate: &str, cwd: &str) -> Result<String> {
    if is_absolute_pattern(candidate) {
        log::warn!("rejected absolute path operand {candidate:?}");
        return Err(EnclaveError::Security(ABSOLUTE_PATH_MESSAGE.to_string()));
    }
    if candidate.is_empty() {
        return Err(EnclaveError::NotFound(String::new()));
    }
    if candidate == "." {
        return Ok(cwd.to_string());
    }
    if candidate == ".." {
        let up = parent(cwd);
        if up == cwd {
            log::warn!("rejected attempt to leave the project root from {cwd}");
            return Err(EnclaveError::OutsideRoot);
        }
        return Ok(up.to_string());
    }

    let mut parts: Vec<&str> = cwd.split('/').filter(|c| !c.is_empty()).collect();
    for component in candidate.split('/') {
        match component {
            "" | "." => {},
            ".." => {
                if parts.pop().is_none() {
                    log::warn!("rejected {candidate:?}: resolves above the project root");
                    return Err(EnclaveError::OutsideRoot);
                }
            },
            other => parts.push(other),
        }
    }

    let resolved = if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    };
    log::trace!("resolve {candidate:?} in {cwd} -> {resolved}");
    Ok(resolved)
}

/// Resolve a configured starting directory, given as a virtual path that
/// may or may not carry a leading `/`.
pub fn resolve_start(path: &str) -> Result<String> {
    let relative = path.trim_start_matches('/');
    if relative.is_empty() {
        return Ok("/".to_string());
    }
    resolve(relative, "/")
}
