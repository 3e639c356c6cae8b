//! Front-end configuration loaded from `enclave.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EnclaveError, Result};

/// Runtime configuration for an enclave shell session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnclaveConfig {
    /// Directory on disk exposed as the project root. `None` runs the shell
    /// against an in-memory project.
    pub project_dir: Option<PathBuf>,
    /// Working directory the shell starts in (virtual path).
    pub initial_cwd: String,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Default line count for `head` and `tail`.
    pub head_lines: usize,
}

impl Default for EnclaveConfig {
    fn default() -> Self {
        Self {
            project_dir: None,
            initial_cwd: "/".to_string(),
            log_filter: "warn".to_string(),
            head_lines: 10,
        }
    }
}

impl EnclaveConfig {
    /// Parse a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        if config.head_lines == 0 {
            return Err(EnclaveError::Config(
                "head_lines must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Read and parse a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EnclaveError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = EnclaveConfig::default();
        assert!(c.project_dir.is_none());
        assert_eq!(c.initial_cwd, "/");
        assert_eq!(c.log_filter, "warn");
        assert_eq!(c.head_lines, 10);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(EnclaveConfig::from_toml("").unwrap(), EnclaveConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let c = EnclaveConfig::from_toml(
            r#"
project_dir = "/srv/project"
initial_cwd = "/src"
"#,
        )
        .unwrap();
        assert_eq!(c.project_dir, Some(PathBuf::from("/srv/project")));
        assert_eq!(c.initial_cwd, "/src");
        assert_eq!(c.head_lines, 10);
    }

    #[test]
    fn zero_head_lines_rejected() {
        let err = EnclaveConfig::from_toml("head_lines = 0").unwrap_err();
        assert!(matches!(err, EnclaveError::Config(_)));
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = EnclaveConfig::from_toml("head_lines = [[").unwrap_err();
        assert!(matches!(err, EnclaveError::TomlParse(_)));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enclave.toml");
        std::fs::write(&path, "log_filter = \"debug\"\nhead_lines = 4\n").unwrap();
        let c = EnclaveConfig::load(&path).unwrap();
        assert_eq!(c.log_filter, "debug");
        assert_eq!(c.head_lines, 4);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EnclaveConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, EnclaveError::Config(_)));
    }
}
