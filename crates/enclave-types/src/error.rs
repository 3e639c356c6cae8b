//! Error types for enclave.

use std::io;

/// Errors produced by the enclave virtual filesystem and command set.
///
/// The filesystem variants carry the virtual path the failure refers to.
/// Commands never show that path to the user; they report the operand the
/// user typed instead (see the terminal crate's error mapper).
#[derive(Debug, thiserror::Error)]
pub enum EnclaveError {
    /// Wrong operand count or shape.
    #[error("{0}")]
    Usage(String),

    /// Operand rejected by the path guard (absolute addressing).
    #[error("{0}")]
    Security(String),

    /// Resolution would leave the project root.
    #[error("cannot access parent directory")]
    OutsideRoot,

    #[error("{0}: No such file or directory")]
    NotFound(String),

    #[error("{0}: Permission denied")]
    PermissionDenied(String),

    #[error("{0}: Not a directory")]
    NotADirectory(String),

    #[error("{0}: Is a directory")]
    IsADirectory(String),

    #[error("{0}: File exists")]
    AlreadyExists(String),

    #[error("{0}: Directory not empty")]
    DirectoryNotEmpty(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Anything unmapped, preserved verbatim.
    #[error("{0}")]
    Other(String),
}

impl EnclaveError {
    /// Classify an I/O error raised while touching `path`.
    ///
    /// Kinds without a filesystem counterpart are kept as [`EnclaveError::Io`].
    pub fn from_io(err: io::Error, path: &str) -> Self {
        let path = path.to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            io::ErrorKind::NotADirectory => Self::NotADirectory(path),
            io::ErrorKind::IsADirectory => Self::IsADirectory(path),
            io::ErrorKind::DirectoryNotEmpty => Self::DirectoryNotEmpty(path),
            _ => Self::Io(err),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, EnclaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let e = EnclaveError::NotFound("/a.txt".into());
        assert_eq!(format!("{e}"), "/a.txt: No such file or directory");
    }

    #[test]
    fn permission_display() {
        let e = EnclaveError::PermissionDenied("/secret".into());
        assert_eq!(format!("{e}"), "/secret: Permission denied");
    }

    #[test]
    fn directory_kinds_display() {
        assert_eq!(
            format!("{}", EnclaveError::NotADirectory("/f".into())),
            "/f: Not a directory"
        );
        assert_eq!(
            format!("{}", EnclaveError::IsADirectory("/d".into())),
            "/d: Is a directory"
        );
        assert_eq!(
            format!("{}", EnclaveError::DirectoryNotEmpty("/d".into())),
            "/d: Directory not empty"
        );
    }

    #[test]
    fn exists_display() {
        let e = EnclaveError::AlreadyExists("/b.txt".into());
        assert_eq!(format!("{e}"), "/b.txt: File exists");
    }

    #[test]
    fn outside_root_display() {
        assert_eq!(
            format!("{}", EnclaveError::OutsideRoot),
            "cannot access parent directory"
        );
    }

    #[test]
    fn usage_and_other_are_verbatim() {
        assert_eq!(format!("{}", EnclaveError::Usage("missing operand".into())), "missing operand");
        assert_eq!(format!("{}", EnclaveError::Other("disk on fire".into())), "disk on fire");
    }

    #[test]
    fn from_io_classifies_kinds() {
        let e = EnclaveError::from_io(io::Error::new(io::ErrorKind::NotFound, "gone"), "/x");
        assert!(matches!(e, EnclaveError::NotFound(ref p) if p == "/x"));

        let e = EnclaveError::from_io(
            io::Error::new(io::ErrorKind::PermissionDenied, "no"),
            "/y",
        );
        assert!(matches!(e, EnclaveError::PermissionDenied(_)));

        let e = EnclaveError::from_io(
            io::Error::new(io::ErrorKind::AlreadyExists, "dup"),
            "/z",
        );
        assert!(matches!(e, EnclaveError::AlreadyExists(_)));
    }

    #[test]
    fn from_io_keeps_unclassified_kinds() {
        let e = EnclaveError::from_io(io::Error::other("weird"), "/w");
        match e {
            EnclaveError::Io(inner) => assert_eq!(inner.to_string(), "weird"),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn toml_error_from_conversion() {
        let toml_err = toml::from_str::<toml::Value>("this is [[[not valid toml").unwrap_err();
        let e: EnclaveError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
    }

    #[test]
    fn result_alias_err() {
        let r: Result<i32> = Err(EnclaveError::NotFound("/oops".into()));
        assert!(r.is_err());
    }
}
