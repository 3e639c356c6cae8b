//! Virtual file system abstraction.
//!
//! Every path handed to a [`Vfs`] is a virtual absolute path rooted at the
//! project root (`/`). Backends never expose anything above that root.

mod memory;
pub mod path;
mod real;
mod walk;

pub use memory::MemoryVfs;
pub use real::RealVfs;
pub use walk::{WalkEntry, walk};

use enclave_types::error::Result;

/// Kind of a filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One child returned by [`Vfs::readdir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEntry {
    /// Entry name (no directory component).
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time in milliseconds since the Unix epoch.
    pub mtime_ms: Option<u64>,
}

impl VfsEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Result of [`Vfs::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsMetadata {
    pub kind: EntryKind,
    pub size: u64,
    pub mtime_ms: Option<u64>,
}

impl VfsMetadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Filesystem capability consumed by the shell.
pub trait Vfs {
    /// List the direct children of a directory, sorted by name.
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>>;

    /// Read a whole file.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Write (create or truncate) a file. The parent directory must exist.
    fn write(&mut self, path: &str, data: &[u8]) -> Result<()>;

    fn stat(&self, path: &str) -> Result<VfsMetadata>;

    /// Create one directory. The parent must exist and the target must not.
    fn mkdir(&mut self, path: &str) -> Result<()>;

    /// Remove a file.
    fn unlink(&mut self, path: &str) -> Result<()>;

    /// Remove an empty directory.
    fn rmdir(&mut self, path: &str) -> Result<()>;

    /// Move a file or directory. Never overwrites an existing target.
    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Read a file as text, replacing invalid UTF-8.
    fn read_to_string(&self, path: &str) -> Result<String> {
        let data = self.read(path)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    fn exists(&self, path: &str) -> bool {
        self.stat(path).is_ok()
    }
}
