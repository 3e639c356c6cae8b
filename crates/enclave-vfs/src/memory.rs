//! In-memory VFS implementation.
//!
//! Useful for unit tests and browser-resident projects. The entire file tree
//! lives in a `BTreeMap<String, Node>` where keys are normalized absolute
//! paths.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use enclave_types::error::{EnclaveError, Result};

use crate::path::{is_within, normalize, parent};
use crate::{EntryKind, Vfs, VfsEntry, VfsMetadata};

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, mtime_ms: u64 },
    Dir { mtime_ms: u64 },
}

impl Node {
    fn kind(&self) -> EntryKind {
        match self {
            Node::File { .. } => EntryKind::File,
            Node::Dir { .. } => EntryKind::Directory,
        }
    }

    fn size(&self) -> u64 {
        match self {
            Node::File { data, .. } => data.len() as u64,
            Node::Dir { .. } => 0,
        }
    }

    fn mtime_ms(&self) -> u64 {
        match self {
            Node::File { mtime_ms, .. } | Node::Dir { mtime_ms } => *mtime_ms,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A fully in-memory virtual file system.
#[derive(Debug)]
pub struct MemoryVfs {
    /// Map of normalized paths to file/directory nodes.
    nodes: BTreeMap<String, Node>,
}

impl MemoryVfs {
    /// Create a new in-memory VFS with only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir { mtime_ms: now_ms() });
        Self { nodes }
    }

    /// Override the modification time of an existing node.
    pub fn set_mtime(&mut self, path: &str, ms: u64) -> Result<()> {
        let path = normalize(path);
        match self.nodes.get_mut(path.as_ref()) {
            Some(Node::File { mtime_ms, .. }) | Some(Node::Dir { mtime_ms }) => {
                *mtime_ms = ms;
                Ok(())
            },
            None => Err(EnclaveError::NotFound(path.into_owned())),
        }
    }

    /// Create a directory and any missing parents. Existing directories are
    /// left alone.
    pub fn mkdir_all(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::Dir { .. }) => return Ok(()),
            Some(Node::File { .. }) => {
                return Err(EnclaveError::AlreadyExists(path.into_owned()));
            },
            None => {},
        }
        let par = parent(&path).to_string();
        if par != path.as_ref() {
            self.mkdir_all(&par)?;
        }
        self.mkdir(&path)
    }

    /// Require `path` to be an existing directory.
    fn require_dir(&self, path: &str) -> Result<()> {
        match self.nodes.get(path) {
            Some(Node::Dir { .. }) => Ok(()),
            Some(Node::File { .. }) => Err(EnclaveError::NotADirectory(path.to_string())),
            None => Err(EnclaveError::NotFound(path.to_string())),
        }
    }

    fn has_children(&self, path: &str) -> bool {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };
        self.nodes
            .range(prefix.clone()..)
            .find(|(k, _)| k.as_str() != "/")
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    fn touch_dir(&mut self, path: &str) {
        if let Some(Node::Dir { mtime_ms }) = self.nodes.get_mut(path) {
            *mtime_ms = now_ms();
        }
    }
}

impl Default for MemoryVfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs for MemoryVfs {
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>> {
        let path = normalize(path);
        self.require_dir(&path)?;

        let prefix = if path.as_ref() == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };

        // BTreeMap iteration is already sorted by key, and every child shares
        // the same prefix, so entries come out sorted by name.
        let mut entries = Vec::new();
        for (key, node) in self.nodes.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            // Direct child only: non-empty name with no `/` after the prefix.
            let rest = &key[prefix.len()..];
            if !rest.is_empty() && !rest.contains('/') {
                entries.push(VfsEntry {
                    name: rest.to_string(),
                    kind: node.kind(),
                    size: node.size(),
                    mtime_ms: Some(node.mtime_ms()),
                });
            }
        }
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir { .. }) => Err(EnclaveError::IsADirectory(path.into_owned())),
            None => Err(EnclaveError::NotFound(path.into_owned())),
        }
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let path = normalize(path);
        if let Some(Node::Dir { .. }) = self.nodes.get(path.as_ref()) {
            return Err(EnclaveError::IsADirectory(path.into_owned()));
        }
        let par = parent(&path).to_string();
        self.require_dir(&par)?;
        self.nodes.insert(
            path.into_owned(),
            Node::File {
                data: data.to_vec(),
                mtime_ms: now_ms(),
            },
        );
        self.touch_dir(&par);
        Ok(())
    }

    fn stat(&self, path: &str) -> Result<VfsMetadata> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(node) => Ok(VfsMetadata {
                kind: node.kind(),
                size: node.size(),
                mtime_ms: Some(node.mtime_ms()),
            }),
            None => Err(EnclaveError::NotFound(path.into_owned())),
        }
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        if self.nodes.contains_key(path.as_ref()) {
            return Err(EnclaveError::AlreadyExists(path.into_owned()));
        }
        let par = parent(&path).to_string();
        self.require_dir(&par)?;
        self.nodes
            .insert(path.into_owned(), Node::Dir { mtime_ms: now_ms() });
        self.touch_dir(&par);
        Ok(())
    }

    fn unlink(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::File { .. }) => {},
            Some(Node::Dir { .. }) => return Err(EnclaveError::IsADirectory(path.into_owned())),
            None => return Err(EnclaveError::NotFound(path.into_owned())),
        }
        self.nodes.remove(path.as_ref());
        self.touch_dir(parent(&path));
        Ok(())
    }

    fn rmdir(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        if path.as_ref() == "/" {
            return Err(EnclaveError::PermissionDenied(path.into_owned()));
        }
        self.require_dir(&path)?;
        if self.has_children(&path) {
            return Err(EnclaveError::DirectoryNotEmpty(path.into_owned()));
        }
        self.nodes.remove(path.as_ref());
        self.touch_dir(parent(&path));
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let from = normalize(from).into_owned();
        let to = normalize(to).into_owned();
        if from == "/" {
            return Err(EnclaveError::PermissionDenied(from));
        }
        let Some(node) = self.nodes.get(&from).cloned() else {
            return Err(EnclaveError::NotFound(from));
        };
        if self.nodes.contains_key(&to) {
            return Err(EnclaveError::AlreadyExists(to));
        }
        let to_parent = parent(&to).to_string();
        self.require_dir(&to_parent)?;
        if matches!(node, Node::Dir { .. }) && is_within(&from, &to) {
            return Err(EnclaveError::Other(format!(
                "cannot move '{from}' to a subdirectory of itself, '{to}'"
            )));
        }

        // Re-key the node and, for directories, every descendant.
        let prefix = format!("{from}/");
        let moved: Vec<String> = self
            .nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for old in moved {
            if let Some(child) = self.nodes.remove(&old) {
                let new_key = format!("{to}{}", &old[from.len()..]);
                self.nodes.insert(new_key, child);
            }
        }
        self.nodes.remove(&from);
        self.nodes.insert(to, node);
        self.touch_dir(parent(&from));
        self.touch_dir(&to_parent);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        let path = normalize(path);
        self.nodes.contains_key(path.as_ref())
    }
}
