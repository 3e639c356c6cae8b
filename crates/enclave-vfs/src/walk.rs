//! Depth-first directory traversal built on [`Vfs::readdir`].

use enclave_types::error::Result;

use crate::path::join;
use crate::{EntryKind, Vfs};

/// One node visited by [`walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Absolute virtual path.
    pub path: String,
    pub kind: EntryKind,
    /// Distance from the walk root (the root itself is depth 0).
    pub depth: usize,
}

/// Visit `root` and everything beneath it in depth-first pre-order, children
/// in name order.
///
/// Reversing the result yields every directory after all of its
/// descendants, which is the order removal needs.
pub fn walk(vfs: &dyn Vfs, root: &str) -> Result<Vec<WalkEntry>> {
    let meta = vfs.stat(root)?;
    let mut out = vec![WalkEntry {
        path: root.to_string(),
        kind: meta.kind,
        depth: 0,
    }];
    if meta.is_dir() {
        walk_dir(vfs, root, 1, &mut out)?;
    }
    Ok(out)
}

fn walk_dir(vfs: &dyn Vfs, dir: &str, depth: usize, out: &mut Vec<WalkEntry>) -> Result<()> {
    for entry in vfs.readdir(dir)? {
        let path = join(dir, &entry.name);
        out.push(WalkEntry {
            path: path.clone(),
            kind: entry.kind,
            depth,
        });
        if entry.is_dir() {
            walk_dir(vfs, &path, depth + 1, out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryVfs;

    #[test]
    fn walk_file_is_single_entry() {
        let mut vfs = MemoryVfs::new();
        vfs.write("/f.txt", b"x").unwrap();
        let entries = walk(&vfs, "/f.txt").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::File);
    }

    #[test]
    fn walk_is_preorder() {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir_all("/p/a/deep").unwrap();
        vfs.write("/p/a/deep/leaf", b"1").unwrap();
        vfs.write("/p/b.txt", b"2").unwrap();
        let paths: Vec<String> = walk(&vfs, "/p")
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, vec!["/p", "/p/a", "/p/a/deep", "/p/a/deep/leaf", "/p/b.txt"]);
    }

    #[test]
    fn walk_depths() {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir_all("/a/b").unwrap();
        let depths: Vec<usize> = walk(&vfs, "/a").unwrap().iter().map(|e| e.depth).collect();
        assert_eq!(depths, vec![0, 1]);
    }

    #[test]
    fn walk_missing_root_fails() {
        let vfs = MemoryVfs::new();
        assert!(walk(&vfs, "/ghost").is_err());
    }
}
