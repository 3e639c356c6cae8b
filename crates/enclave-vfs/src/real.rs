//! Disk-backed VFS rooted at a project directory.
//!
//! Virtual `/a/b` maps to `<root>/a/b`. Paths containing `.` or `..`
//! components are refused outright, and so is any path that passes through
//! a symlink below the root, so nothing outside the root is reachable
//! through this backend even if a caller skips the shell's own path guard.
//! Symlinks are left out of directory listings.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use enclave_types::error::{EnclaveError, Result};

use crate::path::{is_within, normalize, parent};
use crate::{EntryKind, Vfs, VfsEntry, VfsMetadata};

/// A VFS backed by a real directory on the host.
#[derive(Debug)]
pub struct RealVfs {
    root: PathBuf,
}

impl RealVfs {
    /// Open `root` as the project root. It must be an existing directory.
    /// Links in `root` itself are resolved once here.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let root = fs::canonicalize(&root).map_err(|e| EnclaveError::from_io(e, "/"))?;
        let meta = fs::metadata(&root).map_err(|e| EnclaveError::from_io(e, "/"))?;
        if !meta.is_dir() {
            return Err(EnclaveError::NotADirectory(root.display().to_string()));
        }
        log::info!("RealVfs rooted at {}", root.display());
        Ok(Self { root })
    }

    /// Host directory backing the virtual root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_path(&self, virtual_path: &str) -> Result<PathBuf> {
        let mut host = self.root.clone();
        // Only existing components can be links.
        let mut existing = true;
        for component in virtual_path.split('/').filter(|c| !c.is_empty()) {
            if component == "." || component == ".." || component.contains('\\') {
                log::warn!("RealVfs refused path component {component:?} in {virtual_path}");
                return Err(EnclaveError::PermissionDenied(virtual_path.to_string()));
            }
            host.push(component);
            if !existing {
                continue;
            }
            match fs::symlink_metadata(&host) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    log::warn!("RealVfs refused symlink {} in {virtual_path}", host.display());
                    return Err(EnclaveError::PermissionDenied(virtual_path.to_string()));
                },
                Ok(_) => {},
                Err(_) => existing = false,
            }
        }
        Ok(host)
    }

    fn metadata(&self, path: &str) -> Result<fs::Metadata> {
        let host = self.host_path(path)?;
        fs::metadata(host).map_err(|e| EnclaveError::from_io(e, path))
    }

    fn require_dir(&self, path: &str) -> Result<()> {
        if self.metadata(path)?.is_dir() {
            Ok(())
        } else {
            Err(EnclaveError::NotADirectory(path.to_string()))
        }
    }
}

fn kind_of(meta: &fs::Metadata) -> EntryKind {
    if meta.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

fn mtime_of(meta: &fs::Metadata) -> Option<u64> {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
}

fn size_of(meta: &fs::Metadata) -> u64 {
    if meta.is_dir() { 0 } else { meta.len() }
}

impl Vfs for RealVfs {
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>> {
        let path = normalize(path);
        self.require_dir(&path)?;
        let host = self.host_path(&path)?;
        let mut entries = Vec::new();
        for dirent in fs::read_dir(host).map_err(|e| EnclaveError::from_io(e, &path))? {
            let dirent = dirent.map_err(|e| EnclaveError::from_io(e, &path))?;
            let meta = dirent
                .metadata()
                .map_err(|e| EnclaveError::from_io(e, &path))?;
            if meta.file_type().is_symlink() {
                log::debug!("skipping symlink {:?} in {path}", dirent.file_name());
                continue;
            }
            entries.push(VfsEntry {
                name: dirent.file_name().to_string_lossy().into_owned(),
                kind: kind_of(&meta),
                size: size_of(&meta),
                mtime_ms: mtime_of(&meta),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize(path);
        if self.metadata(&path)?.is_dir() {
            return Err(EnclaveError::IsADirectory(path.into_owned()));
        }
        fs::read(self.host_path(&path)?).map_err(|e| EnclaveError::from_io(e, &path))
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let path = normalize(path);
        if let Ok(meta) = self.metadata(&path)
            && meta.is_dir()
        {
            return Err(EnclaveError::IsADirectory(path.into_owned()));
        }
        self.require_dir(parent(&path))?;
        fs::write(self.host_path(&path)?, data).map_err(|e| EnclaveError::from_io(e, &path))
    }

    fn stat(&self, path: &str) -> Result<VfsMetadata> {
        let path = normalize(path);
        let meta = self.metadata(&path)?;
        Ok(VfsMetadata {
            kind: kind_of(&meta),
            size: size_of(&meta),
            mtime_ms: mtime_of(&meta),
        })
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        if self.metadata(&path).is_ok() {
            return Err(EnclaveError::AlreadyExists(path.into_owned()));
        }
        self.require_dir(parent(&path))?;
        fs::create_dir(self.host_path(&path)?).map_err(|e| EnclaveError::from_io(e, &path))
    }

    fn unlink(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        if self.metadata(&path)?.is_dir() {
            return Err(EnclaveError::IsADirectory(path.into_owned()));
        }
        fs::remove_file(self.host_path(&path)?).map_err(|e| EnclaveError::from_io(e, &path))
    }

    fn rmdir(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        if path.as_ref() == "/" {
            return Err(EnclaveError::PermissionDenied(path.into_owned()));
        }
        self.require_dir(&path)?;
        if !self.readdir(&path)?.is_empty() {
            return Err(EnclaveError::DirectoryNotEmpty(path.into_owned()));
        }
        fs::remove_dir(self.host_path(&path)?).map_err(|e| EnclaveError::from_io(e, &path))
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let from = normalize(from);
        let to = normalize(to);
        if from.as_ref() == "/" {
            return Err(EnclaveError::PermissionDenied(from.into_owned()));
        }
        let meta = self.metadata(&from)?;
        if self.metadata(&to).is_ok() {
            return Err(EnclaveError::AlreadyExists(to.into_owned()));
        }
        self.require_dir(parent(&to))?;
        if meta.is_dir() && is_within(&from, &to) {
            return Err(EnclaveError::Other(format!(
                "cannot move '{from}' to a subdirectory of itself, '{to}'"
            )));
        }
        fs::rename(self.host_path(&from)?, self.host_path(&to)?)
            .map_err(|e| EnclaveError::from_io(e, &from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, RealVfs) {
        let dir = tempfile::tempdir().unwrap();
        let vfs = RealVfs::new(dir.path()).unwrap();
        (dir, vfs)
    }

    #[test]
    fn new_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();
        assert!(RealVfs::new(&file).is_err());
        assert!(RealVfs::new(dir.path().join("missing")).is_err());
    }

    #[test]
    fn write_read_roundtrip() {
        let (dir, mut vfs) = setup();
        vfs.write("/hello.txt", b"hi there").unwrap();
        assert_eq!(vfs.read("/hello.txt").unwrap(), b"hi there");
        assert_eq!(fs::read(dir.path().join("hello.txt")).unwrap(), b"hi there");
    }

    #[test]
    fn readdir_sorted_with_kinds() {
        let (_dir, mut vfs) = setup();
        vfs.mkdir("/zeta").unwrap();
        vfs.write("/alpha.txt", b"abc").unwrap();
        let entries = vfs.readdir("/").unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.txt", "zeta"]);
        assert!(entries[0].is_file());
        assert_eq!(entries[0].size, 3);
        assert!(entries[1].is_dir());
    }

    #[test]
    fn dotdot_component_refused() {
        let (_dir, vfs) = setup();
        assert!(matches!(
            vfs.read("/../etc/passwd"),
            Err(EnclaveError::PermissionDenied(_))
        ));
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let (_dir, vfs) = setup();
        assert!(matches!(vfs.read("/nope"), Err(EnclaveError::NotFound(_))));
        assert!(matches!(vfs.stat("/nope"), Err(EnclaveError::NotFound(_))));
    }

    #[test]
    fn directory_errors() {
        let (_dir, mut vfs) = setup();
        vfs.mkdir("/d").unwrap();
        vfs.write("/d/f", b"x").unwrap();
        assert!(matches!(vfs.read("/d"), Err(EnclaveError::IsADirectory(_))));
        assert!(matches!(vfs.unlink("/d"), Err(EnclaveError::IsADirectory(_))));
        assert!(matches!(vfs.rmdir("/d"), Err(EnclaveError::DirectoryNotEmpty(_))));
        assert!(matches!(vfs.readdir("/d/f"), Err(EnclaveError::NotADirectory(_))));
        assert!(matches!(vfs.mkdir("/d"), Err(EnclaveError::AlreadyExists(_))));
    }

    #[test]
    fn rename_refuses_overwrite() {
        let (_dir, mut vfs) = setup();
        vfs.write("/a", b"A").unwrap();
        vfs.write("/b", b"B").unwrap();
        assert!(matches!(vfs.rename("/a", "/b"), Err(EnclaveError::AlreadyExists(_))));
        vfs.rename("/a", "/c").unwrap();
        assert!(!vfs.exists("/a"));
        assert_eq!(vfs.read("/c").unwrap(), b"A");
    }

    #[test]
    fn unlink_and_rmdir() {
        let (_dir, mut vfs) = setup();
        vfs.mkdir("/d").unwrap();
        vfs.write("/d/f", b"x").unwrap();
        vfs.unlink("/d/f").unwrap();
        vfs.rmdir("/d").unwrap();
        assert!(!vfs.exists("/d"));
        assert!(matches!(vfs.rmdir("/"), Err(EnclaveError::PermissionDenied(_))));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_out_of_the_root_are_refused() {
        use std::os::unix::fs::symlink;

        let (dir, mut vfs) = setup();
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.txt");
        fs::write(&secret, b"top secret").unwrap();
        symlink(outside.path(), dir.path().join("link")).unwrap();
        symlink(&secret, dir.path().join("direct.txt")).unwrap();

        for path in ["/link/secret.txt", "/direct.txt", "/link"] {
            assert!(
                matches!(vfs.read(path), Err(EnclaveError::PermissionDenied(_))),
                "{path}"
            );
            assert!(vfs.stat(path).is_err(), "{path}");
        }
        assert!(vfs.unlink("/link/secret.txt").is_err());
        assert!(vfs.unlink("/direct.txt").is_err());
        assert!(vfs.write("/link/new.txt", b"x").is_err());
        assert!(vfs.mkdir("/link/sub").is_err());
        assert!(vfs.rename("/direct.txt", "/moved.txt").is_err());
        assert!(vfs.readdir("/link").is_err());

        assert_eq!(fs::read(&secret).unwrap(), b"top secret");
        assert!(!outside.path().join("new.txt").exists());
        assert!(!outside.path().join("sub").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_hidden_from_listings() {
        let (dir, mut vfs) = setup();
        vfs.write("/plain.txt", b"x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("plain.txt"), dir.path().join("alias"))
            .unwrap();
        let names: Vec<String> = vfs.readdir("/").unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["plain.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn root_given_through_a_link_still_works() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/f.txt"), b"inside").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("via")).unwrap();
        let vfs = RealVfs::new(dir.path().join("via")).unwrap();
        assert_eq!(vfs.read("/f.txt").unwrap(), b"inside");
        assert_eq!(vfs.root(), fs::canonicalize(dir.path().join("real")).unwrap());
    }

    #[test]
    fn stat_reports_mtime() {
        let (_dir, mut vfs) = setup();
        vfs.write("/f", b"1234").unwrap();
        let meta = vfs.stat("/f").unwrap();
        assert_eq!(meta.size, 4);
        assert!(meta.mtime_ms.is_some());
    }
}
