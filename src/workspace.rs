//! File and workspace services
//!
//! Resolution never touches `std::fs` directly. Everything goes through a
//! [`FileProvider`] so tests and embedders can substitute their own view of
//! the file system.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Synchronous file existence and content lookup.
pub trait FileProvider: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// File content; bytes that are not UTF-8 are replaced.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Provider backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFiles;

impl FileProvider for DiskFiles {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

/// In-memory provider keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct MemoryFiles {
    files: HashMap<PathBuf, String>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files.insert(normalize_path(path.as_ref()), content.into());
    }

    pub fn with(mut self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }
}

impl FileProvider for MemoryFiles {
    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let dir = normalize_path(path);
        self.files.keys().any(|p| p != &dir && p.starts_with(&dir))
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())))
    }
}

/// Maps a file to the workspace root it belongs to.
pub trait WorkspaceProvider: Send + Sync {
    fn root_for(&self, path: &Path) -> Option<PathBuf>;
}

/// A list of workspace folders. A file belongs to the first folder that
/// contains it, and to the first folder when none does.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    folders: Vec<PathBuf>,
}

impl Workspace {
    pub fn new<I, P>(folders: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            folders: folders.into_iter().map(|f| normalize_path(f.as_ref())).collect(),
        }
    }
}

impl WorkspaceProvider for Workspace {
    fn root_for(&self, path: &Path) -> Option<PathBuf> {
        let path = normalize_path(path);
        self.folders
            .iter()
            .find(|folder| path.starts_with(folder))
            .or_else(|| self.folders.first())
            .cloned()
    }
}

/// Remove `.` and resolve `..` lexically, without touching the disk.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_))) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_path(Path::new("./src/lib.rs")), PathBuf::from("src/lib.rs"));
    }

    #[test]
    fn test_workspace_root_for() {
        let workspace = Workspace::new(["/work/app", "/work/lib"]);
        assert_eq!(workspace.root_for(Path::new("/work/lib/x.lua")), Some(PathBuf::from("/work/lib")));
        assert_eq!(workspace.root_for(Path::new("/elsewhere/y.lua")), Some(PathBuf::from("/work/app")));
        assert_eq!(Workspace::default().root_for(Path::new("/a")), None);
    }

    #[test]
    fn test_memory_files() {
        let files = MemoryFiles::new().with("/p/src/main.lua", "print(1)");
        assert!(files.is_file(Path::new("/p/src/./main.lua")));
        assert!(files.is_dir(Path::new("/p/src")));
        assert!(files.exists(Path::new("/p")));
        assert!(!files.exists(Path::new("/p/other")));
        assert_eq!(files.read_to_string(Path::new("/p/src/main.lua")).unwrap(), "print(1)");
        assert!(files.read_to_string(Path::new("/p/missing.lua")).is_err());
    }

    #[test]
    fn test_disk_files_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bytes.lua");
        std::fs::write(&path, b"local s = '\xff'\n").unwrap();
        let text = DiskFiles.read_to_string(&path).unwrap();
        assert!(text.starts_with("local s = '"));
        assert!(text.contains('\u{FFFD}'));
    }
}
