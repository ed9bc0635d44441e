//! Scoped storage for per-frame intermediate files

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Directory holding scene files and raw images while a job runs.
///
/// A temporary workspace is deleted with everything in it when dropped; a
/// kept one stays where the caller put it.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    temp: Option<TempDir>,
}

impl Workspace {
    /// A fresh directory under the system temp dir
    pub fn temporary(prefix: &str) -> Result<Self> {
        let temp = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(Self {
            dir: temp.path().to_path_buf(),
            temp: Some(temp),
        })
    }

    /// Use `dir`, creating it if needed
    pub fn kept(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, temp: None })
    }

    /// `kept(dir)` when a directory is given, otherwise a temporary one
    pub fn new(dir: Option<&Path>, prefix: &str) -> Result<Self> {
        match dir {
            Some(dir) => Self::kept(dir),
            None => Self::temporary(prefix),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.join(name)
    }
}

/// Removes registered files on drop unless told to keep them
#[derive(Debug)]
pub struct ArtifactGuard {
    paths: Vec<PathBuf>,
    keep: bool,
}

impl ArtifactGuard {
    pub fn new(keep: bool) -> Self {
        Self { paths: Vec::new(), keep }
    }

    /// Register `path` for removal and hand it back
    pub fn track(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }

    /// Stop tracking `path`, leaving it in place
    pub fn release(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::trace!(path = %path.display(), "removed intermediate"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove intermediate"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_temporary_removed_on_drop() {
        let workspace = Workspace::temporary("pcrender-test").unwrap();
        let dir = workspace.path().to_path_buf();
        fs::write(workspace.join("frame_0000.xml"), "<scene/>").unwrap();
        assert!(workspace.is_temporary());
        drop(workspace);
        assert!(!dir.exists());
    }

    #[test]
    fn test_kept_survives() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("frames");
        let workspace = Workspace::new(Some(&dir), "unused").unwrap();
        fs::write(workspace.join("frame_0000.png"), "x").unwrap();
        drop(workspace);
        assert!(dir.join("frame_0000.png").exists());
    }

    #[test]
    fn test_guard_removes_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("scene.xml");
        let raw = dir.path().join("scene.exr");
        let never_written = dir.path().join("missing.exr");
        fs::write(&scene, "").unwrap();
        fs::write(&raw, "").unwrap();

        {
            let mut guard = ArtifactGuard::new(false);
            guard.track(scene.clone());
            guard.track(raw.clone());
            guard.track(never_written);
            guard.release(&raw);
        }
        assert!(!scene.exists());
        assert!(raw.exists());

        fs::write(&scene, "").unwrap();
        {
            let mut guard = ArtifactGuard::new(true);
            guard.track(scene.clone());
        }
        assert!(scene.exists());
    }
}
