//! Working directory ownership for a run

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

/// Directory a tool runs in.
///
/// A borrowed directory belongs to the caller and is never touched. A
/// temporary directory is removed when the `WorkDir` is dropped, on every
/// exit path, unless [`keep`](Self::keep) was called.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    temp: Option<TempDir>,
}

impl WorkDir {
    /// Use a caller-owned directory.
    #[must_use]
    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temp: None,
        }
    }

    /// Create a fresh directory under the system temp dir.
    pub fn temp(prefix: &str) -> io::Result<Self> {
        let temp = tempfile::Builder::new().prefix(prefix).tempdir()?;
        debug!(path = %temp.path().display(), "Created temporary working directory");
        Ok(Self {
            path: temp.path().to_path_buf(),
            temp: Some(temp),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    /// Detach the directory from cleanup and return its path.
    pub fn keep(mut self) -> PathBuf {
        if let Some(temp) = self.temp.take() {
            let path = temp.keep();
            debug!(path = %path.display(), "Keeping temporary working directory");
            return path;
        }
        self.path.clone()
    }
}

impl AsRef<Path> for WorkDir {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_removed_on_drop() {
        let work = WorkDir::temp("toolrun-test-").unwrap();
        let path = work.path().to_path_buf();
        assert!(path.is_dir());
        assert!(work.is_temporary());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("toolrun-test-")
        );

        std::fs::write(path.join("img-t0.tif"), b"frame").unwrap();
        drop(work);
        assert!(!path.exists());
    }

    #[test]
    fn test_kept_temp_dir_survives() {
        let work = WorkDir::temp("toolrun-keep-").unwrap();
        let path = work.keep();
        assert!(path.is_dir());
        std::fs::remove_dir_all(&path).unwrap();
    }

    #[test]
    fn test_borrowed_dir_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let work = WorkDir::borrowed(dir.path());
        assert!(!work.is_temporary());
        drop(work);
        assert!(dir.path().is_dir());
    }
}
