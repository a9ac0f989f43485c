use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, warn};

use crate::{error::Error, Result};

/// Creates one private directory per execution
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn create(&self) -> Result<Workspace> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::Workspace(format!(
                "Failed to create workspace root {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let root = self.root.clone();
        // tempfile's creation is blocking; keep it off the async workers.
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new().prefix("exec-").tempdir_in(&root)
        })
        .await
        .map_err(|e| Error::Workspace(format!("Workspace task failed: {}", e)))?
        .map_err(|e| Error::Workspace(format!("Failed to create workspace: {}", e)))?;

        debug!("Created workspace {}", dir.path().display());
        Ok(Workspace { dir: Some(dir) })
    }
}

/// Temporary directory holding the source file and build artifacts of a
/// single execution. Removed when dropped, on every exit path.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    /// Absolute path of `name` inside the workspace
    pub fn artifact(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    pub async fn write_source(&self, file_name: &str, code: &str) -> Result<PathBuf> {
        let path = self.artifact(file_name);
        fs::write(&path, code).await.map_err(|e| {
            Error::Workspace(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }

    /// Rename an artifact in place; used when a compiler insists on a file name
    pub async fn rename(&self, from: &Path, to_name: &str) -> Result<PathBuf> {
        let target = self.artifact(to_name);
        fs::rename(from, &target).await.map_err(|e| {
            Error::Workspace(format!(
                "Failed to move {} to {}: {}",
                from.display(),
                target.display(),
                e
            ))
        })?;
        Ok(target)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("Failed to clean up workspace {}: {}", path.display(), e);
            }
        }
    }
}
