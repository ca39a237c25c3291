//! Per-job scratch directory.

use super::error::JobError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Subdirectory holding acquired tiles and the overlay document.
pub const SOURCES_DIR: &str = "sources";

/// Generated style file name.
pub const STYLE_FILE: &str = "style.json";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A scratch directory owned by one job. Call [`Workspace::remove`] when done.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Creates a fresh directory under `temp_root`, named after `label`.
    pub async fn create(temp_root: &Path, label: &str) -> Result<Self, JobError> {
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "{}-{}-{}",
            label,
            Utc::now().format("%Y%m%dT%H%M%S%.6f"),
            sequence
        );
        let root = temp_root.join(name);
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| JobError::io(&root, e))?;
        debug!(path = %root.display(), "Workspace created");
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn sources(&self) -> PathBuf {
        self.root.join(SOURCES_DIR)
    }

    pub fn style_file(&self) -> PathBuf {
        self.root.join(STYLE_FILE)
    }

    /// Deletes the directory and everything in it. Failures are logged only.
    pub async fn remove(self) {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!(path = %self.root.display(), "Workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.root.display(),
                error = %e,
                "Failed to remove workspace"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_workspaces_are_distinct_and_removed() {
        let temp = TempDir::new().unwrap();
        let a = Workspace::create(temp.path(), "output").await.unwrap();
        let b = Workspace::create(temp.path(), "output").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().is_dir());
        assert_eq!(a.sources(), a.path().join("sources"));

        let path = a.path().to_path_buf();
        std::fs::write(path.join("scratch"), b"x").unwrap();
        a.remove().await;
        assert!(!path.exists());
        b.remove().await;
    }
}
