//! Directory tile store: `{root}/{z}/{x}/{y}.{ext}`.

use super::StoreError;
use crate::coord::TileCoord;
use crate::provider::TileFormat;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Name of the attribution document kept at the store root.
pub const METADATA_FILE: &str = "metadata.json";

/// A tile tree on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a tile with the given extension.
    pub fn tile_path(&self, tile: TileCoord, ext: &str) -> PathBuf {
        self.root
            .join(tile.zoom.to_string())
            .join(tile.x.to_string())
            .join(format!("{}.{}", tile.y, ext))
    }

    /// True when the tile already exists on disk.
    pub async fn contains(&self, tile: TileCoord, format: TileFormat) -> bool {
        tokio::fs::try_exists(self.tile_path(tile, format.extension()))
            .await
            .unwrap_or(false)
    }

    /// Reads a tile; a missing file is `Ok(None)`.
    pub async fn read_tile(
        &self,
        tile: TileCoord,
        ext: &str,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        read_optional(&self.tile_path(tile, ext)).await
    }

    /// Writes a tile, creating parent directories.
    pub async fn write_tile(
        &self,
        tile: TileCoord,
        format: TileFormat,
        data: &[u8],
    ) -> Result<PathBuf, StoreError> {
        let path = self.tile_path(tile, format.extension());
        write_file(&path, data).await?;
        Ok(path)
    }

    /// Writes a document relative to the store root.
    pub async fn write_document(&self, name: &str, data: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.root.join(name);
        write_file(&path, data).await?;
        Ok(path)
    }
}

/// Reads a file, mapping "not found" to `Ok(None)`.
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Extension of in-flight writes. Never read as a tile.
pub const PARTIAL_EXTENSION: &str = "partial";

/// Sibling a file is written to before it is renamed into place.
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}", name, PARTIAL_EXTENSION))
}

/// Writes through a partial sibling and a rename, so an interrupted write
/// never leaves a truncated file under the final name.
async fn write_file(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let partial = partial_path(path);
    let result = match tokio::fs::write(&partial, data).await {
        Ok(()) => tokio::fs::rename(&partial, path)
            .await
            .map_err(|e| StoreError::io(path, e)),
        Err(e) => Err(StoreError::io(&partial, e)),
    };
    if result.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tile_path_layout() {
        let store = DirectoryStore::new("/data");
        assert_eq!(
            store.tile_path(TileCoord::new(5, 8, 12), "jpg"),
            PathBuf::from("/data/5/8/12.jpg")
        );
    }

    #[tokio::test]
    async fn test_write_read_contains() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::new(dir.path());
        let tile = TileCoord::new(3, 2, 1);

        assert!(!store.contains(tile, TileFormat::Png).await);
        store.write_tile(tile, TileFormat::Png, b"png").await.unwrap();
        assert!(store.contains(tile, TileFormat::Png).await);
        assert!(!store.contains(tile, TileFormat::Jpg).await);
        assert_eq!(store.read_tile(tile, "png").await.unwrap(), Some(b"png".to_vec()));
    }

    #[tokio::test]
    async fn test_leftover_partial_is_not_a_tile() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::new(dir.path());
        let tile = TileCoord::new(2, 1, 1);
        let path = store.tile_path(tile, "jpg");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(partial_path(&path), b"trunc").unwrap();

        assert!(!store.contains(tile, TileFormat::Jpg).await);
        assert_eq!(store.read_tile(tile, "jpg").await.unwrap(), None);

        // a retry replaces the leftover
        store.write_tile(tile, TileFormat::Jpg, b"full").await.unwrap();
        assert_eq!(store.read_tile(tile, "jpg").await.unwrap(), Some(b"full".to_vec()));
        assert!(!partial_path(&path).exists());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::new(dir.path());
        let tile = TileCoord::new(1, 0, 0);
        // a non-empty directory where the tile should go makes the rename fail
        let path = store.tile_path(tile, "png");
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        assert!(store.write_tile(tile, TileFormat::Png, b"png").await.is_err());
        assert!(!partial_path(&path).exists());
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn test_missing_tile_is_none() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::new(dir.path());
        assert_eq!(store.read_tile(TileCoord::new(0, 0, 0), "jpg").await.unwrap(), None);
    }
}
