//! Single-document store: the whole GeoJSON file answers every request.

use super::StoreError;
use std::path::Path;

/// Reads the document verbatim. A missing document is an error, unlike tiles.
pub async fn read_document(path: &Path) -> Result<Vec<u8>, StoreError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| StoreError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overlay.geojson");
        let body = br#"{"type":"FeatureCollection","features":[]}"#;
        std::fs::write(&path, body).unwrap();

        assert_eq!(read_document(&path).await.unwrap(), body.to_vec());
        assert!(read_document(&dir.path().join("nope.geojson")).await.is_err());
    }
}
