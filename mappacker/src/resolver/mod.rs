//! Source resolver
//!
//! The rendering engine pulls every resource it needs (source metadata,
//! tiles, glyphs, sprites) through a single [`ResourceLoader::load`] call.
//! [`SourceResolver`] classifies each URL into a [`SourceKind`] and routes it
//! to the matching store backend.
//!
//! Outcomes:
//! - `Ok(Some(bytes))` - resource found
//! - `Ok(None)` - tile legitimately absent (sparse coverage)
//! - `Err(ResolveError::UnsupportedSource)` - URL shape no backend serves

mod kind;

pub use kind::{
    classify, classify_source, container_name, expand_template, parse_tile_path, strip_scheme, SourceKind,
    TilePath, CONTAINER_SCHEME, RANGE_FILE_SCHEME,
};

use crate::provider::AsyncHttpClient;
use crate::store::directory::read_optional;
use crate::store::mbtiles::decompress_tile;
use crate::store::{
    geojson, remote, HttpRangeSource, LocalRangeSource, MbtilesReader, PmtilesReader,
    RangeSource, StoreError, TileJson,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors surfaced to the rendering engine.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No backend handles this URL for this request kind
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    /// A local source was requested but no source directory is configured
    #[error("no source directory configured for {0}")]
    MissingSourceDir(String),

    /// A local glyph or sprite was requested but no style directory is configured
    #[error("no style directory configured for {0}")]
    MissingStyleDir(String),

    /// A tile request URL has no trailing z/x/y
    #[error("malformed tile URL: {0}")]
    MalformedTileUrl(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the engine is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    SourceMetadata,
    Tile,
    Glyph,
    SpriteImage,
    SpriteJson,
}

/// One pull from the rendering engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub url: String,
    pub kind: RequestKind,
}

impl ResourceRequest {
    pub fn new(url: impl Into<String>, kind: RequestKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// Pull interface the rendering engine drives, one outstanding request at a time.
pub trait ResourceLoader: Send + Sync {
    fn load(
        &self,
        request: &ResourceRequest,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, ResolveError>> + Send;
}

/// Dispatches resource requests to the local and remote store backends.
#[derive(Clone)]
pub struct SourceResolver<C: AsyncHttpClient + Clone> {
    source_dir: Option<PathBuf>,
    style_dir: Option<PathBuf>,
    http_client: C,
}

impl<C: AsyncHttpClient + Clone> SourceResolver<C> {
    pub fn new(source_dir: Option<PathBuf>, style_dir: Option<PathBuf>, http_client: C) -> Self {
        Self {
            source_dir,
            style_dir,
            http_client,
        }
    }

    fn source_dir(&self, url: &str) -> Result<&Path, ResolveError> {
        self.source_dir
            .as_deref()
            .ok_or_else(|| ResolveError::MissingSourceDir(url.to_string()))
    }

    fn style_dir(&self, url: &str) -> Result<&Path, ResolveError> {
        self.style_dir
            .as_deref()
            .ok_or_else(|| ResolveError::MissingStyleDir(url.to_string()))
    }

    async fn load_style_resource(
        &self,
        request: &ResourceRequest,
    ) -> Result<Option<Vec<u8>>, ResolveError> {
        if remote::is_network_url(&request.url) {
            return Ok(Some(remote::fetch(&self.http_client, &request.url).await?));
        }

        let relative = match request.kind {
            RequestKind::Glyph => urlencoding::decode(&request.url)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| request.url.clone()),
            _ => request.url.clone(),
        };
        let path = self
            .style_dir(&request.url)?
            .join(relative.trim_start_matches('/'));

        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        Ok(Some(data))
    }

    async fn load_container(
        &self,
        request: &ResourceRequest,
    ) -> Result<Option<Vec<u8>>, ResolveError> {
        let name = container_name(&request.url);
        let path = self
            .source_dir(&request.url)?
            .join(format!("{}.mbtiles", name));
        let reader = MbtilesReader::new(path);

        match request.kind {
            RequestKind::SourceMetadata => {
                let info = reader.info_async().await?;
                let ext = if info.is_vector() { ".pbf" } else { "" };
                let tilejson = TileJson {
                    minzoom: Some(info.minzoom),
                    maxzoom: Some(info.maxzoom),
                    center: Some(info.center),
                    bounds: Some(info.bounds),
                    ..TileJson::new(vec![format!(
                        "{}{}/{{z}}/{{x}}/{{y}}{}",
                        CONTAINER_SCHEME, name, ext
                    )])
                };
                Ok(Some(tilejson.to_bytes()))
            }
            _ => {
                let parsed = parse_tile_path(strip_scheme(&request.url))
                    .ok_or_else(|| ResolveError::MalformedTileUrl(request.url.clone()))?;
                let is_vector = parsed.ext == Some("pbf");
                match reader.tile_async(parsed.tile).await? {
                    Some(data) if is_vector => Ok(Some(decompress_tile(data)?)),
                    other => Ok(other),
                }
            }
        }
    }

    async fn load_range_file(
        &self,
        request: &ResourceRequest,
    ) -> Result<Option<Vec<u8>>, ResolveError> {
        let rest = request
            .url
            .strip_prefix(RANGE_FILE_SCHEME)
            .unwrap_or(&request.url);

        let (target, tile) = match request.kind {
            RequestKind::SourceMetadata => (rest, None),
            _ => {
                let parsed = parse_tile_path(rest)
                    .ok_or_else(|| ResolveError::MalformedTileUrl(request.url.clone()))?;
                (parsed.prefix, Some(parsed.tile))
            }
        };

        if remote::is_network_url(target) {
            let source = HttpRangeSource::new(self.http_client.clone(), target);
            read_range_file(PmtilesReader::open(source).await?, target, tile).await
        } else {
            let mut path = self.source_dir(&request.url)?.join(target);
            if path.extension().is_none() {
                path.set_extension("pmtiles");
            }
            let source = LocalRangeSource::open(&path).await?;
            read_range_file(PmtilesReader::open(source).await?, target, tile).await
        }
    }

    async fn load_directory(
        &self,
        request: &ResourceRequest,
    ) -> Result<Option<Vec<u8>>, ResolveError> {
        let parsed = parse_tile_path(strip_scheme(&request.url))
            .ok_or_else(|| ResolveError::MalformedTileUrl(request.url.clone()))?;

        let mut path = self.source_dir(&request.url)?.to_path_buf();
        if !parsed.prefix.is_empty() {
            path.push(parsed.prefix);
        }
        path.push(parsed.tile.zoom.to_string());
        path.push(parsed.tile.x.to_string());
        path.push(match parsed.ext {
            Some(ext) => format!("{}.{}", parsed.tile.y, ext),
            None => parsed.tile.y.to_string(),
        });

        let data = read_optional(&path).await?;
        trace!(path = %path.display(), found = data.is_some(), "Directory tile read");
        Ok(data)
    }

    async fn load_document(
        &self,
        request: &ResourceRequest,
    ) -> Result<Option<Vec<u8>>, ResolveError> {
        let path = self
            .source_dir(&request.url)?
            .join(strip_scheme(&request.url).trim_start_matches('/'));
        Ok(Some(geojson::read_document(&path).await?))
    }
}

async fn read_range_file<S: RangeSource>(
    reader: PmtilesReader<S>,
    target: &str,
    tile: Option<crate::coord::TileCoord>,
) -> Result<Option<Vec<u8>>, ResolveError> {
    match tile {
        None => {
            let template = format!("{}{}/{{z}}/{{x}}/{{y}}", RANGE_FILE_SCHEME, target);
            Ok(Some(reader.tilejson(template).to_bytes()))
        }
        Some(tile) => Ok(reader.get_tile(tile.zoom, tile.x, tile.y).await?),
    }
}

impl<C: AsyncHttpClient + Clone> ResourceLoader for SourceResolver<C> {
    async fn load(&self, request: &ResourceRequest) -> Result<Option<Vec<u8>>, ResolveError> {
        trace!(url = %request.url, kind = ?request.kind, "Resource request");

        let result = match request.kind {
            RequestKind::Glyph | RequestKind::SpriteImage | RequestKind::SpriteJson => {
                self.load_style_resource(request).await
            }
            RequestKind::SourceMetadata | RequestKind::Tile => match classify(&request.url)? {
                SourceKind::Container => self.load_container(request).await,
                SourceKind::RangeFile => self.load_range_file(request).await,
                SourceKind::Directory => self.load_directory(request).await,
                SourceKind::SingleDocument => self.load_document(request).await,
                SourceKind::Remote => Err(ResolveError::UnsupportedSource(request.url.clone())),
            },
        };

        if let Err(e) = &result {
            debug!(url = %request.url, error = %e, "Resource request failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use crate::provider::MockAsyncHttpClient;
    use crate::store::pmtiles::tests::build_archive;
    use crate::store::MbtilesWriter;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn resolver(source: &Path, style: &Path) -> SourceResolver<MockAsyncHttpClient> {
        SourceResolver::new(
            Some(source.to_path_buf()),
            Some(style.to_path_buf()),
            MockAsyncHttpClient::ok(b"remote".to_vec()),
        )
    }

    fn write_container(dir: &Path, name: &str, format: &str, tile_data: &[u8]) {
        let mut writer = MbtilesWriter::create(dir.join(format!("{}.mbtiles", name))).unwrap();
        let mut meta = BTreeMap::new();
        meta.insert("format".to_string(), format.to_string());
        meta.insert("minzoom".to_string(), "0".to_string());
        meta.insert("maxzoom".to_string(), "4".to_string());
        writer.write_metadata(&meta).unwrap();
        writer.put_tile(TileCoord::new(2, 1, 1), tile_data).unwrap();
        writer.finalize().unwrap();
    }

    #[tokio::test]
    async fn test_container_metadata_tilejson() {
        let dir = TempDir::new().unwrap();
        write_container(dir.path(), "roads", "pbf", b"x");
        let r = resolver(dir.path(), dir.path());

        let bytes = r
            .load(&ResourceRequest::new("mbtiles://roads", RequestKind::SourceMetadata))
            .await
            .unwrap()
            .unwrap();
        let tilejson: TileJson = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(tilejson.tilejson, "1.0.0");
        assert_eq!(tilejson.tiles, vec!["mbtiles://roads/{z}/{x}/{y}.pbf".to_string()]);
        assert_eq!(tilejson.maxzoom, Some(4));
    }

    #[tokio::test]
    async fn test_container_raster_template_has_no_extension() {
        let dir = TempDir::new().unwrap();
        write_container(dir.path(), "imagery", "jpg", b"x");
        let r = resolver(dir.path(), dir.path());

        let bytes = r
            .load(&ResourceRequest::new("mbtiles://imagery", RequestKind::SourceMetadata))
            .await
            .unwrap()
            .unwrap();
        let tilejson: TileJson = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(tilejson.tiles, vec!["mbtiles://imagery/{z}/{x}/{y}".to_string()]);
    }

    #[tokio::test]
    async fn test_container_tile_and_missing_tile() {
        let dir = TempDir::new().unwrap();
        write_container(dir.path(), "imagery", "jpg", b"jpeg-bytes");
        let r = resolver(dir.path(), dir.path());

        let hit = r
            .load(&ResourceRequest::new("mbtiles://imagery/2/1/1", RequestKind::Tile))
            .await
            .unwrap();
        assert_eq!(hit, Some(b"jpeg-bytes".to_vec()));

        let miss = r
            .load(&ResourceRequest::new("mbtiles://imagery/2/0/0", RequestKind::Tile))
            .await
            .unwrap();
        assert_eq!(miss, None);
    }

    #[tokio::test]
    async fn test_container_vector_tile_is_inflated() {
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"mvt").unwrap();
        let dir = TempDir::new().unwrap();
        write_container(dir.path(), "roads", "pbf", &encoder.finish().unwrap());
        let r = resolver(dir.path(), dir.path());

        let tile = r
            .load(&ResourceRequest::new("mbtiles://roads/2/1/1.pbf", RequestKind::Tile))
            .await
            .unwrap();
        assert_eq!(tile, Some(b"mvt".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_container_is_error() {
        let dir = TempDir::new().unwrap();
        let r = resolver(dir.path(), dir.path());
        let result = r
            .load(&ResourceRequest::new("mbtiles://nope/1/0/0", RequestKind::Tile))
            .await;
        assert!(matches!(result, Err(ResolveError::Store(_))));
    }

    #[tokio::test]
    async fn test_directory_tile() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("5/8")).unwrap();
        std::fs::write(dir.path().join("5/8/12.jpg"), b"jpg").unwrap();
        let r = resolver(dir.path(), dir.path());

        let hit = r
            .load(&ResourceRequest::new("xyz://5/8/12.jpg", RequestKind::Tile))
            .await
            .unwrap();
        assert_eq!(hit, Some(b"jpg".to_vec()));

        let miss = r
            .load(&ResourceRequest::new("xyz://5/8/13.jpg", RequestKind::Tile))
            .await
            .unwrap();
        assert_eq!(miss, None);
    }

    #[tokio::test]
    async fn test_directory_prefix() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sources/1/0")).unwrap();
        std::fs::write(dir.path().join("sources/1/0/1.png"), b"png").unwrap();
        let r = resolver(dir.path(), dir.path());

        let hit = r
            .load(&ResourceRequest::new("sources/1/0/1.png", RequestKind::Tile))
            .await
            .unwrap();
        assert_eq!(hit, Some(b"png".to_vec()));
    }

    #[tokio::test]
    async fn test_geojson_document_for_both_kinds() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("overlay.geojson"), b"{}").unwrap();
        let r = resolver(dir.path(), dir.path());

        for kind in [RequestKind::SourceMetadata, RequestKind::Tile] {
            let doc = r
                .load(&ResourceRequest::new("overlay.geojson", kind))
                .await
                .unwrap();
            assert_eq!(doc, Some(b"{}".to_vec()));
        }
    }

    #[tokio::test]
    async fn test_remote_tile_source_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let r = resolver(dir.path(), dir.path());
        let result = r
            .load(&ResourceRequest::new("https://tiles.example.com/1/0/0.png", RequestKind::Tile))
            .await;
        assert!(matches!(result, Err(ResolveError::UnsupportedSource(_))));
    }

    #[tokio::test]
    async fn test_unrecognized_url_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let r = resolver(dir.path(), dir.path());
        let result = r
            .load(&ResourceRequest::new("something-else", RequestKind::SourceMetadata))
            .await;
        assert!(matches!(result, Err(ResolveError::UnsupportedSource(_))));
    }

    #[tokio::test]
    async fn test_remote_glyph_passthrough() {
        let dir = TempDir::new().unwrap();
        let r = resolver(dir.path(), dir.path());
        let glyph = r
            .load(&ResourceRequest::new(
                "https://fonts.example.com/Open%20Sans/0-255.pbf",
                RequestKind::Glyph,
            ))
            .await
            .unwrap();
        assert_eq!(glyph, Some(b"remote".to_vec()));
    }

    #[tokio::test]
    async fn test_local_glyph_is_percent_decoded() {
        let style = TempDir::new().unwrap();
        std::fs::create_dir_all(style.path().join("fonts/Open Sans")).unwrap();
        std::fs::write(style.path().join("fonts/Open Sans/0-255.pbf"), b"glyph").unwrap();
        let r = resolver(style.path(), style.path());

        let glyph = r
            .load(&ResourceRequest::new("fonts/Open%20Sans/0-255.pbf", RequestKind::Glyph))
            .await
            .unwrap();
        assert_eq!(glyph, Some(b"glyph".to_vec()));
    }

    #[tokio::test]
    async fn test_local_sprite() {
        let style = TempDir::new().unwrap();
        std::fs::write(style.path().join("sprite.json"), b"{}").unwrap();
        let r = resolver(style.path(), style.path());

        let sprite = r
            .load(&ResourceRequest::new("sprite.json", RequestKind::SpriteJson))
            .await
            .unwrap();
        assert_eq!(sprite, Some(b"{}".to_vec()));
        assert!(r
            .load(&ResourceRequest::new("sprite.png", RequestKind::SpriteImage))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_missing_source_dir() {
        let r = SourceResolver::new(None, None, MockAsyncHttpClient::ok(vec![]));
        let result = r
            .load(&ResourceRequest::new("mbtiles://a/1/0/0", RequestKind::Tile))
            .await;
        assert!(matches!(result, Err(ResolveError::MissingSourceDir(_))));
    }

    #[tokio::test]
    async fn test_local_range_file() {
        let dir = TempDir::new().unwrap();
        let archive = build_archive(&[(0, 0, 0, b"z0"), (1, 1, 1, b"se")], [0; 4]);
        std::fs::write(dir.path().join("world.pmtiles"), archive).unwrap();
        let r = resolver(dir.path(), dir.path());

        let meta = r
            .load(&ResourceRequest::new("pmtiles://world", RequestKind::SourceMetadata))
            .await
            .unwrap()
            .unwrap();
        let tilejson: TileJson = serde_json::from_slice(&meta).unwrap();
        assert_eq!(tilejson.tiles, vec!["pmtiles://world/{z}/{x}/{y}".to_string()]);
        assert_eq!(tilejson.bounds, Some([-180.0, -85.05112878, 180.0, 85.05112878]));

        let tile = r
            .load(&ResourceRequest::new("pmtiles://world/1/1/1", RequestKind::Tile))
            .await
            .unwrap();
        assert_eq!(tile, Some(b"se".to_vec()));

        let miss = r
            .load(&ResourceRequest::new("pmtiles://world/1/0/0", RequestKind::Tile))
            .await
            .unwrap();
        assert_eq!(miss, None);
    }
}
