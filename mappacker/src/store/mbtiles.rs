//! MBTiles container store.
//!
//! An MBTiles file is an SQLite database with a `metadata(name, value)` table
//! and a `tiles(zoom_level, tile_column, tile_row, tile_data)` table. Rows are
//! stored in TMS order, so `tile_row = 2^z - 1 - y` for slippy-map `y`.
//!
//! The reader opens the database per call and releases it immediately, so
//! thousands of tile pulls during a render never accumulate descriptors. The
//! writer owns a single connection for the lifetime of one archive.

use super::StoreError;
use crate::coord::TileCoord;
use flate2::read::{GzDecoder, ZlibDecoder};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Flips a slippy-map row into the TMS row stored by MBTiles (and back).
#[inline]
pub fn flip_y(zoom: u8, y: u32) -> u32 {
    ((1u64 << zoom) - 1 - y as u64) as u32
}

/// Inflates gzip or zlib payloads; anything else passes through unchanged.
pub fn decompress_tile(data: Vec<u8>) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::new();
    match data.as_slice() {
        [0x1f, 0x8b, ..] => {
            GzDecoder::new(data.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| StoreError::Decompress(e.to_string()))?;
            Ok(out)
        }
        [0x78, second, ..] if (0x78u16 * 256 + *second as u16) % 31 == 0 => {
            ZlibDecoder::new(data.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| StoreError::Decompress(e.to_string()))?;
            Ok(out)
        }
        _ => Ok(data),
    }
}

/// Declared properties of an MBTiles container.
#[derive(Debug, Clone, PartialEq)]
pub struct MbtilesInfo {
    pub name: Option<String>,
    pub format: Option<String>,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub bounds: [f64; 4],
    pub center: [f64; 3],
}

impl MbtilesInfo {
    pub fn is_vector(&self) -> bool {
        self.format.as_deref() == Some("pbf")
    }
}

/// Per-call reader for an MBTiles file.
#[derive(Debug, Clone)]
pub struct MbtilesReader {
    path: PathBuf,
}

impl MbtilesReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, StoreError> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::sqlite(&self.path, e))
    }

    /// Reads the raw key/value metadata table.
    pub fn metadata(&self) -> Result<HashMap<String, String>, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare("SELECT name, value FROM metadata")
            .map_err(|e| StoreError::sqlite(&self.path, e))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| StoreError::sqlite(&self.path, e))?;

        rows.collect::<Result<HashMap<_, _>, _>>()
            .map_err(|e| StoreError::sqlite(&self.path, e))
    }

    /// Reads and normalises the declared zoom range, bounds, centre and format.
    ///
    /// Missing zooms fall back to the range present in the tiles table,
    /// missing bounds to the whole world and a missing centre to the middle
    /// of the bounds.
    pub fn info(&self) -> Result<MbtilesInfo, StoreError> {
        let meta = self.metadata()?;

        let (mut minzoom, mut maxzoom) = (
            meta.get("minzoom").and_then(|v| v.trim().parse::<u8>().ok()),
            meta.get("maxzoom").and_then(|v| v.trim().parse::<u8>().ok()),
        );
        if minzoom.is_none() || maxzoom.is_none() {
            let conn = self.open()?;
            let (lo, hi): (Option<u8>, Option<u8>) = conn
                .query_row(
                    "SELECT MIN(zoom_level), MAX(zoom_level) FROM tiles",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map_err(|e| StoreError::sqlite(&self.path, e))?;
            minzoom = minzoom.or(lo);
            maxzoom = maxzoom.or(hi);
        }
        let minzoom = minzoom.unwrap_or(0);
        let maxzoom = maxzoom.unwrap_or(minzoom);

        let bounds = meta
            .get("bounds")
            .and_then(|v| parse_floats::<4>(v))
            .unwrap_or([-180.0, -85.05112878, 180.0, 85.05112878]);

        let center = meta
            .get("center")
            .and_then(|v| parse_floats::<3>(v))
            .unwrap_or_else(|| {
                let range = maxzoom.saturating_sub(minzoom);
                let zoom = if range <= 1 {
                    maxzoom
                } else {
                    range / 2 + minzoom
                };
                [
                    (bounds[0] + bounds[2]) / 2.0,
                    (bounds[1] + bounds[3]) / 2.0,
                    zoom as f64,
                ]
            });

        Ok(MbtilesInfo {
            name: meta.get("name").cloned(),
            format: meta.get("format").cloned(),
            minzoom,
            maxzoom,
            bounds,
            center,
        })
    }

    /// Reads one tile by slippy-map coordinates. Absent tiles are `Ok(None)`.
    pub fn tile(&self, tile: TileCoord) -> Result<Option<Vec<u8>>, StoreError> {
        if tile.zoom > 30 || u64::from(tile.y) >= (1u64 << tile.zoom) {
            return Ok(None);
        }

        let conn = self.open()?;
        let data: Option<Vec<u8>> = conn
            .query_row(
                "SELECT tile_data FROM tiles WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
                params![tile.zoom, tile.x, flip_y(tile.zoom, tile.y)],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::sqlite(&self.path, e))?;

        trace!(path = %self.path.display(), tile = %tile, found = data.is_some(), "MBTiles tile read");
        Ok(data)
    }

    /// Async wrapper for [`info`](Self::info) on the blocking pool.
    pub async fn info_async(&self) -> Result<MbtilesInfo, StoreError> {
        let reader = self.clone();
        tokio::task::spawn_blocking(move || reader.info())
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Async wrapper for [`tile`](Self::tile) on the blocking pool.
    pub async fn tile_async(&self, tile: TileCoord) -> Result<Option<Vec<u8>>, StoreError> {
        let reader = self.clone();
        tokio::task::spawn_blocking(move || reader.tile(tile))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn parse_floats<const N: usize>(value: &str) -> Option<[f64; N]> {
    let parsed: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    parsed.try_into().ok()
}

/// Size and tile count of a finalized container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveStats {
    pub tile_count: u64,
    pub size_bytes: u64,
}

/// Single writer for a new MBTiles container.
///
/// All writes happen inside one transaction committed by [`finalize`](Self::finalize).
pub struct MbtilesWriter {
    conn: Connection,
    path: PathBuf,
}

impl MbtilesWriter {
    /// Creates a fresh container at `path`, replacing any previous file.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
        }

        let conn = Connection::open(&path).map_err(|e| StoreError::sqlite(&path, e))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS metadata (name TEXT, value TEXT);
             CREATE UNIQUE INDEX IF NOT EXISTS name ON metadata (name);
             CREATE TABLE IF NOT EXISTS tiles (
                 zoom_level INTEGER,
                 tile_column INTEGER,
                 tile_row INTEGER,
                 tile_data BLOB
             );
             CREATE UNIQUE INDEX IF NOT EXISTS tile_index ON tiles (zoom_level, tile_column, tile_row);
             BEGIN;",
        )
        .map_err(|e| StoreError::sqlite(&path, e))?;

        debug!(path = %path.display(), "MBTiles container created");
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes (or replaces) metadata entries.
    pub fn write_metadata(&mut self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT OR REPLACE INTO metadata (name, value) VALUES (?1, ?2)")
            .map_err(|e| StoreError::sqlite(&self.path, e))?;
        for (name, value) in entries {
            stmt.execute(params![name, value])
                .map_err(|e| StoreError::sqlite(&self.path, e))?;
        }
        Ok(())
    }

    /// Writes (or replaces) one tile at slippy-map coordinates.
    pub fn put_tile(&mut self, tile: TileCoord, data: &[u8]) -> Result<(), StoreError> {
        self.conn
            .prepare_cached(
                "INSERT OR REPLACE INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)",
            )
            .and_then(|mut stmt| {
                stmt.execute(params![tile.zoom, tile.x, flip_y(tile.zoom, tile.y), data])
            })
            .map_err(|e| StoreError::sqlite(&self.path, e))?;
        Ok(())
    }

    /// Commits, closes and reports the container's tile count and size.
    pub fn finalize(self) -> Result<ArchiveStats, StoreError> {
        let Self { conn, path } = self;

        conn.execute_batch("COMMIT;")
            .map_err(|e| StoreError::sqlite(&path, e))?;
        let tile_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get(0))
            .map_err(|e| StoreError::sqlite(&path, e))?;
        conn.close()
            .map_err(|(_, e)| StoreError::sqlite(&path, e))?;

        let size_bytes = std::fs::metadata(&path)
            .map_err(|e| StoreError::io(&path, e))?
            .len();

        debug!(path = %path.display(), tile_count, size_bytes, "MBTiles container finalized");
        Ok(ArchiveStats {
            tile_count: tile_count as u64,
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_sample(path: &Path, meta: &[(&str, &str)]) {
        let mut writer = MbtilesWriter::create(path).unwrap();
        let entries = meta
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        writer.write_metadata(&entries).unwrap();
        writer.put_tile(TileCoord::new(2, 1, 0), b"tile-2-1-0").unwrap();
        writer.put_tile(TileCoord::new(3, 4, 5), b"tile-3-4-5").unwrap();
        writer.finalize().unwrap();
    }

    #[test]
    fn test_flip_y() {
        assert_eq!(flip_y(0, 0), 0);
        assert_eq!(flip_y(2, 0), 3);
        assert_eq!(flip_y(3, 5), 2);
    }

    #[test]
    fn test_write_then_read_tile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        write_sample(&path, &[("format", "jpg")]);

        let reader = MbtilesReader::new(&path);
        assert_eq!(
            reader.tile(TileCoord::new(3, 4, 5)).unwrap(),
            Some(b"tile-3-4-5".to_vec())
        );
        assert_eq!(reader.tile(TileCoord::new(3, 4, 4)).unwrap(), None);
    }

    #[test]
    fn test_rows_are_stored_in_tms_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        write_sample(&path, &[]);

        let conn = Connection::open(&path).unwrap();
        let row: u32 = conn
            .query_row(
                "SELECT tile_row FROM tiles WHERE zoom_level = 2",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(row, 3);
    }

    #[test]
    fn test_finalize_reports_stats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        let mut writer = MbtilesWriter::create(&path).unwrap();
        writer.put_tile(TileCoord::new(1, 0, 0), b"x").unwrap();
        // Rewriting the same key replaces it
        writer.put_tile(TileCoord::new(1, 0, 0), b"y").unwrap();
        writer.put_tile(TileCoord::new(1, 1, 0), b"z").unwrap();
        let stats = writer.finalize().unwrap();

        assert_eq!(stats.tile_count, 2);
        assert!(stats.size_bytes > 0);
    }

    #[test]
    fn test_info_reads_declared_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        write_sample(
            &path,
            &[
                ("format", "pbf"),
                ("minzoom", "1"),
                ("maxzoom", "9"),
                ("bounds", "-79,37,-77,38"),
                ("center", "-78,37.5,4"),
            ],
        );

        let info = MbtilesReader::new(&path).info().unwrap();
        assert_eq!(info.minzoom, 1);
        assert_eq!(info.maxzoom, 9);
        assert_eq!(info.bounds, [-79.0, 37.0, -77.0, 38.0]);
        assert_eq!(info.center, [-78.0, 37.5, 4.0]);
        assert!(info.is_vector());
    }

    #[test]
    fn test_info_defaults_from_tiles_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        write_sample(&path, &[]);

        let info = MbtilesReader::new(&path).info().unwrap();
        assert_eq!((info.minzoom, info.maxzoom), (2, 3));
        assert_eq!(info.bounds[0], -180.0);
        assert_eq!(info.center[2], 3.0);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let reader = MbtilesReader::new(dir.path().join("missing.mbtiles"));
        assert!(matches!(reader.info(), Err(StoreError::Sqlite { .. })));
    }

    #[test]
    fn test_decompress_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"vector tile").unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(decompress_tile(compressed).unwrap(), b"vector tile");
    }

    #[test]
    fn test_decompress_zlib() {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"vector tile").unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(decompress_tile(compressed).unwrap(), b"vector tile");
    }

    #[test]
    fn test_decompress_passthrough() {
        let raw = vec![0x1a, 0x02, 0x03];
        assert_eq!(decompress_tile(raw.clone()).unwrap(), raw);
    }

    #[tokio::test]
    async fn test_async_wrappers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        write_sample(&path, &[]);

        let reader = MbtilesReader::new(&path);
        assert!(reader.tile_async(TileCoord::new(2, 1, 0)).await.unwrap().is_some());
        assert_eq!(reader.info_async().await.unwrap().maxzoom, 3);
    }
}
