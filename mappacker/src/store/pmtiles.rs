//! PMTiles v3 reader.
//!
//! A PMTiles archive is a single file addressed by byte ranges: a fixed
//! 127-byte header, a root directory, optional leaf directories and the tile
//! data section. Tiles are keyed by a Hilbert-curve tile id. The same reader
//! serves local files (explicit offset reads on one open handle) and remote
//! archives (HTTP `Range` requests).

use super::{StoreError, TileJson};
use crate::coord::{MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
use crate::provider::AsyncHttpClient;
use flate2::read::GzDecoder;
use std::future::Future;
use std::io::{Read, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;
use tracing::trace;

/// Fixed header length of a v3 archive.
pub const HEADER_LEN: usize = 127;

const MAGIC: &[u8; 7] = b"PMTiles";
const MAX_DIRECTORY_DEPTH: usize = 4;

/// Compression applied to directories or tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Unknown,
    None,
    Gzip,
    Brotli,
    Zstd,
}

impl From<u8> for Compression {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::None,
            2 => Self::Gzip,
            3 => Self::Brotli,
            4 => Self::Zstd,
            _ => Self::Unknown,
        }
    }
}

/// Payload type of the tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileType {
    Unknown,
    Mvt,
    Png,
    Jpeg,
    Webp,
    Avif,
}

impl From<u8> for TileType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Mvt,
            2 => Self::Png,
            3 => Self::Jpeg,
            4 => Self::Webp,
            5 => Self::Avif,
            _ => Self::Unknown,
        }
    }
}

impl TileType {
    /// Metadata `format` string for this tile type.
    pub fn format(&self) -> Option<&'static str> {
        match self {
            Self::Mvt => Some("pbf"),
            Self::Png => Some("png"),
            Self::Jpeg => Some("jpg"),
            Self::Webp => Some("webp"),
            Self::Avif => Some("avif"),
            Self::Unknown => None,
        }
    }
}

/// Parsed archive header with degenerate values already defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct PmtilesHeader {
    pub root_dir_offset: u64,
    pub root_dir_length: u64,
    pub metadata_offset: u64,
    pub metadata_length: u64,
    pub leaf_dirs_offset: u64,
    pub leaf_dirs_length: u64,
    pub tile_data_offset: u64,
    pub tile_data_length: u64,
    pub addressed_tiles: u64,
    pub tile_entries: u64,
    pub tile_contents: u64,
    pub clustered: bool,
    pub internal_compression: Compression,
    pub tile_compression: Compression,
    pub tile_type: TileType,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// `[west, south, east, north]`
    pub bounds: [f64; 4],
    pub center_zoom: u8,
    pub center_lon: f64,
    pub center_lat: f64,
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

fn read_e7(bytes: &[u8], at: usize) -> f64 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    i32::from_le_bytes(buf) as f64 / 10_000_000.0
}

impl PmtilesHeader {
    /// Parses the 127-byte header.
    ///
    /// All-zero bounds are replaced by whole-world coverage and a zero
    /// centre zoom by half of the maximum zoom.
    pub fn parse(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < HEADER_LEN {
            return Err(StoreError::InvalidArchive(format!(
                "PMTiles header is {} bytes, expected {}",
                bytes.len(),
                HEADER_LEN
            )));
        }
        if &bytes[0..7] != MAGIC {
            return Err(StoreError::InvalidArchive(
                "missing PMTiles magic".to_string(),
            ));
        }
        if bytes[7] != 3 {
            return Err(StoreError::InvalidArchive(format!(
                "unsupported PMTiles version {}",
                bytes[7]
            )));
        }

        let mut bounds = [
            read_e7(bytes, 102),
            read_e7(bytes, 106),
            read_e7(bytes, 110),
            read_e7(bytes, 114),
        ];
        if bounds.iter().all(|v| *v == 0.0) {
            bounds = [MIN_LON, MIN_LAT, MAX_LON, MAX_LAT];
        }

        let max_zoom = bytes[101];
        let center_zoom = match bytes[118] {
            0 => max_zoom / 2,
            z => z,
        };

        Ok(Self {
            root_dir_offset: read_u64(bytes, 8),
            root_dir_length: read_u64(bytes, 16),
            metadata_offset: read_u64(bytes, 24),
            metadata_length: read_u64(bytes, 32),
            leaf_dirs_offset: read_u64(bytes, 40),
            leaf_dirs_length: read_u64(bytes, 48),
            tile_data_offset: read_u64(bytes, 56),
            tile_data_length: read_u64(bytes, 64),
            addressed_tiles: read_u64(bytes, 72),
            tile_entries: read_u64(bytes, 80),
            tile_contents: read_u64(bytes, 88),
            clustered: bytes[96] == 1,
            internal_compression: Compression::from(bytes[97]),
            tile_compression: Compression::from(bytes[98]),
            tile_type: TileType::from(bytes[99]),
            min_zoom: bytes[100],
            max_zoom,
            bounds,
            center_zoom,
            center_lon: read_e7(bytes, 119),
            center_lat: read_e7(bytes, 123),
        })
    }
}

/// One directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub tile_id: u64,
    pub offset: u64,
    pub length: u32,
    /// Zero marks a leaf directory pointer
    pub run_length: u32,
}

fn read_varint(bytes: &[u8], pos: &mut usize) -> Result<u64, StoreError> {
    let mut value = 0u64;
    let mut shift = 0;
    loop {
        let byte = *bytes.get(*pos).ok_or_else(|| {
            StoreError::InvalidArchive("truncated PMTiles directory".to_string())
        })?;
        *pos += 1;
        if shift >= 64 {
            return Err(StoreError::InvalidArchive("varint overflow".to_string()));
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Decodes an uncompressed directory.
pub fn decode_directory(bytes: &[u8]) -> Result<Vec<Entry>, StoreError> {
    let mut pos = 0;
    let count = read_varint(bytes, &mut pos)? as usize;
    if count > bytes.len() {
        return Err(StoreError::InvalidArchive(format!(
            "directory claims {} entries in {} bytes",
            count,
            bytes.len()
        )));
    }

    let mut entries = vec![
        Entry {
            tile_id: 0,
            offset: 0,
            length: 0,
            run_length: 0,
        };
        count
    ];

    let mut last_id = 0u64;
    for entry in entries.iter_mut() {
        last_id += read_varint(bytes, &mut pos)?;
        entry.tile_id = last_id;
    }
    for entry in entries.iter_mut() {
        entry.run_length = read_varint(bytes, &mut pos)? as u32;
    }
    for entry in entries.iter_mut() {
        entry.length = read_varint(bytes, &mut pos)? as u32;
    }
    for i in 0..count {
        let value = read_varint(bytes, &mut pos)?;
        entries[i].offset = if value == 0 && i > 0 {
            entries[i - 1].offset + u64::from(entries[i - 1].length)
        } else {
            value.saturating_sub(1)
        };
    }

    Ok(entries)
}

/// Finds the entry covering `tile_id`: an exact match, a run containing it,
/// or the leaf directory pointer preceding it.
pub fn find_entry(entries: &[Entry], tile_id: u64) -> Option<&Entry> {
    match entries.binary_search_by_key(&tile_id, |e| e.tile_id) {
        Ok(i) => Some(&entries[i]),
        Err(0) => None,
        Err(i) => {
            let entry = &entries[i - 1];
            if entry.run_length == 0 || tile_id - entry.tile_id < u64::from(entry.run_length) {
                Some(entry)
            } else {
                None
            }
        }
    }
}

fn rotate(n: u64, x: &mut u64, y: &mut u64, rx: u64, ry: u64) {
    if ry == 0 {
        if rx == 1 {
            *x = n - 1 - *x;
            *y = n - 1 - *y;
        }
        std::mem::swap(x, y);
    }
}

/// Hilbert tile id for slippy-map coordinates.
pub fn tile_id(zoom: u8, x: u32, y: u32) -> u64 {
    let base = ((1u64 << (2 * u32::from(zoom))) - 1) / 3;

    let n = 1u64 << zoom;
    let (mut x, mut y) = (u64::from(x), u64::from(y));
    let mut d = 0u64;
    let mut s = n / 2;
    while s > 0 {
        let rx = u64::from((x & s) > 0);
        let ry = u64::from((y & s) > 0);
        d += s * s * ((3 * rx) ^ ry);
        rotate(n, &mut x, &mut y, rx, ry);
        s /= 2;
    }

    base + d
}

fn decompress(data: Vec<u8>, compression: Compression) -> Result<Vec<u8>, StoreError> {
    match compression {
        Compression::None | Compression::Unknown => Ok(data),
        Compression::Gzip => {
            let mut out = Vec::new();
            GzDecoder::new(data.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| StoreError::Decompress(e.to_string()))?;
            Ok(out)
        }
        other => Err(StoreError::InvalidArchive(format!(
            "unsupported PMTiles compression {:?}",
            other
        ))),
    }
}

/// Byte-range access to an archive.
pub trait RangeSource: Send + Sync {
    /// Reads exactly `length` bytes at `offset`.
    fn read_range(
        &self,
        offset: u64,
        length: u64,
    ) -> impl Future<Output = Result<Vec<u8>, StoreError>> + Send;
}

/// Local archive opened once and read with explicit seeks.
pub struct LocalRangeSource {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
    /// Size at open; ranges past it come from a corrupt header or directory
    len: u64,
}

impl LocalRangeSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| StoreError::io(&path, e))?
            .len();
        Ok(Self {
            path,
            file: Mutex::new(file),
            len,
        })
    }
}

impl RangeSource for LocalRangeSource {
    async fn read_range(&self, offset: u64, length: u64) -> Result<Vec<u8>, StoreError> {
        if offset.checked_add(length).map_or(true, |end| end > self.len) {
            return Err(StoreError::InvalidArchive(format!(
                "{}: range {}+{} is past the end of the {}-byte file",
                self.path.display(),
                offset,
                length,
                self.len
            )));
        }

        let mut file = self.file.lock().await;
        let mut buf = vec![0u8; length as usize];
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.read_exact(&mut buf)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(buf)
    }
}

/// Remote archive read with HTTP range requests.
pub struct HttpRangeSource<C: AsyncHttpClient> {
    client: C,
    url: String,
}

impl<C: AsyncHttpClient> HttpRangeSource<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl<C: AsyncHttpClient> RangeSource for HttpRangeSource<C> {
    async fn read_range(&self, offset: u64, length: u64) -> Result<Vec<u8>, StoreError> {
        let end = offset.checked_add(length).ok_or_else(|| {
            StoreError::InvalidArchive(format!("range {}+{} overflows", offset, length))
        })?;
        let range = format!("bytes={}-{}", offset, end.saturating_sub(1).max(offset));
        trace!(url = %self.url, range = %range, "PMTiles range request");
        let body = self
            .client
            .get_with_headers(&self.url, &[("Range", range.as_str())])
            .await?;

        // Servers that ignore Range send the whole file
        let (start, end) = (offset as usize, end as usize);
        if body.len() > length as usize && body.len() >= end {
            return Ok(body[start..end].to_vec());
        }
        if body.len() != length as usize {
            return Err(StoreError::InvalidArchive(format!(
                "range {} returned {} bytes",
                range,
                body.len()
            )));
        }
        Ok(body)
    }
}

/// Reader over any [`RangeSource`].
pub struct PmtilesReader<S: RangeSource> {
    source: S,
    header: PmtilesHeader,
    root: Vec<Entry>,
}

impl<S: RangeSource> PmtilesReader<S> {
    /// Reads the header and root directory.
    pub async fn open(source: S) -> Result<Self, StoreError> {
        let header_bytes = source.read_range(0, HEADER_LEN as u64).await?;
        let header = PmtilesHeader::parse(&header_bytes)?;

        let root_bytes = source
            .read_range(header.root_dir_offset, header.root_dir_length)
            .await?;
        let root = decode_directory(&decompress(root_bytes, header.internal_compression)?)?;

        Ok(Self {
            source,
            header,
            root,
        })
    }

    pub fn header(&self) -> &PmtilesHeader {
        &self.header
    }

    /// Source descriptor with `tiles_url` as the tile template.
    pub fn tilejson(&self, tiles_url: String) -> TileJson {
        let h = &self.header;
        TileJson {
            minzoom: Some(h.min_zoom),
            maxzoom: Some(h.max_zoom),
            bounds: Some(h.bounds),
            center: Some([h.center_lon, h.center_lat, f64::from(h.center_zoom)]),
            format: h.tile_type.format().map(str::to_string),
            ..TileJson::new(vec![tiles_url])
        }
    }

    /// Reads one tile. Absent tiles and zooms outside the archive are `Ok(None)`.
    pub async fn get_tile(&self, zoom: u8, x: u32, y: u32) -> Result<Option<Vec<u8>>, StoreError> {
        if zoom < self.header.min_zoom || zoom > self.header.max_zoom || zoom > 26 {
            return Ok(None);
        }
        let id = tile_id(zoom, x, y);

        let mut leaf: Option<Vec<Entry>> = None;
        for _ in 0..MAX_DIRECTORY_DEPTH {
            let directory = leaf.as_deref().unwrap_or(self.root.as_slice());
            let Some(entry) = find_entry(directory, id).copied() else {
                return Ok(None);
            };

            if entry.run_length > 0 {
                let data = self
                    .source
                    .read_range(
                        self.header.tile_data_offset + entry.offset,
                        u64::from(entry.length),
                    )
                    .await?;
                return decompress(data, self.header.tile_compression).map(Some);
            }

            let bytes = self
                .source
                .read_range(
                    self.header.leaf_dirs_offset + entry.offset,
                    u64::from(entry.length),
                )
                .await?;
            leaf = Some(decode_directory(&decompress(
                bytes,
                self.header.internal_compression,
            )?)?);
        }

        Err(StoreError::InvalidArchive(
            "PMTiles directory nesting too deep".to_string(),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use tempfile::TempDir;

    fn write_varint(out: &mut Vec<u8>, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                return;
            }
            out.push(byte | 0x80);
        }
    }

    pub(crate) fn encode_directory(entries: &[Entry]) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, entries.len() as u64);
        let mut last = 0;
        for e in entries {
            write_varint(&mut out, e.tile_id - last);
            last = e.tile_id;
        }
        for e in entries {
            write_varint(&mut out, u64::from(e.run_length));
        }
        for e in entries {
            write_varint(&mut out, u64::from(e.length));
        }
        for e in entries {
            write_varint(&mut out, e.offset + 1);
        }
        out
    }

    /// Builds an uncompressed archive holding `tiles` (z, x, y, bytes).
    pub(crate) fn build_archive(tiles: &[(u8, u32, u32, &[u8])], bounds_e7: [i32; 4]) -> Vec<u8> {
        let mut sorted: Vec<_> = tiles
            .iter()
            .map(|(z, x, y, d)| (tile_id(*z, *x, *y), *d))
            .collect();
        sorted.sort_by_key(|(id, _)| *id);

        let mut data = Vec::new();
        let mut entries = Vec::new();
        for (id, bytes) in &sorted {
            entries.push(Entry {
                tile_id: *id,
                offset: data.len() as u64,
                length: bytes.len() as u32,
                run_length: 1,
            });
            data.extend_from_slice(bytes);
        }
        let root = encode_directory(&entries);

        let min_zoom = tiles.iter().map(|t| t.0).min().unwrap_or(0);
        let max_zoom = tiles.iter().map(|t| t.0).max().unwrap_or(0);

        let mut header = vec![0u8; HEADER_LEN];
        header[0..7].copy_from_slice(MAGIC);
        header[7] = 3;
        let root_offset = HEADER_LEN as u64;
        let data_offset = root_offset + root.len() as u64;
        header[8..16].copy_from_slice(&root_offset.to_le_bytes());
        header[16..24].copy_from_slice(&(root.len() as u64).to_le_bytes());
        header[40..48].copy_from_slice(&data_offset.to_le_bytes());
        header[56..64].copy_from_slice(&data_offset.to_le_bytes());
        header[64..72].copy_from_slice(&(data.len() as u64).to_le_bytes());
        header[97] = 1;
        header[98] = 1;
        header[99] = 2;
        header[100] = min_zoom;
        header[101] = max_zoom;
        for (i, v) in bounds_e7.iter().enumerate() {
            header[102 + i * 4..106 + i * 4].copy_from_slice(&v.to_le_bytes());
        }

        let mut out = header;
        out.extend_from_slice(&root);
        out.extend_from_slice(&data);
        out
    }

    /// HTTP client serving byte ranges of an in-memory archive.
    #[derive(Clone)]
    struct RangeServer {
        body: Vec<u8>,
    }

    impl AsyncHttpClient for RangeServer {
        async fn get(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
            Ok(self.body.clone())
        }

        async fn get_with_headers(
            &self,
            _url: &str,
            headers: &[(&str, &str)],
        ) -> Result<Vec<u8>, ProviderError> {
            let range = headers
                .iter()
                .find(|(k, _)| *k == "Range")
                .map(|(_, v)| v.trim_start_matches("bytes=").to_string())
                .ok_or_else(|| ProviderError::HttpError("no range".into()))?;
            let (start, end) = range.split_once('-').unwrap();
            let (start, end): (usize, usize) = (start.parse().unwrap(), end.parse().unwrap());
            Ok(self.body[start..=end].to_vec())
        }
    }

    #[test]
    fn test_tile_ids() {
        assert_eq!(tile_id(0, 0, 0), 0);
        assert_eq!(tile_id(1, 0, 0), 1);
        assert_eq!(tile_id(1, 0, 1), 2);
        assert_eq!(tile_id(1, 1, 1), 3);
        assert_eq!(tile_id(1, 1, 0), 4);
        assert_eq!(tile_id(2, 0, 0), 5);
    }

    #[test]
    fn test_directory_roundtrip_with_contiguous_offsets() {
        let entries = vec![
            Entry { tile_id: 1, offset: 0, length: 10, run_length: 1 },
            Entry { tile_id: 2, offset: 10, length: 5, run_length: 2 },
        ];
        let mut encoded = encode_directory(&entries);
        // Second offset encoded as 0 means "directly after the previous entry"
        let last = encoded.len() - 1;
        encoded[last] = 0;
        assert_eq!(decode_directory(&encoded).unwrap(), entries);
    }

    #[test]
    fn test_find_entry_run_and_leaf() {
        let entries = vec![
            Entry { tile_id: 5, offset: 0, length: 1, run_length: 3 },
            Entry { tile_id: 20, offset: 1, length: 1, run_length: 0 },
        ];
        assert!(find_entry(&entries, 4).is_none());
        assert_eq!(find_entry(&entries, 7).unwrap().tile_id, 5);
        assert!(find_entry(&entries, 8).is_none());
        assert_eq!(find_entry(&entries, 99).unwrap().tile_id, 20);
    }

    #[test]
    fn test_header_defaults_degenerate_bounds() {
        let archive = build_archive(&[(0, 0, 0, b"a"), (4, 1, 1, b"b")], [0; 4]);
        let header = PmtilesHeader::parse(&archive).unwrap();
        assert_eq!(header.bounds, [MIN_LON, MIN_LAT, MAX_LON, MAX_LAT]);
        assert_eq!(header.center_zoom, 2);
        assert_eq!(header.tile_type, TileType::Png);
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut archive = build_archive(&[(0, 0, 0, b"a")], [0; 4]);
        archive[0] = b'X';
        assert!(PmtilesHeader::parse(&archive).is_err());
    }

    #[tokio::test]
    async fn test_local_reader() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.pmtiles");
        let archive = build_archive(
            &[(0, 0, 0, b"zero"), (1, 1, 0, b"one"), (2, 3, 1, b"two")],
            [-790_000_000, 370_000_000, -770_000_000, 380_000_000],
        );
        std::fs::write(&path, archive).unwrap();

        let reader = PmtilesReader::open(LocalRangeSource::open(&path).await.unwrap())
            .await
            .unwrap();
        assert_eq!(reader.get_tile(1, 1, 0).await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(reader.get_tile(2, 3, 1).await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(reader.get_tile(1, 0, 0).await.unwrap(), None);
        assert_eq!(reader.get_tile(9, 0, 0).await.unwrap(), None);

        let tilejson = reader.tilejson("pmtiles://a/{z}/{x}/{y}".into());
        assert_eq!(tilejson.bounds, Some([-79.0, 37.0, -77.0, 38.0]));
        assert_eq!(tilejson.format.as_deref(), Some("png"));
    }

    #[tokio::test]
    async fn test_local_range_past_end_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.pmtiles");
        std::fs::write(&path, [7u8; 16]).unwrap();
        let source = LocalRangeSource::open(&path).await.unwrap();

        assert_eq!(source.read_range(4, 12).await.unwrap(), vec![7u8; 12]);
        for (offset, length) in [(10, 100), (0, u64::MAX), (u64::MAX, 2)] {
            assert!(
                matches!(
                    source.read_range(offset, length).await,
                    Err(StoreError::InvalidArchive(_))
                ),
                "{}+{}",
                offset,
                length
            );
        }
    }

    #[tokio::test]
    async fn test_corrupt_directory_length_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.pmtiles");
        let mut archive = build_archive(&[(0, 0, 0, b"zero".as_slice())], [0; 4]);
        // root directory length
        archive[16..24].copy_from_slice(&(1u64 << 60).to_le_bytes());
        std::fs::write(&path, archive).unwrap();

        let result = PmtilesReader::open(LocalRangeSource::open(&path).await.unwrap()).await;
        assert!(matches!(result, Err(StoreError::InvalidArchive(_))));
    }

    #[tokio::test]
    async fn test_remote_reader() {
        let archive = build_archive(&[(0, 0, 0, b"zero"), (1, 0, 1, b"sw")], [0; 4]);
        let source = HttpRangeSource::new(RangeServer { body: archive }, "https://x/a.pmtiles");
        let reader = PmtilesReader::open(source).await.unwrap();
        assert_eq!(reader.get_tile(1, 0, 1).await.unwrap(), Some(b"sw".to_vec()));
        assert_eq!(reader.header().min_zoom, 0);
    }
}
