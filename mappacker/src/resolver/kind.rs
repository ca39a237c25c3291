//! URL classification for source and tile requests.

use super::ResolveError;
use crate::coord::TileCoord;
use crate::store::remote::is_network_url;
use regex::Regex;
use std::sync::OnceLock;

pub const CONTAINER_SCHEME: &str = "mbtiles://";
pub const RANGE_FILE_SCHEME: &str = "pmtiles://";

/// Which store backend services a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// `mbtiles://name[/z/x/y[.ext]]`
    Container,
    /// `pmtiles://name-or-url[/z/x/y[.ext]]`
    RangeFile,
    /// `[scheme://][prefix/]z/x/y[.ext]`
    Directory,
    /// `*.geojson`
    SingleDocument,
    /// `http(s)://...`
    Remote,
}

/// Classifies a URL. Checks run in a fixed order so a URL matching several
/// shapes always lands on the same backend.
pub fn classify(url: &str) -> Result<SourceKind, ResolveError> {
    if url.starts_with(CONTAINER_SCHEME) {
        Ok(SourceKind::Container)
    } else if url.starts_with(RANGE_FILE_SCHEME) {
        Ok(SourceKind::RangeFile)
    } else if is_network_url(url) {
        Ok(SourceKind::Remote)
    } else if url.ends_with(".geojson") {
        Ok(SourceKind::SingleDocument)
    } else if parse_tile_path(strip_scheme(url)).is_some() {
        Ok(SourceKind::Directory)
    } else {
        Err(ResolveError::UnsupportedSource(url.to_string()))
    }
}

/// Classifies a style source reference (a TileJSON URL or a tile template).
///
/// Remote tile sources are rejected: only glyph and sprite requests may go
/// to the network.
pub fn classify_source(url: &str) -> Result<SourceKind, ResolveError> {
    let probe = expand_template(url, TileCoord::new(0, 0, 0));
    match classify(&probe)? {
        SourceKind::Remote => Err(ResolveError::UnsupportedSource(url.to_string())),
        kind => Ok(kind),
    }
}

/// Removes a leading `scheme://`, if any.
pub fn strip_scheme(url: &str) -> &str {
    match url.find("://") {
        Some(i) => &url[i + 3..],
        None => url,
    }
}

fn tile_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // prefix (optional, ends in '/'), then z/x/y and an optional extension
        Regex::new(r"^(?P<prefix>(?:.*/)?)(?P<z>\d+)/(?P<x>\d+)/(?P<y>\d+)(?:\.(?P<ext>[A-Za-z0-9]+))?$")
            .expect("valid tile path regex")
    })
}

/// A `prefix/z/x/y.ext` path split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePath<'a> {
    /// Everything before `z`, without the trailing slash
    pub prefix: &'a str,
    pub tile: TileCoord,
    pub ext: Option<&'a str>,
}

/// Parses a trailing `z/x/y[.ext]`.
pub fn parse_tile_path(path: &str) -> Option<TilePath<'_>> {
    let caps = tile_path_pattern().captures(path)?;
    let zoom: u8 = caps.name("z")?.as_str().parse().ok()?;
    let x: u32 = caps.name("x")?.as_str().parse().ok()?;
    let y: u32 = caps.name("y")?.as_str().parse().ok()?;
    let prefix = caps.name("prefix").map_or("", |m| m.as_str());

    Some(TilePath {
        prefix: prefix.strip_suffix('/').unwrap_or(prefix),
        tile: TileCoord::new(zoom, x, y),
        ext: caps.name("ext").map(|m| m.as_str()),
    })
}

/// Substitutes `{z}`, `{x}` and `{y}` in a tile URL template.
pub fn expand_template(template: &str, tile: TileCoord) -> String {
    template
        .replace("{z}", &tile.zoom.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
}

/// Name of the container in `mbtiles://name/...`.
pub fn container_name(url: &str) -> &str {
    let rest = url.strip_prefix(CONTAINER_SCHEME).unwrap_or(url);
    rest.split('/').next().unwrap_or(rest)
}
