//! Archive metadata defaults merged with the source directory's metadata.json.

use crate::coord::{BoundingBox, ZoomRange};
use crate::render::ImageFormat;
use crate::store::directory::{read_optional, METADATA_FILE};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

const FORMAT_KEY: &str = "format";

/// Computed defaults for the archive's metadata table.
pub fn default_metadata(
    name: &str,
    format: ImageFormat,
    zooms: ZoomRange,
    bounds: &BoundingBox,
) -> BTreeMap<String, String> {
    let (lon, lat) = bounds.center();
    let b = bounds.to_array();

    [
        ("name", name.to_string()),
        (FORMAT_KEY, format.as_str().to_string()),
        ("minzoom", zooms.min().to_string()),
        ("maxzoom", zooms.max().to_string()),
        ("type", "overlay".to_string()),
        ("bounds", format!("{},{},{},{}", b[0], b[1], b[2], b[3])),
        ("center", format!("{},{},{}", lon, lat, zooms.min())),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Merges `<source_dir>/metadata.json` over `defaults`; file values win,
/// except `format`, which always names the encoding the tiles were written in.
///
/// A missing file is silent. An unreadable or malformed file is logged and
/// ignored.
pub async fn merge_source_metadata(
    mut defaults: BTreeMap<String, String>,
    source_dir: Option<&Path>,
) -> BTreeMap<String, String> {
    let Some(dir) = source_dir else {
        return defaults;
    };
    let path = dir.join(METADATA_FILE);

    let bytes = match read_optional(&path).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return defaults,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable metadata file");
            return defaults;
        }
    };

    let format = defaults.get(FORMAT_KEY).cloned();
    match serde_json::from_slice::<serde_json::Map<String, Value>>(&bytes) {
        Ok(object) => {
            for (key, value) in object {
                let value = match value {
                    Value::String(s) => s,
                    Value::Null => continue,
                    other => other.to_string(),
                };
                defaults.insert(key, value);
            }
        }
        Err(e) => warn!(path = %path.display(), error = %e, "Ignoring malformed metadata file"),
    }
    if let Some(format) = format {
        if defaults.get(FORMAT_KEY) != Some(&format) {
            warn!(path = %path.display(), format = %format, "Source metadata format ignored");
        }
        defaults.insert(FORMAT_KEY.to_string(), format);
    }
    defaults
}
