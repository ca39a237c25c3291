//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let provider = &config.provider;
    let destination_dir = config
        .queue
        .destination_dir
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();

    format!(
        r#"[output]
; Directory receiving finished .mbtiles archives
directory = {}

[workspace]
; Parent of the per-job temporary workspace (removed when the job ends)
temp_dir = {}

[download]
; Timeout in seconds for provider HTTP requests (default: 30)
timeout = {}
; Tile downloads in flight at once (default: 5)
parallel = {}

[render]
; Tile edge in logical pixels (default: 512)
tile_size = {}
; Device pixel ratio (default: 1)
ratio = {}
; Encoded tile format: jpg, png or webp (default: jpg)
format = {}

[provider]
; Credentials used when a job does not carry its own
mapbox_access_token = {}
planet_api_key = {}
protomaps_api_key = {}
esri_token = {}

[queue]
; Directory of pending job messages
spool_dir = {}
; Directory of per-request status records
status_dir = {}
; Optional directory receiving completion signals
destination_dir = {}
; Seconds to wait when the queue is empty (default: 10)
poll_interval = {}

[logging]
file = {}
"#,
        path_to_string(&config.output.directory),
        path_to_string(&config.workspace.temp_dir),
        config.download.timeout,
        config.download.parallel,
        config.render.tile_size,
        config.render.ratio,
        config.render.format,
        provider.mapbox_access_token.as_deref().unwrap_or(""),
        provider.planet_api_key.as_deref().unwrap_or(""),
        provider.protomaps_api_key.as_deref().unwrap_or(""),
        provider.esri_token.as_deref().unwrap_or(""),
        path_to_string(&config.queue.spool_dir),
        path_to_string(&config.queue.status_dir),
        destination_dir,
        config.queue.poll_interval,
        path_to_string(&config.logging.file),
    )
}

fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
