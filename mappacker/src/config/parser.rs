//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::render::{checked_pixel_size, ImageFormat, MAX_PIXEL_SIZE, MAX_RATIO};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [output] section
    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.output.directory = expand_tilde(v);
        }
    }

    // [workspace] section
    if let Some(section) = ini.section(Some("workspace")) {
        if let Some(v) = non_empty(section.get("temp_dir")) {
            config.workspace.temp_dir = expand_tilde(v);
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("timeout") {
            config.download.timeout = parse_positive(v, "download", "timeout", "(seconds)")?;
        }
        if let Some(v) = section.get("parallel") {
            config.download.parallel =
                parse_positive::<u64>(v, "download", "parallel", "")? as usize;
        }
    }

    // [render] section
    if let Some(section) = ini.section(Some("render")) {
        if let Some(v) = section.get("tile_size") {
            config.render.tile_size = parse_positive(v, "render", "tile_size", "(pixels)")?;
        }
        if let Some(v) = section.get("ratio") {
            config.render.ratio = parse_positive(v, "render", "ratio", "")?;
            if config.render.ratio > MAX_RATIO {
                return Err(ConfigFileError::InvalidValue {
                    section: "render".to_string(),
                    key: "ratio".to_string(),
                    value: v.to_string(),
                    reason: format!("must be at most {}", MAX_RATIO),
                });
            }
        }
        if checked_pixel_size(config.render.tile_size, config.render.ratio).is_none() {
            return Err(ConfigFileError::InvalidValue {
                section: "render".to_string(),
                key: "tile_size".to_string(),
                value: config.render.tile_size.to_string(),
                reason: format!(
                    "tile_size x ratio must not exceed {} pixels",
                    MAX_PIXEL_SIZE
                ),
            });
        }
        if let Some(v) = section.get("format") {
            config.render.format =
                v.parse::<ImageFormat>()
                    .map_err(|_| ConfigFileError::InvalidValue {
                        section: "render".to_string(),
                        key: "format".to_string(),
                        value: v.to_string(),
                        reason: "must be one of: jpg, png, webp".to_string(),
                    })?;
        }
    }

    // [provider] section
    if let Some(section) = ini.section(Some("provider")) {
        config.provider.mapbox_access_token =
            non_empty(section.get("mapbox_access_token")).map(String::from);
        config.provider.planet_api_key = non_empty(section.get("planet_api_key")).map(String::from);
        config.provider.protomaps_api_key =
            non_empty(section.get("protomaps_api_key")).map(String::from);
        config.provider.esri_token = non_empty(section.get("esri_token")).map(String::from);
    }

    // [queue] section
    if let Some(section) = ini.section(Some("queue")) {
        if let Some(v) = non_empty(section.get("spool_dir")) {
            config.queue.spool_dir = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("status_dir")) {
            config.queue.status_dir = expand_tilde(v);
        }
        config.queue.destination_dir = non_empty(section.get("destination_dir")).map(expand_tilde);
        if let Some(v) = section.get("poll_interval") {
            config.queue.poll_interval = parse_positive(v, "queue", "poll_interval", "(seconds)")?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_positive<T>(value: &str, section: &str, key: &str, unit: &str) -> Result<T, ConfigFileError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: format!("must be a positive integer {}", unit).trim_end().to_string(),
        }),
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use crate::config::settings::ConfigFile;
    use crate::render::ImageFormat;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, crate::config::ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_overlays_values() {
        let config = load(
            r#"
[download]
parallel = 8
timeout = 12

[render]
format = webp
ratio = 2

[provider]
planet_api_key = abc
mapbox_access_token =

[queue]
spool_dir = /var/spool/maps
poll_interval = 3
"#,
        )
        .unwrap();

        assert_eq!(config.download.parallel, 8);
        assert_eq!(config.download.timeout, 12);
        assert_eq!(config.render.format, ImageFormat::Webp);
        assert_eq!(config.render.ratio, 2);
        assert_eq!(config.render.tile_size, 512);
        assert_eq!(config.provider.planet_api_key.as_deref(), Some("abc"));
        assert!(config.provider.mapbox_access_token.is_none());
        assert_eq!(config.queue.spool_dir, PathBuf::from("/var/spool/maps"));
        assert_eq!(config.queue.poll_interval, 3);
    }

    #[test]
    fn test_invalid_format() {
        let err = load("[render]\nformat = tiff\n").unwrap_err();
        assert!(err.to_string().contains("must be one of: jpg, png, webp"));
    }

    #[test]
    fn test_zero_parallel_rejected() {
        let err = load("[download]\nparallel = 0\n").unwrap_err();
        assert!(err.to_string().contains("download.parallel"));
    }

    #[test]
    fn test_non_numeric_timeout_rejected() {
        assert!(load("[download]\ntimeout = soon\n").is_err());
    }

    #[test]
    fn test_oversized_render_rejected() {
        let err = load("[render]\nratio = 64\n").unwrap_err();
        assert!(err.to_string().contains("render.ratio"));

        let err = load("[render]\ntile_size = 2048\nratio = 4\n").unwrap_err();
        assert!(err.to_string().contains("render.tile_size"));
    }
}
