//! Job requests and their validation.
//!
//! A [`JobRequest`] is the loosely-typed description received from the CLI
//! or the queue (camelCase on the wire). [`JobRequest::validate`] turns it
//! into an [`ArchiveJob`] or a caller-fault [`JobError`].

use super::error::JobError;
use crate::config::ProviderSettings;
use crate::coord::{BoundingBox, ZoomRange, MAX_ZOOM, MIN_ZOOM};
use crate::provider::{requires_api_key, ProviderConfig, ProviderCredentials, PROVIDER_NAMES};
use crate::render::{ImageFormat, MAX_RATIO};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Style selector for a caller-supplied style document.
pub const SELF_STYLE: &str = "self";

/// Output file name used when the request names none.
pub const DEFAULT_OUTPUT_NAME: &str = "output";

/// Extension of published archives.
pub const ARCHIVE_EXTENSION: &str = "mbtiles";

fn month_year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}$").expect("valid month pattern"))
}

fn mapbox_style_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w-]+/[\w-]+$").expect("valid mapbox style pattern"))
}

/// An unvalidated archive request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRequest {
    /// Provider shorthand or `self`
    pub style: String,
    /// Style document, for `self`
    pub style_path: Option<PathBuf>,
    /// Local sources, for `self`
    pub source_dir: Option<PathBuf>,
    pub api_key: Option<String>,
    pub mapbox_style: Option<String>,
    pub month_year: Option<String>,
    /// GeoJSON drawn over provider imagery
    pub overlay: Option<String>,
    /// `"west,south,east,north"`
    pub bounds: String,
    pub min_zoom: i64,
    pub max_zoom: Option<i64>,
    pub ratio: u32,
    #[serde(rename = "tiletype")]
    pub format: String,
    pub output_dir: Option<PathBuf>,
    #[serde(rename = "outputFilename")]
    pub output_name: String,
}

impl Default for JobRequest {
    fn default() -> Self {
        Self {
            style: String::new(),
            style_path: None,
            source_dir: None,
            api_key: None,
            mapbox_style: None,
            month_year: None,
            overlay: None,
            bounds: String::new(),
            min_zoom: 0,
            max_zoom: None,
            ratio: 1,
            format: ImageFormat::Jpg.to_string(),
            output_dir: None,
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

/// Where the style document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleSource {
    /// Generated for imagery acquired from an online provider
    Provider(ProviderConfig),
    /// A style file with sources under `source_dir`
    Local {
        style_path: PathBuf,
        source_dir: PathBuf,
    },
}

/// A validated archive job.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveJob {
    pub style: StyleSource,
    /// Parsed-and-checked GeoJSON text
    pub overlay: Option<String>,
    pub bounds: BoundingBox,
    pub zooms: ZoomRange,
    pub ratio: u32,
    pub format: ImageFormat,
    pub output_dir: PathBuf,
    pub output_name: String,
}

impl ArchiveJob {
    /// Final path of the published archive.
    pub fn destination(&self) -> PathBuf {
        archive_path(&self.output_dir, &self.output_name)
    }
}

/// `dir/name.mbtiles`, unless `name` already carries the extension.
pub fn archive_path(dir: &Path, name: &str) -> PathBuf {
    if Path::new(name).extension().is_some_and(|e| e == ARCHIVE_EXTENSION) {
        dir.join(name)
    } else {
        dir.join(format!("{}.{}", name, ARCHIVE_EXTENSION))
    }
}

/// Checks that `name` names a file directly inside the output directory and
/// returns it trimmed.
pub fn validate_output_name(name: &str) -> Result<&str, JobError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.contains(['/', '\\'])
        || trimmed == "."
        || trimmed == ".."
        || Path::new(trimmed).is_absolute()
    {
        return Err(JobError::invalid(format!(
            "Output filename must be a plain file name: '{}'",
            name
        )));
    }
    Ok(trimmed)
}

impl JobRequest {
    /// Fills a missing API key from the configured provider credentials.
    pub fn with_provider_defaults(mut self, providers: &ProviderSettings) -> Self {
        if self.api_key.is_none() {
            self.api_key = match self.style.as_str() {
                "mapbox" | "mapbox-satellite" => providers.mapbox_access_token.clone(),
                "planet" => providers.planet_api_key.clone(),
                "protomaps" => providers.protomaps_api_key.clone(),
                "esri" => providers.esri_token.clone(),
                _ => None,
            };
        }
        self
    }

    /// Checks every field and builds the job. `default_output_dir` applies
    /// when the request names no output directory.
    pub fn validate(&self, default_output_dir: &Path) -> Result<ArchiveJob, JobError> {
        let style = self.validate_style()?;
        let overlay = self.validate_overlay()?;
        let zooms = self.validate_zooms()?;
        let bounds = self.validate_bounds()?;

        let format: ImageFormat = self.format.parse().map_err(JobError::invalid)?;
        if !(1..=MAX_RATIO).contains(&self.ratio) {
            return Err(JobError::invalid(format!(
                "Pixel ratio must be between 1 and {}: {}",
                MAX_RATIO, self.ratio
            )));
        }

        let output_name = validate_output_name(&self.output_name)?;

        Ok(ArchiveJob {
            style,
            overlay,
            bounds,
            zooms,
            ratio: self.ratio,
            format,
            output_dir: self
                .output_dir
                .clone()
                .unwrap_or_else(|| default_output_dir.to_path_buf()),
            output_name: output_name.to_string(),
        })
    }

    fn validate_style(&self) -> Result<StyleSource, JobError> {
        let style = self.style.trim();
        if style.is_empty() {
            return Err(JobError::invalid("You must provide a style"));
        }

        if style == SELF_STYLE {
            return match (&self.style_path, &self.source_dir) {
                (Some(style_path), Some(source_dir)) => Ok(StyleSource::Local {
                    style_path: style_path.clone(),
                    source_dir: source_dir.clone(),
                }),
                _ => Err(JobError::invalid(
                    "A self-provided style needs both a style location and a source directory",
                )),
            };
        }

        if !PROVIDER_NAMES.contains(&style) {
            return Err(JobError::invalid(format!(
                "Invalid style. Supported styles: {}, {}",
                PROVIDER_NAMES.join(", "),
                SELF_STYLE
            )));
        }

        let api_key = self.api_key.as_deref().filter(|k| !k.is_empty());
        if requires_api_key(style) && api_key.is_none() {
            return Err(JobError::invalid(format!(
                "You must provide an API key for {}",
                style
            )));
        }

        if style == "planet" && self.month_year.is_none() {
            return Err(JobError::invalid(
                "Planet imagery needs a mosaic month and year (YYYY-MM)",
            ));
        }
        if let Some(month_year) = &self.month_year {
            if !month_year_pattern().is_match(month_year) {
                return Err(JobError::invalid("Month and year must be in YYYY-MM format"));
            }
        }

        if style == "mapbox" && self.mapbox_style.is_none() {
            return Err(JobError::invalid(
                "Mapbox imagery needs a Mapbox style (<username>/<styleid>)",
            ));
        }
        if let Some(mapbox_style) = &self.mapbox_style {
            if !mapbox_style_pattern().is_match(mapbox_style) {
                return Err(JobError::invalid(
                    "Mapbox style must be in the form <username>/<styleid>",
                ));
            }
        }

        let credentials = ProviderCredentials {
            api_key: api_key.map(str::to_string),
            mapbox_style: self.mapbox_style.clone(),
            month_year: self.month_year.clone(),
        };
        Ok(StyleSource::Provider(ProviderConfig::from_style(
            style,
            &credentials,
        )?))
    }

    fn validate_bounds(&self) -> Result<BoundingBox, JobError> {
        let bounds: BoundingBox = self.bounds.parse()?;
        if bounds.west() > bounds.east() || bounds.south() > bounds.north() {
            return Err(JobError::invalid(format!(
                "Bounds must be ordered west,south,east,north: {}",
                self.bounds
            )));
        }
        Ok(bounds)
    }

    fn validate_overlay(&self) -> Result<Option<String>, JobError> {
        let Some(overlay) = self.overlay.as_deref().filter(|o| !o.trim().is_empty()) else {
            return Ok(None);
        };
        match serde_json::from_str::<serde_json::Value>(overlay) {
            Ok(value) if value.is_object() => Ok(Some(overlay.to_string())),
            _ => Err(JobError::invalid("Overlay must be a valid JSON object")),
        }
    }

    fn validate_zooms(&self) -> Result<ZoomRange, JobError> {
        let check = |name: &str, zoom: i64| -> Result<u8, JobError> {
            if zoom < i64::from(MIN_ZOOM) || zoom > i64::from(MAX_ZOOM) {
                return Err(JobError::invalid(format!(
                    "{} level is outside supported range ({}-{}): {}",
                    name, MIN_ZOOM, MAX_ZOOM, zoom
                )));
            }
            Ok(zoom as u8)
        };

        let min = check("minZoom", self.min_zoom)?;
        let max = match self.max_zoom {
            Some(zoom) => check("maxZoom", zoom)?,
            None => return Err(JobError::invalid("You must provide a maxZoom")),
        };
        Ok(ZoomRange::new(min, max)?)
    }
}
