//! Render command - package one archive and exit.

use clap::Args;
use mappacker::job::{JobRequest, JobResult, DEFAULT_OUTPUT_NAME};
use std::path::PathBuf;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the render command.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Provider shorthand (bing, esri, google, mapbox, mapbox-satellite,
    /// planet, protomaps) or "self" for a local style
    #[arg(long)]
    pub style: String,

    /// Style document, required with --style self
    #[arg(long)]
    pub style_path: Option<PathBuf>,

    /// Directory holding the style's local sources, required with --style self
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Provider API key (falls back to the [provider] section of config.ini)
    #[arg(long)]
    pub api_key: Option<String>,

    /// MapBox style as user/style, required with --style mapbox
    #[arg(long)]
    pub mapbox_style: Option<String>,

    /// Planet mosaic month as YYYY-MM, required with --style planet
    #[arg(long)]
    pub month_year: Option<String>,

    /// Inline GeoJSON drawn over provider imagery
    #[arg(long, conflicts_with = "overlay_file")]
    pub overlay: Option<String>,

    /// File holding GeoJSON drawn over provider imagery
    #[arg(long)]
    pub overlay_file: Option<PathBuf>,

    /// Bounding box as west,south,east,north
    #[arg(long, allow_hyphen_values = true)]
    pub bounds: String,

    /// Lowest zoom level to render
    #[arg(long, default_value_t = 0)]
    pub min_zoom: i64,

    /// Highest zoom level to render
    #[arg(long)]
    pub max_zoom: i64,

    /// Device pixel ratio
    #[arg(long, default_value_t = 1)]
    pub ratio: u32,

    /// Tile encoding: jpg, png or webp
    #[arg(long, default_value = "jpg")]
    pub format: String,

    /// Directory for the archive (defaults to [output] directory in config.ini)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Archive file name; ".mbtiles" is appended when missing
    #[arg(long, default_value = DEFAULT_OUTPUT_NAME)]
    pub output: String,
}

impl RenderArgs {
    fn into_request(self) -> Result<JobRequest, CliError> {
        let overlay = match (self.overlay, self.overlay_file) {
            (Some(inline), _) => Some(inline),
            (None, Some(path)) => Some(std::fs::read_to_string(&path).map_err(|e| {
                CliError::Config(format!(
                    "Failed to read overlay file '{}': {}",
                    path.display(),
                    e
                ))
            })?),
            (None, None) => None,
        };

        Ok(JobRequest {
            style: self.style,
            style_path: self.style_path,
            source_dir: self.source_dir,
            api_key: self.api_key,
            mapbox_style: self.mapbox_style,
            month_year: self.month_year,
            overlay,
            bounds: self.bounds,
            min_zoom: self.min_zoom,
            max_zoom: Some(self.max_zoom),
            ratio: self.ratio,
            format: self.format,
            output_dir: self.output_dir,
            output_name: self.output,
        })
    }
}

/// Run the render command.
pub fn run(args: RenderArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(true)?;
    runner.log_startup("render");
    let config = runner.config();

    let request = args.into_request()?.with_provider_defaults(&config.provider);
    let job = request.validate(&config.output.directory)?;

    info!(
        bounds = %request.bounds,
        min_zoom = job.zooms.min(),
        max_zoom = job.zooms.max(),
        destination = %job.destination().display(),
        "Packaging archive"
    );

    let job_runner = runner.job_runner()?;
    let runtime = runner.runtime()?;
    let result = runtime.block_on(job_runner.run(&job));

    report(&result)
}

/// Prints the outcome, turning a failed result into a [`CliError`].
fn report(result: &JobResult) -> Result<(), CliError> {
    if !result.is_success() {
        return Err(CliError::Job {
            status: result.status,
            message: result
                .error_message
                .clone()
                .unwrap_or_else(|| "Job failed".to_string()),
        });
    }

    println!();
    if let Some(path) = &result.file_location {
        println!("Archive written: {}", path.display());
    }
    if let Some(tiles) = result.number_of_tiles {
        println!("  Tiles: {}", tiles);
    }
    if let Some(size) = result.filesize {
        println!("  Size:  {:.2} MB", size as f64 / 1_048_576.0);
    }
    if let (Some(begun), Some(ended)) = (result.work_begun, result.work_ended) {
        let secs = (ended - begun).num_milliseconds() as f64 / 1000.0;
        println!("  Time:  {:.1}s", secs);
    }

    Ok(())
}
