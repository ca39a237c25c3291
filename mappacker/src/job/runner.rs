//! Runs a validated [`ArchiveJob`] from acquisition to published archive.

use super::error::JobError;
use super::request::{ArchiveJob, StyleSource};
use super::result::JobResult;
use super::workspace::Workspace;
use crate::acquire::{DownloadLimiter, TileAcquirer};
use crate::assemble::{ArchiveAssembler, ArchiveOutput, AssembleRequest};
use crate::config::{DownloadConfig, RenderConfig};
use crate::provider::{AsyncHttpClient, AsyncProviderFactory};
use crate::render::RenderEngine;
use crate::resolver::{classify_source, SourceResolver};
use crate::store::DirectoryStore;
use crate::style::{generate_style, StyleDocument, OVERLAY_FILE};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Style and directories the assembler works from.
struct PreparedStyle {
    style: StyleDocument,
    source_dir: PathBuf,
    style_dir: Option<PathBuf>,
}

/// Executes archive jobs.
///
/// One runner serves many jobs; the download limiter is shared between them.
pub struct JobRunner<C, E> {
    http_client: C,
    engine: E,
    limiter: Arc<DownloadLimiter>,
    render: RenderConfig,
    temp_dir: PathBuf,
}

impl<C, E> JobRunner<C, E>
where
    C: AsyncHttpClient + Clone,
    E: RenderEngine + Clone,
{
    /// Creates a runner whose workspaces live under `temp_dir`.
    pub fn new(http_client: C, engine: E, temp_dir: impl Into<PathBuf>) -> Self {
        let download = DownloadConfig::default();
        Self {
            http_client,
            engine,
            limiter: Arc::new(DownloadLimiter::new(download.parallel_downloads())),
            render: RenderConfig::default(),
            temp_dir: temp_dir.into(),
        }
    }

    pub fn with_download_config(mut self, config: &DownloadConfig) -> Self {
        self.limiter = Arc::new(DownloadLimiter::new(config.parallel_downloads()));
        self
    }

    /// Base render settings; each job's ratio and format override these.
    pub fn with_render_config(mut self, config: RenderConfig) -> Self {
        self.render = config;
        self
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Runs `job` and reports the outcome. Never fails: errors become a
    /// failure result tagged by fault class.
    pub async fn run(&self, job: &ArchiveJob) -> JobResult {
        let begun = Utc::now();
        match self.execute(job).await {
            Ok(output) => JobResult::success(&output, begun, Utc::now()),
            Err(e) => {
                error!(error = %e, fault = ?e.fault(), "Job failed");
                JobResult::failure(&e).with_timing(begun, Utc::now())
            }
        }
    }

    /// Runs `job`, returning the published archive.
    ///
    /// The workspace is removed whether or not the job succeeds.
    #[instrument(skip_all, fields(output = %job.output_name))]
    pub async fn execute(&self, job: &ArchiveJob) -> Result<ArchiveOutput, JobError> {
        let workspace = Workspace::create(&self.temp_dir, &job.output_name).await?;
        let result = self.execute_in(job, &workspace).await;
        workspace.remove().await;
        result
    }

    async fn execute_in(
        &self,
        job: &ArchiveJob,
        workspace: &Workspace,
    ) -> Result<ArchiveOutput, JobError> {
        let prepared = match &job.style {
            StyleSource::Provider(config) => {
                let sources = DirectoryStore::new(workspace.sources());
                let provider = AsyncProviderFactory::new(self.http_client.clone()).create(config);
                let acquisition = TileAcquirer::new(provider, Arc::clone(&self.limiter))
                    .acquire(&job.bounds, job.zooms, &sources)
                    .await?;
                info!(
                    provider = config.name(),
                    fetched = acquisition.report.fetched(),
                    skipped = acquisition.report.skipped(),
                    failed = acquisition.report.failed(),
                    "Acquisition complete"
                );

                if let Some(overlay) = &job.overlay {
                    sources
                        .write_document(OVERLAY_FILE, overlay.as_bytes())
                        .await
                        .map_err(|e| JobError::Assemble(e.into()))?;
                }

                let style = generate_style(config, job.overlay.is_some());
                let style_file = workspace.style_file();
                tokio::fs::write(&style_file, style.to_json()?)
                    .await
                    .map_err(|e| JobError::io(&style_file, e))?;

                PreparedStyle {
                    style,
                    source_dir: sources.root().to_path_buf(),
                    style_dir: Some(workspace.path().to_path_buf()),
                }
            }
            StyleSource::Local {
                style_path,
                source_dir,
            } => PreparedStyle {
                style: StyleDocument::load(style_path).await?,
                source_dir: source_dir.clone(),
                style_dir: style_path.parent().map(Path::to_path_buf),
            },
        };

        preflight(&prepared.style, &prepared.source_dir).await?;

        let resolver = SourceResolver::new(
            Some(prepared.source_dir.clone()),
            prepared.style_dir,
            self.http_client.clone(),
        );
        let config = self.render.with_ratio(job.ratio).with_format(job.format);
        let assembler = ArchiveAssembler::new(self.engine.clone(), resolver, config);

        let destination = job.destination();
        let output = assembler
            .assemble(&AssembleRequest {
                style: &prepared.style,
                source_dir: Some(&prepared.source_dir),
                bounds: &job.bounds,
                zooms: job.zooms,
                workspace: workspace.path(),
                destination: &destination,
            })
            .await?;
        Ok(output)
    }
}

/// Rejects styles the resolver could not service before any tile is rendered.
async fn preflight(style: &StyleDocument, source_dir: &Path) -> Result<(), JobError> {
    for url in style.source_references() {
        classify_source(url)?;
    }
    style.check_containers(Some(source_dir)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Fault, JobRequest, JobStatus};
    use crate::provider::MockAsyncHttpClient;
    use crate::render::{PixelBuffer, RenderError, RenderParams};
    use crate::resolver::ResourceLoader;
    use crate::store::MbtilesReader;
    use tempfile::TempDir;

    /// Engine painting every tile a solid colour without touching the loader.
    #[derive(Clone, Copy)]
    struct SolidEngine;

    impl RenderEngine for SolidEngine {
        async fn render<L: ResourceLoader>(
            &self,
            _style: &StyleDocument,
            _loader: &L,
            params: &RenderParams,
        ) -> Result<PixelBuffer, RenderError> {
            let size = params.pixel_size();
            Ok(PixelBuffer::filled(size, size, [30, 60, 90, 255]))
        }
    }

    fn local_job(temp: &TempDir, style_json: &str) -> ArchiveJob {
        let style_path = temp.path().join("style.json");
        std::fs::write(&style_path, style_json).unwrap();
        let sources = temp.path().join("sources");
        std::fs::create_dir_all(&sources).unwrap();

        JobRequest {
            style: "self".into(),
            style_path: Some(style_path),
            source_dir: Some(sources),
            bounds: "-79,37,-77,38".into(),
            max_zoom: Some(2),
            output_dir: Some(temp.path().join("maps")),
            ..JobRequest::default()
        }
        .validate(temp.path())
        .unwrap()
    }

    fn runner(temp: &TempDir) -> JobRunner<MockAsyncHttpClient, SolidEngine> {
        JobRunner::new(
            MockAsyncHttpClient::ok(Vec::new()),
            SolidEngine,
            temp.path().join("tmp"),
        )
        .with_render_config(RenderConfig::new().with_tile_size(16))
    }

    #[tokio::test]
    async fn test_local_style_publishes_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let job = local_job(
            &temp,
            r#"{"version":8,"sources":{"imagery":{"type":"raster","tiles":["xyz://{z}/{x}/{y}.jpg"]}},"layers":[]}"#,
        );

        let result = runner(&temp).run(&job).await;
        assert_eq!(result.status, JobStatus::Success, "{:?}", result.error_message);
        assert!(result.work_begun.is_some() && result.work_ended.is_some());

        let path = job.destination();
        assert_eq!(result.file_location.as_deref(), Some(path.as_path()));
        let reader = MbtilesReader::new(&path);
        assert_eq!(reader.metadata().unwrap()["maxzoom"], "2");

        // only the empty temp root remains
        let leftovers = std::fs::read_dir(temp.path().join("tmp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_missing_container_is_caller_fault() {
        let temp = TempDir::new().unwrap();
        let job = local_job(
            &temp,
            r#"{"version":8,"sources":{"roads":{"type":"vector","url":"mbtiles://roads"}},"layers":[]}"#,
        );

        let err = runner(&temp).execute(&job).await.unwrap_err();
        assert_eq!(err.fault(), Fault::Caller);
        assert!(!job.destination().exists());
    }

    #[tokio::test]
    async fn test_remote_tile_source_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let job = local_job(
            &temp,
            r#"{"version":8,"sources":{"osm":{"type":"raster","tiles":["https://tile.example.com/{z}/{x}/{y}.png"]}},"layers":[]}"#,
        );

        let result = runner(&temp).run(&job).await;
        assert_eq!(result.status, JobStatus::BadRequest);
    }

    #[tokio::test]
    async fn test_unreadable_style_is_caller_fault() {
        let temp = TempDir::new().unwrap();
        let mut job = local_job(&temp, "{}");
        job.style = StyleSource::Local {
            style_path: temp.path().join("missing.json"),
            source_dir: temp.path().to_path_buf(),
        };

        let result = runner(&temp).run(&job).await;
        assert_eq!(result.status, JobStatus::BadRequest);
    }

    #[tokio::test]
    async fn test_failed_acquisition_is_system_fault() {
        let temp = TempDir::new().unwrap();
        let job = JobRequest {
            style: "bing".into(),
            bounds: "-79,37,-77,38".into(),
            max_zoom: Some(1),
            output_dir: Some(temp.path().join("maps")),
            ..JobRequest::default()
        }
        .validate(temp.path())
        .unwrap();

        let runner = JobRunner::new(
            MockAsyncHttpClient::err("connection refused"),
            SolidEngine,
            temp.path().join("tmp"),
        );
        let result = runner.run(&job).await;
        assert_eq!(result.status, JobStatus::InternalServerError);
        assert!(!job.destination().exists());
    }
}
