//! MapPacker - map tile archive packaging
//!
//! Packages a cartographic style and a bounding box into an MBTiles archive.
//!
//! # Pipeline
//!
//! ```text
//! JobRequest ─validate─▶ ArchiveJob ─▶ JobRunner
//!                                        │
//!            provider imagery ◀─acquire──┤
//!                                        ├─▶ ArchiveAssembler ─render─▶ RenderEngine
//!                                        │         │                        │
//!                                        │         ▼                        ▼
//!                                        │   MBTiles container      SourceResolver
//!                                        ▼
//!                                    JobResult
//! ```
//!
//! - [`coord`] - tile math
//! - [`store`] - MBTiles, PMTiles, directory, GeoJSON and remote backends
//! - [`resolver`] - the pull protocol the render engine drives
//! - [`provider`] / [`acquire`] - online imagery download
//! - [`style`] / [`render`] / [`assemble`] - style documents, rendering, archive output
//! - [`job`] / [`queue`] - job execution, results and the queue worker
//!
//! ```ignore
//! use mappacker::job::{JobRequest, JobRunner};
//! use mappacker::provider::AsyncReqwestClient;
//! use mappacker::render::RasterCompositor;
//!
//! let request = JobRequest {
//!     style: "esri".into(),
//!     bounds: "-79,37,-77,38".into(),
//!     max_zoom: Some(5),
//!     ..JobRequest::default()
//! };
//! let job = request.validate(Path::new("/maps"))?;
//! let runner = JobRunner::new(AsyncReqwestClient::new()?, RasterCompositor::new(), "/tmp/mappacker");
//! let result = runner.run(&job).await;
//! ```

pub mod acquire;
pub mod assemble;
pub mod config;
pub mod coord;
pub mod job;
pub mod logging;
pub mod provider;
pub mod queue;
pub mod render;
pub mod resolver;
pub mod store;
pub mod style;

/// Version of the MapPacker library and CLI.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
