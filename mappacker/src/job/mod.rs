//! Archive jobs
//!
//! A job turns a [`JobRequest`] into exactly one [`JobResult`]:
//!
//! 1. [`JobRequest::validate`] checks the request (caller faults)
//! 2. [`JobRunner`] acquires provider imagery into a per-job workspace and
//!    generates a style, or loads the caller's style
//! 3. the [`ArchiveAssembler`](crate::assemble::ArchiveAssembler) renders and
//!    publishes the archive
//!
//! Callers only look at the result's [`JobStatus`], never at error types.

mod error;
mod request;
mod result;
mod runner;
mod workspace;

pub use error::{Fault, JobError};
pub use request::{
    archive_path, validate_output_name, ArchiveJob, JobRequest, StyleSource, ARCHIVE_EXTENSION,
    DEFAULT_OUTPUT_NAME, SELF_STYLE,
};
pub use result::{JobResult, JobStatus};
pub use runner::JobRunner;
pub use workspace::{Workspace, SOURCES_DIR, STYLE_FILE};
