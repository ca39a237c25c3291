//! The record handed back across the job boundary.

use super::error::{Fault, JobError};
use crate::assemble::ArchiveOutput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Outcome tag of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Success,
    /// Caller fault
    BadRequest,
    /// System fault
    InternalServerError,
}

impl JobStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "Success",
            Self::BadRequest => "BadRequest",
            Self::InternalServerError => "InternalServerError",
        };
        f.write_str(s)
    }
}

impl From<Fault> for JobStatus {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::Caller => Self::BadRequest,
            Fault::System => Self::InternalServerError,
        }
    }
}

/// Result of one archive job. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_location: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_tiles: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_begun: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_ended: Option<DateTime<Utc>>,
}

impl JobResult {
    /// A published archive.
    pub fn success(output: &ArchiveOutput, begun: DateTime<Utc>, ended: DateTime<Utc>) -> Self {
        Self {
            status: JobStatus::Success,
            error_message: None,
            file_location: Some(output.path.clone()),
            filesize: Some(output.size_bytes),
            number_of_tiles: Some(output.tile_count),
            work_begun: Some(begun),
            work_ended: Some(ended),
        }
    }

    /// A failed job, tagged by the error's fault class.
    pub fn failure(error: &JobError) -> Self {
        Self::failed(error.fault().into(), error.to_string())
    }

    /// A caller-fault result that never reached a job, e.g. an undecodable message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::failed(JobStatus::BadRequest, message.into())
    }

    fn failed(status: JobStatus, message: String) -> Self {
        Self {
            status,
            error_message: Some(message),
            file_location: None,
            filesize: None,
            number_of_tiles: None,
            work_begun: None,
            work_ended: None,
        }
    }

    pub fn with_timing(mut self, begun: DateTime<Utc>, ended: DateTime<Utc>) -> Self {
        self.work_begun = Some(begun);
        self.work_ended = Some(ended);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
