//! Job-level error taxonomy.

use crate::acquire::AcquireError;
use crate::assemble::AssembleError;
use crate::coord::CoordError;
use crate::provider::ProviderError;
use crate::resolver::ResolveError;
use crate::style::StyleError;
use std::path::PathBuf;
use thiserror::Error;

/// Who is to blame for a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Bad or missing input; retrying the same request cannot succeed
    Caller,
    /// I/O, network, storage or engine failure
    System,
}

/// Everything that can end a job without an archive.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Style(#[from] StyleError),

    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl JobError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classifies the error for the job result.
    pub fn fault(&self) -> Fault {
        match self {
            Self::InvalidInput(_) | Self::UnsupportedSource(_) | Self::Coord(_) => Fault::Caller,
            Self::Provider(e) => match e {
                ProviderError::UnknownProvider(_) | ProviderError::MissingCredential { .. } => {
                    Fault::Caller
                }
                _ => Fault::System,
            },
            // Unreadable style files and missing containers both come from the
            // caller's request.
            Self::Style(_) => Fault::Caller,
            Self::Acquire(AcquireError::Coord(_))
            | Self::Assemble(AssembleError::Coord(_) | AssembleError::ImageTooLarge { .. }) => {
                Fault::Caller
            }
            Self::Acquire(_) | Self::Assemble(_) | Self::Io { .. } => Fault::System,
        }
    }
}

impl From<ResolveError> for JobError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::UnsupportedSource(url) => Self::UnsupportedSource(url),
            ResolveError::MissingSourceDir(url) | ResolveError::MissingStyleDir(url) => {
                Self::InvalidInput(format!("no local directory to resolve {url}"))
            }
            ResolveError::MalformedTileUrl(url) => Self::UnsupportedSource(url),
            ResolveError::Store(e) => Self::Assemble(AssembleError::Storage(e)),
        }
    }
}
