//! Queue-driven job execution
//!
//! The worker drains a [`QueueTransport`], runs each request through a
//! [`JobRunner`](crate::job::JobRunner) and records the outcome in a
//! [`StatusStore`]. Every received message is acknowledged exactly once,
//! whatever happened to the job.
//!
//! [`SpoolQueue`] and [`JsonStatusStore`] implement both seams on the local
//! filesystem.

mod message;
mod spool;
mod status;
mod worker;

pub use message::{QueueMessage, RequestType};
pub use spool::{SpoolQueue, MESSAGE_EXTENSION, REJECTED_EXTENSION};
pub use status::{JsonStatusStore, StatusRecord, StatusStore, PROCESSING};
pub use worker::QueueWorker;

use crate::job::JobResult;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from queue transports and status stores.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Message body is not base64-encoded JSON
    #[error("undecodable message: {0}")]
    Decode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A message taken off the queue and not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Transport-specific handle used to acknowledge the message
    pub id: String,
    /// Encoded payload
    pub body: String,
}

/// Source of job messages.
pub trait QueueTransport: Send + Sync {
    /// Takes the next message, or `None` when the queue is empty.
    fn receive(&self) -> impl Future<Output = Result<Option<ReceivedMessage>, QueueError>> + Send;

    /// Removes `message` from the queue for good.
    fn acknowledge(
        &self,
        message: &ReceivedMessage,
    ) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Signals that `message` finished with `result`. Transports without a
    /// destination channel do nothing.
    fn send_completion(
        &self,
        message: &ReceivedMessage,
        result: &JobResult,
    ) -> impl Future<Output = Result<(), QueueError>> + Send {
        let _ = (message, result);
        async { Ok(()) }
    }
}
