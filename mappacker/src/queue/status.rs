//! Per-request status records.

use super::QueueError;
use crate::job::JobResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};

/// Status of a request whose job is running.
pub const PROCESSING: &str = "PROCESSING";

/// Where job progress and outcomes are recorded, keyed by request id.
pub trait StatusStore: Send + Sync {
    fn mark_processing(
        &self,
        request_id: &str,
    ) -> impl Future<Output = Result<(), QueueError>> + Send;

    fn write_result(
        &self,
        request_id: &str,
        result: &JobResult,
    ) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Removes the record. Missing records are not an error.
    fn delete(&self, request_id: &str) -> impl Future<Output = Result<(), QueueError>> + Send;
}

/// One request's persisted status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub request_id: String,
    /// `PROCESSING`, or the finished job's status
    pub status: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

impl StatusRecord {
    pub fn processing(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            status: PROCESSING.to_string(),
            updated_at: Utc::now(),
            result: None,
        }
    }

    pub fn finished(request_id: &str, result: &JobResult) -> Self {
        Self {
            request_id: request_id.to_string(),
            status: result.status.to_string(),
            updated_at: Utc::now(),
            result: Some(result.clone()),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.status == PROCESSING
    }
}

/// Status store keeping one `<request id>.json` file per request.
#[derive(Debug, Clone)]
pub struct JsonStatusStore {
    dir: PathBuf,
}

impl JsonStatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the record for `request_id`, if any.
    pub async fn get(&self, request_id: &str) -> Result<Option<StatusRecord>, QueueError> {
        let path = self.record_path(request_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(QueueError::io(&path, e)),
        }
    }

    fn record_path(&self, request_id: &str) -> Result<PathBuf, QueueError> {
        let valid = !request_id.is_empty()
            && request_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !request_id.starts_with('.');
        if !valid {
            return Err(QueueError::Decode(format!(
                "request id '{}' is not a valid record name",
                request_id
            )));
        }
        Ok(self.dir.join(format!("{}.json", request_id)))
    }

    async fn put(&self, record: &StatusRecord) -> Result<(), QueueError> {
        let path = self.record_path(&record.request_id)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| QueueError::io(&self.dir, e))?;

        let partial = path.with_extension("json.tmp");
        tokio::fs::write(&partial, serde_json::to_vec_pretty(record)?)
            .await
            .map_err(|e| QueueError::io(&partial, e))?;
        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| QueueError::io(&path, e))
    }
}

impl StatusStore for JsonStatusStore {
    async fn mark_processing(&self, request_id: &str) -> Result<(), QueueError> {
        self.put(&StatusRecord::processing(request_id)).await
    }

    async fn write_result(&self, request_id: &str, result: &JobResult) -> Result<(), QueueError> {
        self.put(&StatusRecord::finished(request_id, result)).await
    }

    async fn delete(&self, request_id: &str) -> Result<(), QueueError> {
        let path = self.record_path(request_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QueueError::io(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_record_lifecycle() {
        let temp = TempDir::new().unwrap();
        let store = JsonStatusStore::new(temp.path().join("status"));
        assert!(store.get("17").await.unwrap().is_none());

        store.mark_processing("17").await.unwrap();
        assert!(store.get("17").await.unwrap().unwrap().is_processing());

        let result = JobResult::bad_request("You must provide a style");
        store.write_result("17", &result).await.unwrap();
        let record = store.get("17").await.unwrap().unwrap();
        assert_eq!(record.status, "BadRequest");
        assert_eq!(record.result.unwrap().status, JobStatus::BadRequest);

        store.delete("17").await.unwrap();
        assert!(store.get("17").await.unwrap().is_none());
        store.delete("17").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let temp = TempDir::new().unwrap();
        let store = JsonStatusStore::new(temp.path());
        assert!(store.mark_processing("../escape").await.is_err());
        assert!(store.mark_processing("").await.is_err());
    }
}
