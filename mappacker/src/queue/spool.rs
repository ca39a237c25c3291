//! Directory-backed queue transport.
//!
//! Each pending message is one `*.msg` file holding the encoded payload.
//! Messages are received oldest name first; acknowledging deletes the file.
//! A file that cannot be read is renamed to `*.rejected` so it never blocks
//! the messages behind it.

use super::{QueueError, QueueTransport, ReceivedMessage};
use crate::job::JobResult;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Extension of pending message files.
pub const MESSAGE_EXTENSION: &str = "msg";

/// Extension given to message files that could not be read.
pub const REJECTED_EXTENSION: &str = "rejected";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A queue held in a spool directory.
#[derive(Debug, Clone)]
pub struct SpoolQueue {
    dir: PathBuf,
    completion_dir: Option<PathBuf>,
}

impl SpoolQueue {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            completion_dir: None,
        }
    }

    /// Writes a completion record per finished message into `dir`.
    pub fn with_completion_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.completion_dir = Some(dir.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Adds an encoded message, returning its file path.
    ///
    /// The file appears atomically, so a concurrent receive never sees a
    /// partial payload.
    pub async fn enqueue(&self, body: &str) -> Result<PathBuf, QueueError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| QueueError::io(&self.dir, e))?;

        let stem = format!(
            "{}-{:06}",
            Utc::now().format("%Y%m%dT%H%M%S%.6f"),
            SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );
        let partial = self.dir.join(format!(".{}.tmp", stem));
        let path = self.dir.join(format!("{}.{}", stem, MESSAGE_EXTENSION));

        tokio::fs::write(&partial, body)
            .await
            .map_err(|e| QueueError::io(&partial, e))?;
        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| QueueError::io(&path, e))?;
        debug!(path = %path.display(), "Message enqueued");
        Ok(path)
    }

    /// Number of pending messages.
    pub async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.pending().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len().await? == 0)
    }

    /// Moves an unreadable message aside so later messages are not blocked.
    async fn reject(&self, name: &str, error: &std::io::Error) {
        let path = self.dir.join(name);
        let rejected = path.with_extension(REJECTED_EXTENSION);
        warn!(message = %name, error = %error, "Unreadable message set aside");
        if let Err(e) = tokio::fs::rename(&path, &rejected).await {
            warn!(message = %name, error = %e, "Could not set message aside");
        }
    }

    async fn pending(&self) -> Result<Vec<String>, QueueError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(QueueError::io(&self.dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| QueueError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == MESSAGE_EXTENSION) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl QueueTransport for SpoolQueue {
    async fn receive(&self) -> Result<Option<ReceivedMessage>, QueueError> {
        for name in self.pending().await? {
            let path = self.dir.join(&name);
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    trace!(message = %name, "Message received");
                    // Non-UTF-8 payloads still reach the worker, which rejects
                    // them on decode and acknowledges them.
                    let body = String::from_utf8_lossy(&bytes).into_owned();
                    return Ok(Some(ReceivedMessage { id: name, body }));
                }
                // acknowledged by another worker in the meantime
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => self.reject(&name, &e).await,
            }
        }
        Ok(None)
    }

    async fn acknowledge(&self, message: &ReceivedMessage) -> Result<(), QueueError> {
        let path = self.dir.join(&message.id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QueueError::io(&path, e)),
        }
    }

    async fn send_completion(
        &self,
        message: &ReceivedMessage,
        result: &JobResult,
    ) -> Result<(), QueueError> {
        let Some(dir) = &self.completion_dir else {
            return Ok(());
        };
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| QueueError::io(dir, e))?;

        let stem = message
            .id
            .strip_suffix(&format!(".{}", MESSAGE_EXTENSION))
            .unwrap_or(&message.id);
        let path = dir.join(format!("{}.json", stem));
        tokio::fs::write(&path, serde_json::to_vec_pretty(result)?)
            .await
            .map_err(|e| QueueError::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fifo_and_acknowledge() {
        let temp = TempDir::new().unwrap();
        let queue = SpoolQueue::new(temp.path().join("queue"));
        assert!(queue.receive().await.unwrap().is_none());

        queue.enqueue("first").await.unwrap();
        queue.enqueue("second").await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 2);

        let message = queue.receive().await.unwrap().unwrap();
        assert_eq!(message.body, "first");
        queue.acknowledge(&message).await.unwrap();
        // acknowledging twice is harmless
        queue.acknowledge(&message).await.unwrap();

        let message = queue.receive().await.unwrap().unwrap();
        assert_eq!(message.body, "second");
        queue.acknowledge(&message).await.unwrap();
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_ignores_foreign_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("notes.txt"), "x").unwrap();
        std::fs::write(temp.path().join(".partial.tmp"), "x").unwrap();

        let queue = SpoolQueue::new(temp.path());
        assert!(queue.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_utf8_message_does_not_block_queue() {
        let temp = TempDir::new().unwrap();
        let queue = SpoolQueue::new(temp.path());
        std::fs::write(temp.path().join("0000-bad.msg"), [0xff, 0xfe, 0x00]).unwrap();
        queue.enqueue("good").await.unwrap();

        let bad = queue.receive().await.unwrap().unwrap();
        assert_eq!(bad.id, "0000-bad.msg");
        queue.acknowledge(&bad).await.unwrap();

        let good = queue.receive().await.unwrap().unwrap();
        assert_eq!(good.body, "good");
    }

    #[tokio::test]
    async fn test_unreadable_message_is_set_aside() {
        let temp = TempDir::new().unwrap();
        let queue = SpoolQueue::new(temp.path());
        // a directory named like a message fails to read
        std::fs::create_dir(temp.path().join("0000-broken.msg")).unwrap();
        queue.enqueue("good").await.unwrap();

        let message = queue.receive().await.unwrap().unwrap();
        assert_eq!(message.body, "good");
        assert!(temp.path().join("0000-broken.rejected").exists());
        assert!(!temp.path().join("0000-broken.msg").exists());
    }

    #[tokio::test]
    async fn test_completion_record() {
        let temp = TempDir::new().unwrap();
        let queue = SpoolQueue::new(temp.path().join("queue"))
            .with_completion_dir(temp.path().join("done"));
        queue.enqueue("body").await.unwrap();
        let message = queue.receive().await.unwrap().unwrap();

        let result = JobResult::bad_request("nope");
        queue.send_completion(&message, &result).await.unwrap();

        let stem = message.id.trim_end_matches(".msg");
        let written = std::fs::read(temp.path().join("done").join(format!("{}.json", stem))).unwrap();
        let parsed: JobResult = serde_json::from_slice(&written).unwrap();
        assert_eq!(parsed, result);
    }
}
