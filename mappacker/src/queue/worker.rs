//! The queue drain loop.

use super::{QueueMessage, QueueTransport, ReceivedMessage, RequestType, StatusStore};
use crate::config::{ProviderSettings, DEFAULT_POLL_INTERVAL_SECS};
use crate::job::{archive_path, validate_output_name, JobResult, JobRunner};
use crate::provider::AsyncHttpClient;
use crate::render::RenderEngine;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Drains a queue, one message at a time.
pub struct QueueWorker<Q, S, C, E> {
    queue: Q,
    status: S,
    runner: JobRunner<C, E>,
    output_dir: PathBuf,
    providers: ProviderSettings,
    poll_interval: Duration,
}

impl<Q, S, C, E> QueueWorker<Q, S, C, E>
where
    Q: QueueTransport,
    S: StatusStore,
    C: AsyncHttpClient + Clone,
    E: RenderEngine + Clone,
{
    /// Creates a worker publishing to `output_dir` unless a message names
    /// its own directory.
    pub fn new(queue: Q, status: S, runner: JobRunner<C, E>, output_dir: PathBuf) -> Self {
        Self {
            queue,
            status,
            runner,
            output_dir,
            providers: ProviderSettings::default(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    /// Credentials used when a message carries no API key.
    pub fn with_provider_settings(mut self, providers: ProviderSettings) -> Self {
        self.providers = providers;
        self
    }

    /// Wait between polls of an empty queue. Default: 10 seconds.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs until `shutdown` is cancelled. A job in progress always finishes
    /// and is acknowledged before the loop exits.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            output_dir = %self.output_dir.display(),
            "Queue worker starting"
        );

        loop {
            let received = tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                received = self.queue.receive() => received,
            };

            match received {
                Ok(Some(message)) => self.handle(&message).await,
                Ok(None) => {
                    debug!(
                        retry_secs = self.poll_interval.as_secs(),
                        "No message found"
                    );
                    if self.idle(&shutdown).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Queue receive failed");
                    if self.idle(&shutdown).await {
                        break;
                    }
                }
            }
        }

        info!("Queue worker shutting down");
    }

    /// Handles at most one message. Returns whether a message was taken.
    pub async fn process_one(&self) -> bool {
        match self.queue.receive().await {
            Ok(Some(message)) => {
                self.handle(&message).await;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Queue receive failed");
                false
            }
        }
    }

    /// Sleeps one poll interval. Returns true if shutdown was requested.
    async fn idle(&self, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => true,
            _ = tokio::time::sleep(self.poll_interval) => false,
        }
    }

    #[instrument(skip_all, fields(message = %message.id))]
    async fn handle(&self, message: &ReceivedMessage) {
        if let Some(result) = self.dispatch(message).await {
            if let Err(e) = self.queue.send_completion(message, &result).await {
                warn!(error = %e, "Completion signal failed");
            }
        }

        match self.queue.acknowledge(message).await {
            Ok(()) => debug!("Message acknowledged"),
            Err(e) => error!(error = %e, "Message acknowledge failed"),
        }
    }

    /// Runs the message's request. Successful deletes report no result.
    async fn dispatch(&self, message: &ReceivedMessage) -> Option<JobResult> {
        let decoded = match QueueMessage::decode(&message.body) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "Discarding undecodable message");
                return Some(JobResult::bad_request(e.to_string()));
            }
        };
        let request_id = decoded.request_id.as_deref();

        match decoded.request_type() {
            Some(RequestType::New | RequestType::Resubmit) => {
                let result = self.run_request(&decoded).await;
                self.record(request_id, &result).await;
                Some(result)
            }
            Some(RequestType::Delete) => {
                let result = self.delete_request(&decoded).await;
                if let Some(result) = &result {
                    self.record(request_id, result).await;
                }
                result
            }
            None => {
                let kind = decoded.kind.as_deref().unwrap_or_default();
                warn!(kind, "Unknown request type");
                let result = JobResult::bad_request(format!("Unknown request type: '{}'", kind));
                self.record(request_id, &result).await;
                Some(result)
            }
        }
    }

    async fn run_request(&self, decoded: &QueueMessage) -> JobResult {
        let request = decoded.request.clone().with_provider_defaults(&self.providers);
        let job = match request.validate(&self.output_dir) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "Rejected request");
                return JobResult::failure(&e);
            }
        };

        if let Some(id) = decoded.request_id.as_deref() {
            if let Err(e) = self.status.mark_processing(id).await {
                warn!(request_id = id, error = %e, "Status update failed");
            }
        }

        info!(
            request_id = decoded.request_id.as_deref().unwrap_or("-"),
            style = %request.style,
            "Processing request"
        );
        self.runner.run(&job).await
    }

    /// Removes the archive and its status record. A name that would leave the
    /// output directory deletes nothing and is reported as a bad request.
    async fn delete_request(&self, decoded: &QueueMessage) -> Option<JobResult> {
        let name = match validate_output_name(&decoded.request.output_name) {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "Rejected delete request");
                return Some(JobResult::failure(&e));
            }
        };
        let dir = decoded
            .request
            .output_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.clone());
        let path = archive_path(&dir, name);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!(path = %path.display(), "Archive deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Archive already gone")
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Archive delete failed"),
        }

        if let Some(id) = decoded.request_id.as_deref() {
            match self.status.delete(id).await {
                Ok(()) => info!(request_id = id, "Status record deleted"),
                Err(e) => warn!(request_id = id, error = %e, "Status record delete failed"),
            }
        }
        None
    }

    async fn record(&self, request_id: Option<&str>, result: &JobResult) {
        let Some(id) = request_id else {
            debug!(status = %result.status, "No request id; result not recorded");
            return;
        };
        if let Err(e) = self.status.write_result(id, result).await {
            error!(request_id = id, error = %e, "Writing job result failed");
        }
    }
}
