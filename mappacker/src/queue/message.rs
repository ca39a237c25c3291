//! Queue payloads: base64-encoded camelCase JSON.

use super::QueueError;
use crate::job::JobRequest;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// What a message asks the worker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    New,
    /// Same handling as `New`
    Resubmit,
    /// Remove a previously published archive and its status record
    Delete,
}

impl RequestType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new_request" => Some(Self::New),
            "resubmit_request" => Some(Self::Resubmit),
            "delete_request" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new_request",
            Self::Resubmit => "resubmit_request",
            Self::Delete => "delete_request",
        }
    }
}

/// A decoded queue message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub request: JobRequest,
}

impl QueueMessage {
    pub fn new(kind: RequestType, request_id: impl Into<String>, request: JobRequest) -> Self {
        Self {
            kind: Some(kind.as_str().to_string()),
            request_id: Some(request_id.into()),
            request,
        }
    }

    /// Decodes a base64 JSON body.
    pub fn decode(body: &str) -> Result<Self, QueueError> {
        let bytes = BASE64
            .decode(body.trim())
            .map_err(|e| QueueError::Decode(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn encode(&self) -> Result<String, QueueError> {
        Ok(BASE64.encode(serde_json::to_vec(self)?))
    }

    /// The request type, or `None` if missing or unknown.
    pub fn request_type(&self) -> Option<RequestType> {
        self.kind.as_deref().and_then(RequestType::parse)
    }
}
