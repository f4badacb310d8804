use crate::records::request::Request;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of sending one request to the inference endpoint.
///
/// Serialized without a tag, so a line in a partition file is either
/// `{"request": .., "response": ..}` or `{"request": .., "error": ".."}`.
/// `request` always holds the original, unfiltered request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InferenceResult {
    Success { request: Request, response: Value },
    Failure { request: Request, error: String },
}

impl InferenceResult {
    pub fn success(request: Request, response: Value) -> Self {
        Self::Success { request, response }
    }

    pub fn failure(request: Request, error: impl Into<String>) -> Self {
        Self::Failure {
            request,
            error: error.into(),
        }
    }

    pub fn request(&self) -> &Request {
        match self {
            Self::Success { request, .. } | Self::Failure { request, .. } => request,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
