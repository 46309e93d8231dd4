// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge transport errors.

use fh_error::{ErrorCode, FeatureHubError};

/// Errors surfaced by [`crate::EdgeService`] implementations.
///
/// Per the foreground error-handling contract, these never reach a caller's
/// typed getters — they are logged, fed into the repository as a `"failed"`
/// notification where appropriate, or silently retried.
#[derive(Debug, thiserror::Error)]
pub enum EdgeError {
    /// The server returned a status code the transport didn't expect.
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
    /// The underlying HTTP client failed to complete the request.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The SSE byte stream could not be parsed as `text/event-stream`.
    #[error("malformed event stream: {0}")]
    MalformedStream(String),
}

impl From<EdgeError> for FeatureHubError {
    fn from(err: EdgeError) -> Self {
        let code = match &err {
            EdgeError::UnexpectedStatus(_) => ErrorCode::EdgeUnexpectedStatus,
            EdgeError::Transport(_) => ErrorCode::EdgeTransportFailed,
            EdgeError::MalformedStream(_) => ErrorCode::EdgeMalformedStream,
        };
        FeatureHubError::new(code, err.to_string())
    }
}
