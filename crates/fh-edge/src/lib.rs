// SPDX-License-Identifier: MIT OR Apache-2.0
//! Long-lived edge transports that feed a feature repository: conditional
//! HTTP polling and server-sent-events streaming.

#![deny(unsafe_code)]

mod backoff;
mod cancel;
mod error;
mod polling;
mod streaming;

pub use backoff::BackoffConfig;
pub use cancel::CancellationToken;
pub use error::EdgeError;
pub use polling::PollingEdge;
pub use streaming::StreamingEdge;

use async_trait::async_trait;

pub(crate) const SDK_NAME: &str = "rust";
pub(crate) const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common surface both edge transports implement, so `fh-context` can hold
/// either behind a trait object.
#[async_trait]
pub trait EdgeService: Send + Sync {
    /// Starts the transport if it hasn't already, and waits for at least
    /// one round of data (or a terminal failure).
    async fn poll(&self) -> Result<(), EdgeError>;

    /// Tears the transport down. Idempotent.
    async fn close(&self);

    /// Notifies the transport that the evaluation context changed. A no-op
    /// on transports that evaluate client-side. `header` is the new
    /// URL-encoded attribute string, or `""` to clear it.
    async fn context_change(&self, header: &str) -> Result<(), EdgeError>;

    /// True iff the first configured API key is a client-eval key.
    fn client_evaluated(&self) -> bool;
}
