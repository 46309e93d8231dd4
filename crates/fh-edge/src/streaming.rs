// SPDX-License-Identifier: MIT OR Apache-2.0
//! Server-sent-events streaming edge transport.

use crate::backoff::{compute_delay, BackoffConfig};
use crate::cancel::CancellationToken;
use crate::error::EdgeError;
use crate::{EdgeService, SDK_NAME, SDK_VERSION};
use async_trait::async_trait;
use fh_repository::FeatureRepository;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;

struct StreamingInner {
    client: reqwest::Client,
    edge_url: String,
    api_key0: String,
    client_evaluated: bool,
    repo: Arc<dyn FeatureRepository>,
    cancel: CancellationToken,
    stopped: AtomicBool,
    started: AtomicBool,
    last_event_id: RwLock<Option<String>>,
    first_data: Notify,
}

enum StreamOutcome {
    Stale,
    NotFound,
    Disconnected,
}

/// Edge transport that consumes a long-lived `text/event-stream` connection,
/// reconnecting with backoff on transport errors.
#[derive(Clone)]
pub struct StreamingEdge {
    inner: Arc<StreamingInner>,
}

impl StreamingEdge {
    pub fn new(
        client: reqwest::Client,
        edge_url: impl Into<String>,
        api_keys: Vec<String>,
        repo: Arc<dyn FeatureRepository>,
    ) -> Self {
        let api_key0 = api_keys.first().cloned().unwrap_or_default();
        let client_evaluated = api_key0.contains('*');
        Self {
            inner: Arc::new(StreamingInner {
                client,
                edge_url: edge_url.into(),
                api_key0,
                client_evaluated,
                repo,
                cancel: CancellationToken::new(),
                stopped: AtomicBool::new(false),
                started: AtomicBool::new(false),
                last_event_id: RwLock::new(None),
                first_data: Notify::new(),
            }),
        }
    }

    fn url(&self) -> String {
        format!("{}features/{}", self.inner.edge_url, self.inner.api_key0)
    }

    async fn wait_for_first_data(&self) {
        loop {
            if self.settled() {
                return;
            }
            let notified = self.inner.first_data.notified();
            if self.settled() {
                return;
            }
            notified.await;
        }
    }

    fn settled(&self) -> bool {
        self.inner.repo.is_ready()
            || self.inner.cancel.is_cancelled()
            || self.inner.stopped.load(Ordering::SeqCst)
    }

    async fn connect_and_consume(&self) -> StreamOutcome {
        let mut request = self
            .inner
            .client
            .get(self.url())
            .header("Accept", "text/event-stream")
            .header("X-SDK", SDK_NAME)
            .header("X-SDK-Version", SDK_VERSION);

        if let Some(id) = self.inner.last_event_id.read().expect("lock poisoned").clone() {
            request = request.header("Last-Event-Id", id);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(target: "featurehub.edge.streaming", error = %err, "connect failed");
                return StreamOutcome::Disconnected;
            }
        };

        match response.status().as_u16() {
            404 => return StreamOutcome::NotFound,
            200 => {}
            other => {
                tracing::debug!(target: "featurehub.edge.streaming", status = other, "unexpected status, reconnecting");
                return StreamOutcome::Disconnected;
            }
        }

        let mut buffer = String::new();
        let mut bytes = response.bytes_stream();
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(err) => {
                    tracing::warn!(target: "featurehub.edge.streaming", error = %err, "stream read failed");
                    return StreamOutcome::Disconnected;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find("\n\n") {
                let frame = buffer[..pos].to_string();
                buffer.drain(..pos + 2);
                if frame.trim().is_empty() {
                    continue;
                }
                if let Some(outcome) = self.handle_frame(&frame) {
                    return outcome;
                }
            }
        }

        StreamOutcome::Disconnected
    }

    /// Parses one SSE frame and dispatches it. Returns `Some(outcome)` when
    /// the frame ends the connection (a stale `config` event).
    fn handle_frame(&self, frame: &str) -> Option<StreamOutcome> {
        let mut event_name = String::new();
        let mut data = String::new();
        let mut id = None;

        for line in frame.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                event_name = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("data:") {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(rest.trim());
            } else if let Some(rest) = line.strip_prefix("id:") {
                id = Some(rest.trim().to_string());
            }
        }

        if let Some(id) = id {
            *self.inner.last_event_id.write().expect("lock poisoned") = Some(id);
        }

        if event_name.is_empty() {
            return None;
        }

        let payload = parse_payload(&data);

        if event_name == "config" {
            let stale = payload
                .as_ref()
                .and_then(|v| v.get("edge.stale"))
                .is_some();
            if stale {
                return Some(StreamOutcome::Stale);
            }
            return None;
        }

        self.inner.repo.notify(&event_name, payload);
        self.inner.first_data.notify_waiters();
        None
    }

    async fn run_loop(self) {
        let backoff = BackoffConfig::default();
        let mut attempt = 0u32;
        while !self.inner.cancel.is_cancelled() && !self.inner.stopped.load(Ordering::SeqCst) {
            match self.connect_and_consume().await {
                StreamOutcome::Stale => {
                    self.inner.stopped.store(true, Ordering::SeqCst);
                    break;
                }
                StreamOutcome::NotFound => {
                    self.inner.repo.notify("failed", None);
                    self.inner.cancel.cancel();
                    break;
                }
                StreamOutcome::Disconnected => {
                    attempt += 1;
                }
            }

            if self.inner.cancel.is_cancelled() || self.inner.stopped.load(Ordering::SeqCst) {
                break;
            }

            let delay = compute_delay(&backoff, attempt.min(6));
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.inner.cancel.cancelled() => break,
            }
        }
        self.inner.first_data.notify_waiters();
    }
}

fn parse_payload(data: &str) -> Option<serde_json::Value> {
    let trimmed = data.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        serde_json::from_str(trimmed).ok()
    } else if trimmed.is_empty() {
        None
    } else {
        Some(serde_json::Value::String(trimmed.to_string()))
    }
}

#[async_trait]
impl EdgeService for StreamingEdge {
    async fn poll(&self) -> Result<(), EdgeError> {
        if !self.inner.started.swap(true, Ordering::SeqCst) {
            let worker = self.clone();
            tokio::spawn(worker.run_loop());
        }
        self.wait_for_first_data().await;
        Ok(())
    }

    async fn close(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.cancel.cancel();
    }

    async fn context_change(&self, _header: &str) -> Result<(), EdgeError> {
        // Streaming evaluates server-side over the same connection; context
        // changes have no transport-level effect.
        Ok(())
    }

    fn client_evaluated(&self) -> bool {
        self.inner.client_evaluated
    }
}
