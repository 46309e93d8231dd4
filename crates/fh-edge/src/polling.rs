// SPDX-License-Identifier: MIT OR Apache-2.0
//! Conditional-HTTP polling edge transport.

use crate::cancel::CancellationToken;
use crate::error::EdgeError;
use crate::{EdgeService, SDK_NAME, SDK_VERSION};
use async_trait::async_trait;
use fh_repository::FeatureRepository;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

struct PollingInner {
    client: reqwest::Client,
    edge_url: String,
    api_keys: Vec<String>,
    repo: Arc<dyn FeatureRepository>,
    cancel: CancellationToken,
    stopped: AtomicBool,
    etag: RwLock<Option<String>>,
    context_header: RwLock<Option<String>>,
    interval_secs: AtomicU64,
}

/// Edge transport that repeatedly issues conditional `GET` requests,
/// honouring `ETag`/`cache-control` hints and self-rescheduling.
#[derive(Clone)]
pub struct PollingEdge {
    inner: Arc<PollingInner>,
}

impl PollingEdge {
    pub fn new(
        client: reqwest::Client,
        edge_url: impl Into<String>,
        api_keys: Vec<String>,
        repo: Arc<dyn FeatureRepository>,
        default_interval_secs: u64,
    ) -> Self {
        Self {
            inner: Arc::new(PollingInner {
                client,
                edge_url: edge_url.into(),
                api_keys,
                repo,
                cancel: CancellationToken::new(),
                stopped: AtomicBool::new(false),
                etag: RwLock::new(None),
                context_header: RwLock::new(None),
                interval_secs: AtomicU64::new(default_interval_secs),
            }),
        }
    }

    fn build_url(&self) -> String {
        let mut url = format!("{}features?", self.inner.edge_url);
        for key in &self.inner.api_keys {
            url.push_str("apiKey=");
            url.push_str(key);
            url.push('&');
        }
        let header = self.inner.context_header.read().expect("lock poisoned");
        let sha = match header.as_deref() {
            Some(h) if !h.is_empty() => {
                let mut hasher = Sha256::new();
                hasher.update(h.as_bytes());
                hex_digest(hasher.finalize().as_slice())
            }
            _ => "0".to_string(),
        };
        url.push_str("contextSha=");
        url.push_str(&sha);
        url
    }

    async fn run_round(&self) -> Result<(), EdgeError> {
        let url = self.build_url();
        let mut req = self
            .inner
            .client
            .get(&url)
            .header("X-SDK", SDK_NAME)
            .header("X-SDK-Version", SDK_VERSION);

        if let Some(etag) = self.inner.etag.read().expect("lock poisoned").clone() {
            req = req.header("if-none-match", etag);
        }
        if let Some(header) = self
            .inner
            .context_header
            .read()
            .expect("lock poisoned")
            .clone()
        {
            req = req.header("x-featurehub", header);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();

        match status {
            200 | 236 => {
                if let Some(etag) = response
                    .headers()
                    .get("etag")
                    .and_then(|v| v.to_str().ok())
                {
                    *self.inner.etag.write().expect("lock poisoned") = Some(etag.to_string());
                }
                if let Some(max_age) = response
                    .headers()
                    .get("cache-control")
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_max_age)
                {
                    if max_age > 0 {
                        self.inner.interval_secs.store(max_age, Ordering::SeqCst);
                    }
                }

                let body: Vec<serde_json::Value> = response.json().await?;
                for environment in body {
                    if let Some(features) = environment.get("features").cloned() {
                        self.inner.repo.notify("features", Some(features));
                    }
                }

                if status == 236 {
                    self.inner.stopped.store(true, Ordering::SeqCst);
                }
                Ok(())
            }
            404 => {
                self.inner.repo.notify("failed", None);
                self.inner.cancel.cancel();
                Ok(())
            }
            503 => {
                tracing::debug!(target: "featurehub.edge.polling", "server busy, skipping round");
                Ok(())
            }
            other => {
                tracing::debug!(target: "featurehub.edge.polling", status = other, "transient status, ignoring");
                Ok(())
            }
        }
    }

    fn schedule_next_round(&self) {
        if self.inner.cancel.is_cancelled() || self.inner.stopped.load(Ordering::SeqCst) {
            return;
        }
        let interval = self.inner.interval_secs.load(Ordering::SeqCst);
        if interval == 0 {
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(interval)) => {
                    if let Err(err) = this.run_round().await {
                        tracing::warn!(target: "featurehub.edge.polling", error = %err, "poll round failed");
                    }
                    this.schedule_next_round();
                }
                _ = this.inner.cancel.cancelled() => {}
            }
        });
    }
}

#[async_trait]
impl EdgeService for PollingEdge {
    async fn poll(&self) -> Result<(), EdgeError> {
        if self.inner.cancel.is_cancelled() || self.inner.stopped.load(Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.run_round().await;
        if result.is_ok() {
            self.schedule_next_round();
        }
        result
    }

    async fn close(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.cancel.cancel();
    }

    async fn context_change(&self, header: &str) -> Result<(), EdgeError> {
        let new_header = if header.is_empty() {
            None
        } else {
            Some(header.to_string())
        };
        *self.inner.context_header.write().expect("lock poisoned") = new_header;
        Ok(())
    }

    fn client_evaluated(&self) -> bool {
        self.inner
            .api_keys
            .first()
            .is_some_and(|k| k.contains('*'))
    }
}

fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control.split(',').find_map(|part| {
        let part = part.trim();
        part.strip_prefix("max-age=")?.parse().ok()
    })
}

fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_max_age_extracts_value() {
        assert_eq!(parse_max_age("private, max-age=20"), Some(20));
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("max-age=0"), Some(0));
    }

    #[test]
    fn hex_digest_is_lowercase_hex() {
        let digest = hex_digest(&[0x0a, 0xff]);
        assert_eq!(digest, "0aff");
    }

    #[tokio::test]
    async fn build_url_uses_zero_context_sha_when_unset() {
        let edge = PollingEdge::new(
            reqwest::Client::new(),
            "https://edge.example.com/",
            vec!["key1".to_string()],
            Arc::new(fh_repository::FeatureHubRepository::new()),
            30,
        );
        let url = edge.build_url();
        assert!(url.contains("apiKey=key1&"));
        assert!(url.ends_with("contextSha=0"));
    }

    #[tokio::test]
    async fn build_url_hashes_context_header_when_set() {
        let edge = PollingEdge::new(
            reqwest::Client::new(),
            "https://edge.example.com/",
            vec!["key1".to_string()],
            Arc::new(fh_repository::FeatureHubRepository::new()),
            30,
        );
        edge.context_change("userkey=abc").await.unwrap();
        let url = edge.build_url();
        assert!(!url.ends_with("contextSha=0"));
    }

    #[test]
    fn client_evaluated_detects_wildcard_key() {
        let edge = PollingEdge::new(
            reqwest::Client::new(),
            "https://edge.example.com/",
            vec!["*abc".to_string()],
            Arc::new(fh_repository::FeatureHubRepository::new()),
            30,
        );
        assert!(edge.client_evaluated());
    }
}
