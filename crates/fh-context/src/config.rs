// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binds an edge URL and API keys to a repository and edge service, and
//! vends request-scoped contexts.

use crate::client::ClientEvalContext;
use crate::error::ConfigError;
use crate::server::ServerEvalContext;
use fh_edge::{EdgeService, PollingEdge, StreamingEdge};
use fh_repository::{FeatureHubRepository, FeatureRepository};
use std::sync::{Arc, RwLock};

/// A context appropriate to the configured API key type.
pub enum Context {
    Client(ClientEvalContext),
    Server(ServerEvalContext),
}

type EdgeFactory =
    dyn Fn(Arc<dyn FeatureRepository>, Vec<String>, String) -> Box<dyn EdgeService> + Send + Sync;

enum Transport {
    Streaming,
    Polling { interval_secs: u64 },
}

struct Assembled {
    repo: Arc<dyn FeatureRepository>,
    edge: Arc<dyn EdgeService>,
}

/// Validates edge URL/API-key invariants at construction, then assembles
/// and tears down a single repository + edge service pair shared by every
/// context it vends.
pub struct Config {
    edge_url: String,
    api_keys: Vec<String>,
    client_evaluated: bool,
    default_poll_interval_secs: u64,
    transport: RwLock<Transport>,
    provider: RwLock<Option<Box<EdgeFactory>>>,
    assembled: RwLock<Option<Assembled>>,
}

impl Config {
    /// Validates `edge_url` and `api_keys`, normalizing the URL to a
    /// trailing slash. Fails synchronously — no network access occurs
    /// until [`Config::init`].
    pub fn new(edge_url: impl Into<String>, api_keys: Vec<String>) -> Result<Self, ConfigError> {
        let edge_url = edge_url.into();
        if edge_url.is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if api_keys.is_empty() {
            return Err(ConfigError::EmptyKeys);
        }
        if api_keys.iter().any(String::is_empty) {
            return Err(ConfigError::BlankKey);
        }
        let client_evaluated = api_keys[0].contains('*');
        if api_keys
            .iter()
            .any(|k| k.contains('*') != client_evaluated)
        {
            return Err(ConfigError::MixedKeyTypes);
        }

        let edge_url = if edge_url.ends_with('/') {
            edge_url
        } else {
            format!("{edge_url}/")
        };

        let default_poll_interval_secs = std::env::var("FEATUREHUB_POLL_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            edge_url,
            api_keys,
            client_evaluated,
            default_poll_interval_secs,
            transport: RwLock::new(Transport::Streaming),
            provider: RwLock::new(None),
            assembled: RwLock::new(None),
        })
    }

    /// Switches to [`PollingEdge`] as the transport, optionally overriding
    /// the poll interval (seconds; defaults to `FEATUREHUB_POLL_INTERVAL`
    /// or 30). Ignored once [`Config::init`] has run.
    pub fn use_polling_edge_service(&self, interval_secs: Option<u64>) -> &Self {
        *self.transport.write().expect("lock poisoned") = Transport::Polling {
            interval_secs: interval_secs.unwrap_or(self.default_poll_interval_secs),
        };
        self
    }

    /// Installs a replaceable edge-service factory, overriding the default
    /// streaming/polling choice entirely.
    pub fn edge_service_provider<F>(&self, factory: F) -> &Self
    where
        F: Fn(Arc<dyn FeatureRepository>, Vec<String>, String) -> Box<dyn EdgeService>
            + Send
            + Sync
            + 'static,
    {
        *self.provider.write().expect("lock poisoned") = Some(Box::new(factory));
        self
    }

    /// Creates the repository and edge service, and performs the initial
    /// poll. Safe to call once; subsequent calls are no-ops.
    pub async fn init(&self) -> Result<(), fh_edge::EdgeError> {
        if self.assembled.read().expect("lock poisoned").is_some() {
            return Ok(());
        }

        let repo: Arc<dyn FeatureRepository> = Arc::new(FeatureHubRepository::new());
        let edge: Arc<dyn EdgeService> = {
            let custom = self.provider.write().expect("lock poisoned").take();
            match custom {
                Some(factory) => Arc::from(factory(
                    Arc::clone(&repo),
                    self.api_keys.clone(),
                    self.edge_url.clone(),
                )),
                None => match &*self.transport.read().expect("lock poisoned") {
                    Transport::Streaming => Arc::new(StreamingEdge::new(
                        reqwest::Client::new(),
                        self.edge_url.clone(),
                        self.api_keys.clone(),
                        Arc::clone(&repo),
                    )),
                    Transport::Polling { interval_secs } => Arc::new(PollingEdge::new(
                        reqwest::Client::new(),
                        self.edge_url.clone(),
                        self.api_keys.clone(),
                        Arc::clone(&repo),
                        *interval_secs,
                    )),
                },
            }
        };

        edge.poll().await?;

        *self.assembled.write().expect("lock poisoned") = Some(Assembled { repo, edge });
        Ok(())
    }

    /// The shared repository, once [`Config::init`] has run.
    pub fn repository(&self) -> Option<Arc<dyn FeatureRepository>> {
        self.assembled
            .read()
            .expect("lock poisoned")
            .as_ref()
            .map(|a| Arc::clone(&a.repo))
    }

    /// Builds a fresh [`Context`] appropriate to the configured key type.
    /// `None` until [`Config::init`] has run.
    pub fn new_context(&self) -> Option<Context> {
        let guard = self.assembled.read().expect("lock poisoned");
        let assembled = guard.as_ref()?;
        Some(if self.client_evaluated {
            Context::Client(ClientEvalContext::new(
                Arc::clone(&assembled.repo),
                Arc::clone(&assembled.edge),
            ))
        } else {
            Context::Server(ServerEvalContext::new(
                Arc::clone(&assembled.repo),
                Arc::clone(&assembled.edge),
            ))
        })
    }

    /// Tears down the edge service. Idempotent.
    pub async fn close(&self) {
        if let Some(assembled) = self.assembled.write().expect("lock poisoned").take() {
            assembled.edge.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeEdge {
        polled: AtomicUsize,
        closed: AtomicBool,
        client_evaluated: bool,
    }

    #[async_trait::async_trait]
    impl EdgeService for FakeEdge {
        async fn poll(&self) -> Result<(), fh_edge::EdgeError> {
            self.polled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
        async fn context_change(&self, _header: &str) -> Result<(), fh_edge::EdgeError> {
            Ok(())
        }
        fn client_evaluated(&self) -> bool {
            self.client_evaluated
        }
    }

    fn fake_provider(client_evaluated: bool) -> impl Fn(Arc<dyn FeatureRepository>, Vec<String>, String) -> Box<dyn EdgeService>
           + Send
           + Sync
           + 'static {
        move |_repo, _keys, _url| {
            Box::new(FakeEdge {
                polled: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                client_evaluated,
            })
        }
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(
            Config::new("", vec!["key1".into()]),
            Err(ConfigError::EmptyUrl)
        ));
    }

    #[test]
    fn empty_keys_are_rejected() {
        assert!(matches!(
            Config::new("https://edge.example.com", vec![]),
            Err(ConfigError::EmptyKeys)
        ));
    }

    #[test]
    fn mixed_key_types_are_rejected() {
        assert!(matches!(
            Config::new("https://edge.example.com", vec!["*abc".into(), "def".into()]),
            Err(ConfigError::MixedKeyTypes)
        ));
    }

    #[test]
    fn url_is_normalized_with_trailing_slash() {
        let config = Config::new("https://edge.example.com", vec!["key1".into()]).unwrap();
        assert_eq!(config.edge_url, "https://edge.example.com/");
    }

    #[tokio::test]
    async fn init_is_idempotent_and_vends_server_context_for_plain_keys() {
        let config = Config::new("https://edge.example.com", vec!["key1".into()]).unwrap();
        config.edge_service_provider(fake_provider(false));
        config.init().await.unwrap();
        config.init().await.unwrap();
        assert!(config.repository().is_some());
        assert!(matches!(config.new_context(), Some(Context::Server(_))));
    }

    #[tokio::test]
    async fn client_eval_keys_vend_client_context() {
        let config = Config::new("https://edge.example.com", vec!["*abc".into()]).unwrap();
        config.edge_service_provider(fake_provider(true));
        config.init().await.unwrap();
        assert!(matches!(config.new_context(), Some(Context::Client(_))));
    }

    #[test]
    fn new_context_is_none_before_init() {
        let config = Config::new("https://edge.example.com", vec!["key1".into()]).unwrap();
        assert!(config.new_context().is_none());
    }
}
