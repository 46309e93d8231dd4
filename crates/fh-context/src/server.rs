// SPDX-License-Identifier: MIT OR Apache-2.0
//! Server-side evaluation context: strategies are applied remotely, by
//! sending the attribute set to the edge as a context header.

use crate::base::BaseContext;
use fh_edge::{EdgeError, EdgeService};
use fh_repository::{FeatureRepository, FeatureStateHolder};
use std::sync::{Arc, RwLock};

struct Inner {
    base: RwLock<BaseContext>,
    repo: Arc<dyn FeatureRepository>,
    edge: Arc<dyn EdgeService>,
    last_header: RwLock<String>,
}

/// Request-scoped context whose attributes are sent to the edge for
/// remote evaluation; typed getters read the server's already-evaluated
/// feature state verbatim.
#[derive(Clone)]
pub struct ServerEvalContext {
    inner: Arc<Inner>,
}

impl ServerEvalContext {
    pub(crate) fn new(repo: Arc<dyn FeatureRepository>, edge: Arc<dyn EdgeService>) -> Self {
        Self {
            inner: Arc::new(Inner {
                base: RwLock::new(BaseContext::new()),
                repo,
                edge,
                last_header: RwLock::new(String::new()),
            }),
        }
    }

    pub fn user_key(&self, value: impl Into<String>) -> &Self {
        self.inner.base.write().expect("lock poisoned").user_key(value);
        self
    }

    pub fn session_key(&self, value: impl Into<String>) -> &Self {
        self.inner
            .base
            .write()
            .expect("lock poisoned")
            .session_key(value);
        self
    }

    pub fn country(&self, value: impl Into<String>) -> &Self {
        self.inner.base.write().expect("lock poisoned").country(value);
        self
    }

    pub fn device(&self, value: impl Into<String>) -> &Self {
        self.inner.base.write().expect("lock poisoned").device(value);
        self
    }

    pub fn platform(&self, value: impl Into<String>) -> &Self {
        self.inner.base.write().expect("lock poisoned").platform(value);
        self
    }

    pub fn version(&self, value: impl Into<String>) -> &Self {
        self.inner.base.write().expect("lock poisoned").version(value);
        self
    }

    pub fn attribute_values(&self, key: impl Into<String>, values: Vec<String>) -> &Self {
        self.inner
            .base
            .write()
            .expect("lock poisoned")
            .attribute_values(key, values);
        self
    }

    pub fn clear(&self) -> &Self {
        self.inner.base.write().expect("lock poisoned").clear();
        self
    }

    pub fn get_attr(&self, key: &str, default: Option<&str>) -> Option<String> {
        self.inner.base.read().expect("lock poisoned").get_attr(key, default)
    }

    /// URL-encodes the current attributes in the order they were set —
    /// `userkey` before `country` if `userkey` was set first, matching the
    /// original SDK's plain-dict iteration order rather than an alphabetical
    /// one.
    fn encode_header(&self) -> String {
        let base = self.inner.base.read().expect("lock poisoned");
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in base.sorted_first_values() {
            serializer.append_pair(&key, &value);
        }
        serializer.finish()
    }

    /// URL-encodes the current attributes and, if they changed since the
    /// last build, marks the repository not-ready and pushes the new
    /// header to the edge service. An empty header (no attributes set)
    /// just ensures the edge has polled at least once.
    pub async fn build(&self) -> Result<(), EdgeError> {
        let new_header = self.encode_header();

        if new_header.is_empty() {
            return self.inner.edge.poll().await;
        }

        let changed = {
            let mut last = self.inner.last_header.write().expect("lock poisoned");
            let changed = *last != new_header;
            *last = new_header.clone();
            changed
        };

        if changed {
            self.inner.repo.not_ready();
            self.inner.edge.context_change(&new_header).await?;
        }
        Ok(())
    }

    /// Runs [`ServerEvalContext::build`] to completion on the current
    /// thread of control.
    pub fn build_sync(&self) -> Result<(), EdgeError> {
        futures::executor::block_on(self.build())
    }

    /// Returns the repository's holder verbatim — the server has already
    /// evaluated strategies for the attributes sent in `build()`.
    pub fn feature(&self, key: &str) -> FeatureStateHolder {
        self.inner.repo.feature(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fh_repository::FeatureHubRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingEdge {
        polls: AtomicUsize,
        changes: RwLock<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl EdgeService for RecordingEdge {
        async fn poll(&self) -> Result<(), EdgeError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn close(&self) {}
        async fn context_change(&self, header: &str) -> Result<(), EdgeError> {
            self.changes.write().expect("lock poisoned").push(header.to_string());
            Ok(())
        }
        fn client_evaluated(&self) -> bool {
            false
        }
    }

    fn context() -> (ServerEvalContext, Arc<RecordingEdge>) {
        let edge = Arc::new(RecordingEdge {
            polls: AtomicUsize::new(0),
            changes: RwLock::new(Vec::new()),
        });
        let ctx = ServerEvalContext::new(Arc::new(FeatureHubRepository::new()), edge.clone());
        (ctx, edge)
    }

    #[tokio::test]
    async fn first_build_with_no_attributes_only_polls() {
        let (ctx, edge) = context();
        ctx.build().await.unwrap();
        assert_eq!(edge.polls.load(Ordering::SeqCst), 1);
        assert!(edge.changes.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn build_with_attributes_sends_context_change_once() {
        let (ctx, edge) = context();
        ctx.user_key("abc");
        ctx.build().await.unwrap();
        ctx.build().await.unwrap();
        assert_eq!(edge.changes.read().unwrap().len(), 1);
        assert_eq!(edge.changes.read().unwrap()[0], "userkey=abc");
    }

    #[tokio::test]
    async fn changing_attributes_resends_context_change() {
        let (ctx, edge) = context();
        ctx.user_key("abc");
        ctx.build().await.unwrap();
        ctx.user_key("def");
        ctx.build().await.unwrap();
        assert_eq!(edge.changes.read().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn header_encoding_preserves_insertion_order_and_urlencodes() {
        let (ctx, edge) = context();
        ctx.device("mobile phone");
        ctx.country("NZ");
        ctx.build().await.unwrap();
        assert_eq!(
            edge.changes.read().unwrap()[0],
            "device=mobile+phone&country=NZ"
        );
    }

    #[tokio::test]
    async fn header_encoding_matches_userkey_then_piffle_scenario() {
        let (ctx, edge) = context();
        ctx.user_key("fred");
        ctx.attribute_values("piffle", vec!["a+".into(), "b".into(), "c".into()]);
        ctx.build().await.unwrap();
        assert_eq!(
            edge.changes.read().unwrap()[0],
            "userkey=fred&piffle=a%2B"
        );
    }

    #[test]
    fn feature_returns_holder_verbatim_without_context_binding() {
        let (ctx, _edge) = context();
        let holder = ctx.feature("FLAG");
        assert!(!holder.exists());
    }
}
