// SPDX-License-Identifier: MIT OR Apache-2.0
//! Client-side evaluation context: strategies are applied locally.

use crate::base::BaseContext;
use fh_edge::EdgeService;
use fh_repository::{FeatureRepository, FeatureStateHolder};
use fh_strategy::EvalContext;
use std::sync::{Arc, RwLock};

struct Inner {
    base: RwLock<BaseContext>,
    repo: Arc<dyn FeatureRepository>,
    edge: Arc<dyn EdgeService>,
}

/// Request-scoped context whose strategies are evaluated locally against
/// the in-memory repository.
#[derive(Clone)]
pub struct ClientEvalContext {
    inner: Arc<Inner>,
}

impl ClientEvalContext {
    pub(crate) fn new(repo: Arc<dyn FeatureRepository>, edge: Arc<dyn EdgeService>) -> Self {
        Self {
            inner: Arc::new(Inner {
                base: RwLock::new(BaseContext::new()),
                repo,
                edge,
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

    /// Ensures the edge service has polled at least once, so reads through
    /// this context observe live data.
    pub async fn build(&self) -> Result<(), fh_edge::EdgeError> {
        self.inner.edge.poll().await
    }

    /// Runs [`ClientEvalContext::build`] to completion on the current
    /// thread of control.
    pub fn build_sync(&self) -> Result<(), fh_edge::EdgeError> {
        futures::executor::block_on(self.build())
    }

    /// Returns a holder bound to this context, so typed getters evaluate
    /// rollout strategies under the attributes set above.
    pub fn feature(&self, key: &str) -> FeatureStateHolder {
        let ctx: Arc<dyn EvalContext + Send + Sync> = Arc::new(self.clone());
        self.inner.repo.feature(key).with_context(ctx)
    }
}

impl EvalContext for ClientEvalContext {
    fn get_attr(&self, name: &str) -> Option<Vec<String>> {
        self.inner.base.read().expect("lock poisoned").get_attr_values(name)
    }

    fn default_percentage_key(&self) -> Option<String> {
        self.inner
            .base
            .read()
            .expect("lock poisoned")
            .default_percentage_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fh_repository::FeatureHubRepository;

    struct NoopEdge;

    #[async_trait::async_trait]
    impl EdgeService for NoopEdge {
        async fn poll(&self) -> Result<(), fh_edge::EdgeError> {
            Ok(())
        }
        async fn close(&self) {}
        async fn context_change(&self, _header: &str) -> Result<(), fh_edge::EdgeError> {
            Ok(())
        }
        fn client_evaluated(&self) -> bool {
            false
        }
    }

    fn context() -> ClientEvalContext {
        ClientEvalContext::new(Arc::new(FeatureHubRepository::new()), Arc::new(NoopEdge))
    }

    #[tokio::test]
    async fn build_polls_the_edge_service() {
        let ctx = context();
        ctx.build().await.unwrap();
    }

    #[test]
    fn builder_methods_are_chainable_and_readable() {
        let ctx = context();
        ctx.user_key("u1").country("NZ");
        assert_eq!(ctx.get_attr("userkey", None), Some("u1".to_string()));
        assert_eq!(ctx.get_attr("country", None), Some("NZ".to_string()));
    }

    #[test]
    fn feature_binds_context_so_strategies_can_see_attributes() {
        let ctx = context();
        ctx.user_key("abc");
        let holder = ctx.feature("FLAG");
        assert!(!holder.exists());
    }
}
