// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyed store of feature holders, fed by `notify()` calls from an edge
//! service.

use crate::holder::FeatureStateHolder;
use dashmap::DashMap;
use fh_core::{Applied, FeatureState, RolloutStrategy};
use fh_intercept::{InterceptorValue, ValueInterceptor};
use fh_strategy::{EvalContext, MatcherRegistry, Murmur3PercentageCalculator, PercentageCalculator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;

/// Narrow capability surface `fh-edge` and `fh-context` depend on, so they
/// never need the concrete [`FeatureHubRepository`] type.
pub trait FeatureRepository: Send + Sync {
    /// Ingests an edge payload. `kind` is one of `"features"`, `"feature"`,
    /// `"delete_feature"` or `"failed"`.
    fn notify(&self, kind: &str, data: Option<serde_json::Value>);

    /// Returns the holder for `key`, creating a stable sentinel if unseen.
    fn feature(&self, key: &str) -> FeatureStateHolder;

    /// Whether the repository has received data since the last failure.
    fn is_ready(&self) -> bool;

    /// Clears the readiness flag.
    fn not_ready(&self);

    /// Registers an interceptor, consulted in registration order.
    fn register_interceptor(&self, interceptor: Box<dyn ValueInterceptor>);

    /// Returns the first interceptor hit for `key`, if any.
    fn find_interceptor(&self, key: &str) -> Option<InterceptorValue>;

    /// Snapshot of all live (non-sentinel) feature records.
    fn extract_feature_state(&self) -> Vec<FeatureState>;

    /// Evaluates `strategies` against `ctx`, delegating to the configured
    /// strategy applier.
    fn apply(
        &self,
        strategies: &[RolloutStrategy],
        key: &str,
        feature_id: &str,
        ctx: Option<&dyn EvalContext>,
    ) -> Applied;
}

pub(crate) struct RepositoryInner {
    features: DashMap<String, Arc<RwLock<FeatureState>>>,
    interceptors: RwLock<Vec<Box<dyn ValueInterceptor>>>,
    ready: AtomicBool,
    registry: MatcherRegistry,
    calculator: Box<dyn PercentageCalculator>,
    readiness: Notify,
}

impl RepositoryInner {
    pub(crate) fn new() -> Self {
        Self {
            features: DashMap::new(),
            interceptors: RwLock::new(Vec::new()),
            ready: AtomicBool::new(false),
            registry: MatcherRegistry::new(),
            calculator: Box::new(Murmur3PercentageCalculator),
            readiness: Notify::new(),
        }
    }
}

/// Cheaply-cloneable handle into a repository's shared interceptor/strategy
/// state, held by every [`FeatureStateHolder`] it produced.
#[derive(Clone)]
pub struct RepositoryHandle {
    inner: Arc<RepositoryInner>,
}

impl RepositoryHandle {
    pub(crate) fn new(inner: Arc<RepositoryInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn find_interceptor(&self, key: &str) -> Option<InterceptorValue> {
        self.inner
            .interceptors
            .read()
            .expect("lock poisoned")
            .iter()
            .find_map(|i| i.intercepted_value(key))
    }

    pub(crate) fn apply(
        &self,
        strategies: &[RolloutStrategy],
        key: &str,
        feature_id: &str,
        ctx: Option<&dyn EvalContext>,
    ) -> Applied {
        fh_strategy::apply(
            strategies,
            key,
            feature_id,
            ctx,
            &self.inner.registry,
            self.inner.calculator.as_ref(),
        )
    }
}

/// `DashMap`-backed, concurrency-safe implementation of [`FeatureRepository`].
#[derive(Clone)]
pub struct FeatureHubRepository {
    inner: Arc<RepositoryInner>,
}

impl FeatureHubRepository {
    /// Builds an empty, not-ready repository.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RepositoryInner::new()),
        }
    }

    fn handle(&self) -> RepositoryHandle {
        RepositoryHandle::new(Arc::clone(&self.inner))
    }

    /// Resolves a future that completes once the repository becomes ready.
    /// Already-ready repositories resolve immediately on the next poll.
    pub async fn ready(&self) {
        loop {
            if self.is_ready() {
                return;
            }
            let notified = self.inner.readiness.notified();
            if self.is_ready() {
                return;
            }
            notified.await;
        }
    }

    fn update_one(&self, record: FeatureState) {
        if record.key.is_empty() {
            return;
        }
        match self.inner.features.get(&record.key) {
            Some(existing) => {
                let mut guard = existing.write().expect("lock poisoned");
                if record.version < guard.version {
                    return;
                }
                if record.version == guard.version && record.value == guard.value {
                    return;
                }
                tracing::debug!(
                    target: "featurehub.repository",
                    key = %record.key,
                    version = record.version,
                    "overwriting feature state"
                );
                *guard = record;
            }
            None => {
                tracing::debug!(target: "featurehub.repository", key = %record.key, "creating feature holder");
                self.inner
                    .features
                    .insert(record.key.clone(), Arc::new(RwLock::new(record)));
            }
        }
    }
}

impl Default for FeatureHubRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureRepository for FeatureHubRepository {
    fn notify(&self, kind: &str, data: Option<serde_json::Value>) {
        if kind == "failed" {
            self.not_ready();
            return;
        }
        let Some(data) = data else {
            return;
        };
        match kind {
            "features" => {
                let Ok(records) = serde_json::from_value::<Vec<FeatureState>>(data) else {
                    tracing::warn!(target: "featurehub.repository", "malformed features payload, skipping");
                    return;
                };
                for record in records {
                    self.update_one(record);
                }
                self.inner.ready.store(true, Ordering::SeqCst);
                self.inner.readiness.notify_waiters();
            }
            "feature" => {
                let Ok(record) = serde_json::from_value::<FeatureState>(data) else {
                    tracing::warn!(target: "featurehub.repository", "malformed feature payload, skipping");
                    return;
                };
                self.update_one(record);
                self.inner.ready.store(true, Ordering::SeqCst);
                self.inner.readiness.notify_waiters();
            }
            "delete_feature" => {
                if let Some(key) = data.get("key").and_then(|v| v.as_str()) {
                    if let Some(existing) = self.inner.features.get(key) {
                        let mut guard = existing.write().expect("lock poisoned");
                        *guard = FeatureState::sentinel(key);
                    }
                }
            }
            other => {
                tracing::warn!(target: "featurehub.repository", kind = other, "unknown notify kind, ignoring");
            }
        }
    }

    fn feature(&self, key: &str) -> FeatureStateHolder {
        let state = self
            .inner
            .features
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(FeatureState::sentinel(key))))
            .clone();
        FeatureStateHolder::new(key.to_string(), state, self.handle())
    }

    fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    fn not_ready(&self) {
        self.inner.ready.store(false, Ordering::SeqCst);
    }

    fn register_interceptor(&self, interceptor: Box<dyn ValueInterceptor>) {
        self.inner
            .interceptors
            .write()
            .expect("lock poisoned")
            .push(interceptor);
    }

    fn find_interceptor(&self, key: &str) -> Option<InterceptorValue> {
        self.handle().find_interceptor(key)
    }

    fn extract_feature_state(&self) -> Vec<FeatureState> {
        self.inner
            .features
            .iter()
            .map(|entry| entry.value().read().expect("lock poisoned").clone())
            .filter(|state| state.exists())
            .collect()
    }

    fn apply(
        &self,
        strategies: &[RolloutStrategy],
        key: &str,
        feature_id: &str,
        ctx: Option<&dyn EvalContext>,
    ) -> Applied {
        self.handle().apply(strategies, key, feature_id, ctx)
    }
}
