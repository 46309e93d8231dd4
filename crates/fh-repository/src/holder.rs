// SPDX-License-Identifier: MIT OR Apache-2.0
//! `FeatureStateHolder`: the per-feature node a caller actually reads from.

use crate::RepositoryHandle;
use fh_core::{FeatureState, FeatureValueType};
use fh_intercept::InterceptorValue;
use fh_strategy::EvalContext;
use std::sync::{Arc, RwLock};

/// Shared, mutable top-level state for one feature key. Holders returned by
/// [`crate::FeatureHubRepository::feature`] for the same key always wrap the
/// same `Arc<RwLock<FeatureState>>`, so later `notify()` calls are visible to
/// every holder a caller is already holding (sentinel stability).
pub(crate) type SharedState = Arc<RwLock<FeatureState>>;

/// A feature's state, optionally bound to a request context.
///
/// Plays one of three roles depending on how it was obtained:
/// - **live**: returned directly by the repository, backed by real server
///   data.
/// - **sentinel**: returned by the repository for a key it has never heard
///   of; reads as absent until data arrives.
/// - **context-bound child**: produced by [`FeatureStateHolder::with_context`];
///   delegates to its parent for state but evaluates strategies under its
///   own context.
#[derive(Clone)]
pub struct FeatureStateHolder {
    key: String,
    state: SharedState,
    parent: Option<Arc<FeatureStateHolder>>,
    ctx: Option<Arc<dyn EvalContext + Send + Sync>>,
    repo: RepositoryHandle,
}

impl FeatureStateHolder {
    pub(crate) fn new(key: String, state: SharedState, repo: RepositoryHandle) -> Self {
        Self {
            key,
            state,
            parent: None,
            ctx: None,
            repo,
        }
    }

    /// Returns a child holder bound to `ctx`. The child shares the parent's
    /// state but routes strategy evaluation through `ctx`.
    pub fn with_context(&self, ctx: Arc<dyn EvalContext + Send + Sync>) -> Self {
        Self {
            key: self.key.clone(),
            state: Arc::clone(&self.state),
            parent: Some(Arc::new(self.clone())),
            ctx: Some(ctx),
            repo: self.repo.clone(),
        }
    }

    /// Walks parent links to the top-level (non context-bound) holder's
    /// shared state.
    fn top_state(&self) -> SharedState {
        match &self.parent {
            Some(parent) => parent.top_state(),
            None => Arc::clone(&self.state),
        }
    }

    fn snapshot(&self) -> FeatureState {
        self.top_state().read().expect("lock poisoned").clone()
    }

    /// Feature key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Opaque feature id of the top state.
    pub fn id(&self) -> String {
        self.snapshot().id
    }

    /// Version of the top state (`-1` for a never-populated sentinel).
    pub fn version(&self) -> i64 {
        self.snapshot().version
    }

    /// Whether the feature must not be intercepted/overridden locally.
    pub fn locked(&self) -> bool {
        self.snapshot().locked.unwrap_or(false)
    }

    /// `true` iff the top holder has received at least one record (i.e. has
    /// an `l` field).
    pub fn exists(&self) -> bool {
        self.snapshot().exists()
    }

    /// Declared value type, if the feature exists.
    pub fn feature_type(&self) -> Option<FeatureValueType> {
        if self.exists() {
            Some(self.snapshot().feature_type)
        } else {
            None
        }
    }

    /// Feature properties (`fp`), or an empty map if unset.
    pub fn feature_properties(&self) -> std::collections::BTreeMap<String, String> {
        self.snapshot().fp.unwrap_or_default()
    }

    /// `true` iff the resolved value is present and truthy as a boolean.
    pub fn is_enabled(&self) -> bool {
        matches!(self.get_boolean(), Some(true))
    }

    /// `true` iff the resolved value is present at all.
    pub fn is_set(&self) -> bool {
        self.get_value().is_some()
    }

    /// Resolved value, untyped (no `expectedType` filter).
    pub fn get_value(&self) -> Option<serde_json::Value> {
        self.resolve(None)
    }

    /// Resolved value, required to be of `BOOLEAN` type.
    pub fn get_boolean(&self) -> Option<bool> {
        self.resolve(Some(FeatureValueType::Boolean))
            .and_then(|v| v.as_bool())
    }

    /// Alias for [`FeatureStateHolder::get_boolean`].
    pub fn get_flag(&self) -> Option<bool> {
        self.get_boolean()
    }

    /// Resolved value, required to be of `STRING` type.
    pub fn get_string(&self) -> Option<String> {
        self.resolve(Some(FeatureValueType::String))
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Resolved value, required to be of `NUMBER` type.
    pub fn get_number(&self) -> Option<f64> {
        self.resolve(Some(FeatureValueType::Number))
            .and_then(|v| v.as_f64())
    }

    /// Resolved value, required to be of `JSON` type.
    pub fn get_raw_json(&self) -> Option<serde_json::Value> {
        self.resolve(Some(FeatureValueType::Json))
    }

    /// Implements the typed-read algorithm: interceptor bypass-on-lock,
    /// type-tag check, then strategy application when context-bound.
    fn resolve(&self, expected: Option<FeatureValueType>) -> Option<serde_json::Value> {
        if !self.locked() {
            if let Some(intercepted) = self.repo.find_interceptor(&self.key) {
                return Some(intercepted.cast(expected.or(Some(FeatureValueType::String))));
            }
        }

        let state = self.snapshot();
        if !state.exists() {
            return None;
        }
        if let Some(expected) = expected {
            if state.feature_type != expected {
                return None;
            }
        }

        if let Some(ctx) = &self.ctx {
            let applied = self
                .repo
                .apply(&state.strategies, &self.key, &state.id, Some(ctx.as_ref()));
            if applied.matched {
                return applied
                    .value
                    .as_ref()
                    .map(|v| InterceptorValue::from_json(v).cast(expected));
            }
        }

        state.value
    }
}

impl PartialEq for FeatureStateHolder {
    fn eq(&self, other: &Self) -> bool {
        let a = self.snapshot();
        let b = other.snapshot();
        a.id == b.id && a.version == b.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RepositoryInner;
    use fh_core::FeatureValueType;

    fn repo_handle() -> RepositoryHandle {
        RepositoryHandle::new(Arc::new(RepositoryInner::new()))
    }

    #[test]
    fn sentinel_holder_returns_absent_everywhere() {
        let repo = repo_handle();
        let state = Arc::new(RwLock::new(FeatureState::sentinel("FLAG")));
        let holder = FeatureStateHolder::new("FLAG".into(), state, repo);
        assert!(!holder.exists());
        assert_eq!(holder.version(), -1);
        assert!(holder.get_value().is_none());
        assert!(holder.get_boolean().is_none());
    }

    #[test]
    fn live_holder_reads_base_value_without_context() {
        let repo = repo_handle();
        let mut state = FeatureState::sentinel("FLAG");
        state.version = 1;
        state.locked = Some(false);
        state.feature_type = FeatureValueType::Boolean;
        state.value = Some(serde_json::json!(true));
        let holder = FeatureStateHolder::new("FLAG".into(), Arc::new(RwLock::new(state)), repo);
        assert!(holder.exists());
        assert_eq!(holder.get_boolean(), Some(true));
        assert!(holder.is_enabled());
    }

    #[test]
    fn type_mismatch_returns_none() {
        let repo = repo_handle();
        let mut state = FeatureState::sentinel("FLAG");
        state.version = 1;
        state.locked = Some(false);
        state.feature_type = FeatureValueType::String;
        state.value = Some(serde_json::json!("hello"));
        let holder = FeatureStateHolder::new("FLAG".into(), Arc::new(RwLock::new(state)), repo);
        assert!(holder.get_boolean().is_none());
        assert_eq!(holder.get_string(), Some("hello".to_string()));
    }

    #[test]
    fn with_context_shares_parent_state() {
        struct NoopCtx;
        impl EvalContext for NoopCtx {
            fn get_attr(&self, _name: &str) -> Option<Vec<String>> {
                None
            }
            fn default_percentage_key(&self) -> Option<String> {
                None
            }
        }

        let repo = repo_handle();
        let mut state = FeatureState::sentinel("FLAG");
        state.version = 2;
        state.locked = Some(false);
        state.feature_type = FeatureValueType::Boolean;
        state.value = Some(serde_json::json!(false));
        let shared = Arc::new(RwLock::new(state));
        let parent = FeatureStateHolder::new("FLAG".into(), shared, repo);
        let child = parent.with_context(Arc::new(NoopCtx));
        assert_eq!(child.version(), parent.version());
        assert_eq!(child.get_boolean(), Some(false));
    }

    #[test]
    fn holder_equality_is_id_and_version() {
        let repo = repo_handle();
        let mut a = FeatureState::sentinel("FLAG");
        a.id = "f1".into();
        a.version = 5;
        let mut b = FeatureState::sentinel("FLAG");
        b.id = "f1".into();
        b.version = 5;
        let ha = FeatureStateHolder::new("FLAG".into(), Arc::new(RwLock::new(a)), repo.clone());
        let hb = FeatureStateHolder::new("FLAG".into(), Arc::new(RwLock::new(b)), repo);
        assert_eq!(ha, hb);
    }
}
