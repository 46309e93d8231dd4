// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pluggable feature-value interception: lets an embedder override a
//! feature's evaluated value without touching the edge service. Locked
//! features bypass interceptors entirely (enforced by `fh-repository`).

#![deny(unsafe_code)]

use fh_core::FeatureValueType;
use std::collections::HashMap;
use std::sync::RwLock;

/// A raw override value, cast on read to whatever type the caller asked for.
#[derive(Debug, Clone)]
pub struct InterceptorValue(String);

impl InterceptorValue {
    /// Wraps a raw override string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Builds an [`InterceptorValue`] from an already-typed JSON value, e.g.
    /// a matched strategy's value, so it can go through the same `cast`
    /// coercion as an environment override.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let raw = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        Self(raw)
    }

    /// Coerces the raw value to `expected`, defaulting to `STRING` semantics
    /// when `expected` is `None`.
    ///
    /// `BOOLEAN` compares the trimmed, lowercased value to `"true"`;
    /// `NUMBER` parses as `f64` (returning `null` on parse failure);
    /// `STRING`/`JSON` pass the raw string through unchanged.
    pub fn cast(&self, expected: Option<FeatureValueType>) -> serde_json::Value {
        match expected.unwrap_or(FeatureValueType::String) {
            FeatureValueType::Boolean => {
                serde_json::json!(self.0.trim().eq_ignore_ascii_case("true"))
            }
            FeatureValueType::Number => match self.0.trim().parse::<f64>() {
                Ok(n) => serde_json::json!(n),
                Err(_) => serde_json::Value::Null,
            },
            FeatureValueType::String | FeatureValueType::Json => serde_json::json!(self.0),
        }
    }
}

/// A source of per-key override values, consulted before a feature's stored
/// value when the feature is not locked.
pub trait ValueInterceptor: Send + Sync {
    /// Returns an override for `key`, if one applies.
    fn intercepted_value(&self, key: &str) -> Option<InterceptorValue>;
}

/// Reads overrides from `FEATUREHUB_<sanitized-key>` environment variables,
/// gated by the `FEATUREHUB_OVERRIDE_FEATURES` flag.
#[derive(Debug)]
pub struct EnvironmentInterceptor {
    enabled: bool,
}

impl EnvironmentInterceptor {
    /// Reads enablement from the environment at construction time.
    pub fn new() -> Self {
        Self {
            enabled: std::env::var("FEATUREHUB_OVERRIDE_FEATURES").is_ok(),
        }
    }

    /// Builds an interceptor with enablement set explicitly, bypassing the
    /// environment — mainly useful for tests.
    pub fn with_enabled(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Default for EnvironmentInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueInterceptor for EnvironmentInterceptor {
    fn intercepted_value(&self, key: &str) -> Option<InterceptorValue> {
        if !self.enabled {
            return None;
        }
        let sanitized = key.replace(' ', "_");
        std::env::var(format!("FEATUREHUB_{sanitized}"))
            .ok()
            .map(InterceptorValue::new)
    }
}

/// In-memory override map, for tests and embedders who want overrides
/// without environment variables.
#[derive(Debug, Default)]
pub struct StaticInterceptor {
    values: RwLock<HashMap<String, String>>,
}

impl StaticInterceptor {
    /// Builds an empty override map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or replaces) the override for `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().expect("lock poisoned").insert(key.into(), value.into());
    }

    /// Removes the override for `key`, if any.
    pub fn unset(&self, key: &str) {
        self.values.write().expect("lock poisoned").remove(key);
    }
}

impl ValueInterceptor for StaticInterceptor {
    fn intercepted_value(&self, key: &str) -> Option<InterceptorValue> {
        self.values
            .read()
            .expect("lock poisoned")
            .get(key)
            .cloned()
            .map(InterceptorValue::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_boolean_is_case_insensitive() {
        let v = InterceptorValue::new("TRUE");
        assert_eq!(v.cast(Some(FeatureValueType::Boolean)), serde_json::json!(true));
        let v = InterceptorValue::new("nope");
        assert_eq!(v.cast(Some(FeatureValueType::Boolean)), serde_json::json!(false));
    }

    #[test]
    fn cast_number_parses_float() {
        let v = InterceptorValue::new("3.5");
        assert_eq!(v.cast(Some(FeatureValueType::Number)), serde_json::json!(3.5));
    }

    #[test]
    fn cast_number_parse_failure_yields_null() {
        let v = InterceptorValue::new("abc");
        assert_eq!(v.cast(Some(FeatureValueType::Number)), serde_json::Value::Null);
    }

    #[test]
    fn cast_defaults_to_string() {
        let v = InterceptorValue::new("hello");
        assert_eq!(v.cast(None), serde_json::json!("hello"));
    }

    #[test]
    fn from_json_unwraps_string_values() {
        let v = InterceptorValue::from_json(&serde_json::json!("sausage"));
        assert_eq!(v.cast(None), serde_json::json!("sausage"));
    }

    #[test]
    fn from_json_stringifies_numbers() {
        let v = InterceptorValue::from_json(&serde_json::json!(42));
        assert_eq!(v.cast(Some(FeatureValueType::Number)), serde_json::json!(42.0));
    }

    #[test]
    fn static_interceptor_roundtrip() {
        let interceptor = StaticInterceptor::new();
        assert!(interceptor.intercepted_value("FLAG").is_none());
        interceptor.set("FLAG", "on");
        assert_eq!(
            interceptor.intercepted_value("FLAG").unwrap().cast(Some(FeatureValueType::String)),
            serde_json::json!("on")
        );
        interceptor.unset("FLAG");
        assert!(interceptor.intercepted_value("FLAG").is_none());
    }

    #[test]
    fn environment_interceptor_disabled_by_default_flag() {
        let interceptor = EnvironmentInterceptor::with_enabled(false);
        assert!(interceptor.intercepted_value("ANYTHING").is_none());
    }

    #[test]
    fn environment_interceptor_sanitizes_spaces() {
        // Enabled explicitly so the test doesn't depend on process env state.
        let interceptor = EnvironmentInterceptor::with_enabled(true);
        // No env var set, so this should be None rather than panic.
        assert!(interceptor.intercepted_value("My Flag").is_none());
    }
}
