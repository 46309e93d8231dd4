// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire representation of a feature flag.

use crate::error::StrategyError;
use crate::strategy::RolloutStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Declared type of a [`FeatureState::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FeatureValueType {
    /// Boolean flag.
    Boolean,
    /// UTF-8 string.
    String,
    /// Double-precision number.
    Number,
    /// Arbitrary JSON payload.
    Json,
}

impl FromStr for FeatureValueType {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOLEAN" => Ok(Self::Boolean),
            "STRING" => Ok(Self::String),
            "NUMBER" => Ok(Self::Number),
            "JSON" => Ok(Self::Json),
            other => Err(StrategyError::UnknownFeatureValueType(other.to_string())),
        }
    }
}

impl fmt::Display for FeatureValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Boolean => "BOOLEAN",
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Json => "JSON",
        };
        f.write_str(s)
    }
}

impl<'de> Deserialize<'de> for FeatureValueType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        FeatureValueType::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// A feature flag record as sent by the edge.
///
/// Only the fields the client actually reads are modelled; unknown JSON
/// fields are ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureState {
    /// Opaque feature id, stable across renames.
    pub id: String,
    /// Human-facing feature key, unique within a repository.
    pub key: String,
    /// Monotonically increasing version number.
    pub version: i64,
    /// Declared value type.
    #[serde(rename = "type")]
    pub feature_type: FeatureValueType,
    /// Base (non-strategy) value, absent if never set.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Locked features bypass interceptor overrides.
    #[serde(default, rename = "l")]
    pub locked: Option<bool>,
    /// Ordered rollout strategies, evaluated first-match-wins.
    #[serde(default)]
    pub strategies: Vec<RolloutStrategy>,
    /// Optional free-form feature properties.
    #[serde(default)]
    pub fp: Option<BTreeMap<String, String>>,
}

impl FeatureState {
    /// A holder is considered to "exist" once it has received a record where
    /// `l` (locked) is present, per the top-level holder contract.
    pub fn exists(&self) -> bool {
        self.locked.is_some()
    }

    /// Sentinel record for a key the repository has never seen data for.
    pub fn sentinel(key: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            key: key.into(),
            version: -1,
            feature_type: FeatureValueType::Boolean,
            value: None,
            locked: None,
            strategies: Vec::new(),
            fp: None,
        }
    }

    /// Whether this record is a sentinel placeholder.
    pub fn is_sentinel(&self) -> bool {
        self.version == -1 && self.locked.is_none()
    }
}
