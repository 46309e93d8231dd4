// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rollout strategy value objects.

use crate::error::StrategyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator carried by a [`RolloutStrategyAttribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Conditional {
    /// Exact equality.
    Equals,
    /// Negated equality.
    NotEquals,
    /// Set membership (supplied value is one of `values`).
    Includes,
    /// Negated set membership.
    Excludes,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
    /// Strictly greater than.
    Greater,
    /// Greater than or equal to.
    GreaterEquals,
    /// Strictly less than.
    Less,
    /// Less than or equal to.
    LessEquals,
    /// Regular-expression search.
    Regex,
}

impl FromStr for Conditional {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EQUALS" => Ok(Self::Equals),
            "NOT_EQUALS" => Ok(Self::NotEquals),
            "INCLUDES" => Ok(Self::Includes),
            "EXCLUDES" => Ok(Self::Excludes),
            "STARTS_WITH" => Ok(Self::StartsWith),
            "ENDS_WITH" => Ok(Self::EndsWith),
            "GREATER" => Ok(Self::Greater),
            "GREATER_EQUALS" => Ok(Self::GreaterEquals),
            "LESS" => Ok(Self::Less),
            "LESS_EQUALS" => Ok(Self::LessEquals),
            "REGEX" => Ok(Self::Regex),
            other => Err(StrategyError::UnknownConditional(other.to_string())),
        }
    }
}

impl fmt::Display for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equals => "EQUALS",
            Self::NotEquals => "NOT_EQUALS",
            Self::Includes => "INCLUDES",
            Self::Excludes => "EXCLUDES",
            Self::StartsWith => "STARTS_WITH",
            Self::EndsWith => "ENDS_WITH",
            Self::Greater => "GREATER",
            Self::GreaterEquals => "GREATER_EQUALS",
            Self::Less => "LESS",
            Self::LessEquals => "LESS_EQUALS",
            Self::Regex => "REGEX",
        };
        f.write_str(s)
    }
}

impl<'de> Deserialize<'de> for Conditional {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Conditional::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// Attribute field type, driving which [`crate::feature`] matcher applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldType {
    /// Lexical string comparison.
    String,
    /// Loosely-parsed semantic version comparison.
    SemanticVersion,
    /// Numeric comparison.
    Number,
    /// ISO-8601 date, compared as a string.
    Date,
    /// ISO-8601 datetime, compared as a string.
    Datetime,
    /// Boolean comparison.
    Boolean,
    /// CIDR / plain-address membership.
    IpAddress,
}

impl FromStr for FieldType {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRING" => Ok(Self::String),
            "SEMANTIC_VERSION" => Ok(Self::SemanticVersion),
            "NUMBER" => Ok(Self::Number),
            "DATE" => Ok(Self::Date),
            "DATETIME" => Ok(Self::Datetime),
            "BOOLEAN" => Ok(Self::Boolean),
            "IP_ADDRESS" => Ok(Self::IpAddress),
            other => Err(StrategyError::UnknownFieldType(other.to_string())),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "STRING",
            Self::SemanticVersion => "SEMANTIC_VERSION",
            Self::Number => "NUMBER",
            Self::Date => "DATE",
            Self::Datetime => "DATETIME",
            Self::Boolean => "BOOLEAN",
            Self::IpAddress => "IP_ADDRESS",
        };
        f.write_str(s)
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        FieldType::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// One comparison clause within a [`RolloutStrategy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutStrategyAttribute {
    /// Optional attribute id (not semantically significant).
    #[serde(default)]
    pub id: Option<String>,
    /// Context attribute name this clause reads.
    #[serde(rename = "fieldName")]
    pub field_name: String,
    /// Comparison operator.
    pub conditional: Conditional,
    /// Declared type of `values` / the supplied context attribute.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Heterogeneous comparison values.
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
}

impl RolloutStrategyAttribute {
    /// `values` coerced to `f64`, skipping entries that don't parse.
    pub fn float_values(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter_map(|v| match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            })
            .collect()
    }

    /// `values` coerced to `String`, skipping nulls.
    pub fn str_values(&self) -> Vec<String> {
        self.values
            .iter()
            .filter_map(|v| match v {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string().trim_matches('"').to_string()),
            })
            .collect()
    }
}

/// A single rollout rule: a value plus zero or more gating conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutStrategy {
    /// Opaque strategy id.
    #[serde(default)]
    pub id: Option<String>,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Value returned when this strategy matches.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Integer in `0..=1_000_000` where `1_000_000` means 100%.
    #[serde(default)]
    pub percentage: i64,
    /// Attribute names used to compute the percentage bucket key.
    #[serde(default, rename = "percentageAttributes")]
    pub percentage_attributes: Vec<String>,
    /// Gating attribute clauses, all of which must match.
    #[serde(default)]
    pub attributes: Vec<RolloutStrategyAttribute>,
}

impl RolloutStrategy {
    /// Whether this strategy carries any gating attributes.
    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Whether this strategy keys its percentage bucket off context attributes
    /// rather than the default percentage key.
    pub fn has_percentage_attributes(&self) -> bool {
        !self.percentage_attributes.is_empty()
    }
}
