// SPDX-License-Identifier: MIT OR Apache-2.0
//! One [`StrategyMatcher`] per attribute field type, dispatched by
//! [`MatcherRegistry`].

use fh_core::{Conditional, FieldType, RolloutStrategyAttribute};
use std::net::IpAddr;

/// A single field-type-specific comparison strategy.
pub trait StrategyMatcher: Send + Sync {
    /// Whether `supplied` (the context attribute's value, possibly
    /// multi-valued) satisfies `attr`'s conditional against its `values`.
    fn matches(&self, supplied: &[String], attr: &RolloutStrategyAttribute) -> bool;
}

/// Case-insensitive `"true"`/other comparison.
#[derive(Debug, Default)]
pub struct BooleanMatcher;

impl StrategyMatcher for BooleanMatcher {
    fn matches(&self, supplied: &[String], attr: &RolloutStrategyAttribute) -> bool {
        let Some(first) = supplied.first() else {
            return false;
        };
        let supplied_bool = first.eq_ignore_ascii_case("true");
        let attr_bool = attr
            .values
            .first()
            .map(|v| match v {
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
                _ => false,
            })
            .unwrap_or(false);
        match attr.conditional {
            Conditional::Equals => supplied_bool == attr_bool,
            Conditional::NotEquals => supplied_bool != attr_bool,
            _ => false,
        }
    }
}

/// Lexical string comparison, also used for `DATE`/`DATETIME` attributes.
#[derive(Debug, Default)]
pub struct StringMatcher;

impl StrategyMatcher for StringMatcher {
    fn matches(&self, supplied: &[String], attr: &RolloutStrategyAttribute) -> bool {
        let values = attr.str_values();
        let any_eq = supplied.iter().any(|s| values.contains(s));
        match attr.conditional {
            Conditional::Equals | Conditional::Includes => any_eq,
            Conditional::NotEquals | Conditional::Excludes => !any_eq,
            Conditional::StartsWith => supplied
                .iter()
                .any(|s| values.iter().any(|v| s.starts_with(v.as_str()))),
            Conditional::EndsWith => supplied
                .iter()
                .any(|s| values.iter().any(|v| s.ends_with(v.as_str()))),
            Conditional::Greater => supplied
                .iter()
                .any(|s| values.iter().any(|v| s.as_str() > v.as_str())),
            Conditional::GreaterEquals => supplied
                .iter()
                .any(|s| values.iter().any(|v| s.as_str() >= v.as_str())),
            Conditional::Less => supplied
                .iter()
                .any(|s| values.iter().any(|v| s.as_str() < v.as_str())),
            Conditional::LessEquals => supplied
                .iter()
                .any(|s| values.iter().any(|v| s.as_str() <= v.as_str())),
            Conditional::Regex => values
                .iter()
                .filter_map(|pattern| regex::Regex::new(pattern).ok())
                .any(|re| supplied.iter().any(|s| re.is_match(s))),
        }
    }
}

/// Numeric comparison; `STARTS_WITH`/`ENDS_WITH`/`REGEX` fall back to string
/// semantics on the raw supplied text — preserved from the reference
/// implementation, see the Open Questions note in `DESIGN.md`.
#[derive(Debug, Default)]
pub struct NumberMatcher;

impl StrategyMatcher for NumberMatcher {
    fn matches(&self, supplied: &[String], attr: &RolloutStrategyAttribute) -> bool {
        if matches!(
            attr.conditional,
            Conditional::StartsWith | Conditional::EndsWith | Conditional::Regex
        ) {
            return StringMatcher.matches(supplied, attr);
        }
        let parsed: Vec<f64> = supplied.iter().filter_map(|s| s.parse::<f64>().ok()).collect();
        if parsed.is_empty() {
            return false;
        }
        let values = attr.float_values();
        match attr.conditional {
            Conditional::Equals | Conditional::Includes => parsed
                .iter()
                .any(|p| values.iter().any(|v| (p - v).abs() < f64::EPSILON)),
            Conditional::NotEquals | Conditional::Excludes => !parsed
                .iter()
                .any(|p| values.iter().any(|v| (p - v).abs() < f64::EPSILON)),
            Conditional::Greater => parsed.iter().any(|p| values.iter().any(|v| p > v)),
            Conditional::GreaterEquals => parsed.iter().any(|p| values.iter().any(|v| p >= v)),
            Conditional::Less => parsed.iter().any(|p| values.iter().any(|v| p < v)),
            Conditional::LessEquals => parsed.iter().any(|p| values.iter().any(|v| p <= v)),
            Conditional::StartsWith | Conditional::EndsWith | Conditional::Regex => unreachable!(),
        }
    }
}

fn parse_loose_semver(s: &str) -> Option<semver::Version> {
    let trimmed = s.trim();
    let parts: Vec<&str> = trimmed.split('.').collect();
    let padded = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => trimmed.to_string(),
    };
    semver::Version::parse(&padded).ok()
}

/// Loosely-parsed semantic version comparison (`1` and `1.2` are coerced to
/// `1.0.0`/`1.2.0` before comparing, matching the reference SDK's
/// `loose=True` semver compare).
#[derive(Debug, Default)]
pub struct SemanticVersionMatcher;

impl StrategyMatcher for SemanticVersionMatcher {
    fn matches(&self, supplied: &[String], attr: &RolloutStrategyAttribute) -> bool {
        let Some(supplied_version) = supplied.first().and_then(|s| parse_loose_semver(s)) else {
            return false;
        };
        let values: Vec<semver::Version> = attr
            .str_values()
            .iter()
            .filter_map(|s| parse_loose_semver(s))
            .collect();
        match attr.conditional {
            Conditional::Equals | Conditional::Includes => {
                values.iter().any(|v| *v == supplied_version)
            }
            Conditional::NotEquals | Conditional::Excludes => {
                !values.iter().any(|v| *v == supplied_version)
            }
            Conditional::Greater => values.iter().any(|v| supplied_version > *v),
            Conditional::GreaterEquals => values.iter().any(|v| supplied_version >= *v),
            Conditional::Less => values.iter().any(|v| supplied_version < *v),
            Conditional::LessEquals => values.iter().any(|v| supplied_version <= *v),
            _ => false,
        }
    }
}

fn to_network(s: &str) -> Option<ipnetwork::IpNetwork> {
    if let Ok(net) = s.parse::<ipnetwork::IpNetwork>() {
        return Some(net);
    }
    let addr: IpAddr = s.parse().ok()?;
    ipnetwork::IpNetwork::new(addr, if addr.is_ipv4() { 32 } else { 128 }).ok()
}

/// CIDR / plain-address membership test.
///
/// `EXCLUDES` and `NOT_EQUALS` are treated identically (both mean "contained
/// in none of the supplied networks") — preserved from the reference SDK,
/// see `DESIGN.md`.
#[derive(Debug, Default)]
pub struct IpAddressMatcher;

impl StrategyMatcher for IpAddressMatcher {
    fn matches(&self, supplied: &[String], attr: &RolloutStrategyAttribute) -> bool {
        let Some(addr) = supplied.first().and_then(|s| s.parse::<IpAddr>().ok()) else {
            return false;
        };
        let networks: Vec<ipnetwork::IpNetwork> =
            attr.str_values().iter().filter_map(|s| to_network(s)).collect();
        let contained = networks.iter().any(|n| n.contains(addr));
        match attr.conditional {
            Conditional::Includes | Conditional::Equals => contained,
            Conditional::Excludes | Conditional::NotEquals => !contained,
            _ => false,
        }
    }
}

/// Always returns `false` — the terminal matcher for field types with no
/// dedicated comparison semantics.
#[derive(Debug, Default)]
pub struct FallthroughMatcher;

impl StrategyMatcher for FallthroughMatcher {
    fn matches(&self, _supplied: &[String], _attr: &RolloutStrategyAttribute) -> bool {
        false
    }
}

/// Dispatches a [`FieldType`] to its [`StrategyMatcher`].
pub struct MatcherRegistry {
    boolean: BooleanMatcher,
    string: StringMatcher,
    number: NumberMatcher,
    semver: SemanticVersionMatcher,
    ip: IpAddressMatcher,
}

impl MatcherRegistry {
    /// Builds the registry with the default matcher for every field type.
    pub fn new() -> Self {
        Self {
            boolean: BooleanMatcher,
            string: StringMatcher,
            number: NumberMatcher,
            semver: SemanticVersionMatcher,
            ip: IpAddressMatcher,
        }
    }

    /// Looks up the matcher for `field_type`. `DATE`/`DATETIME` share the
    /// string matcher: ISO-8601 lexical order is correct for equal-width
    /// timestamps.
    pub fn find(&self, field_type: FieldType) -> &dyn StrategyMatcher {
        match field_type {
            FieldType::Boolean => &self.boolean,
            FieldType::String | FieldType::Date | FieldType::Datetime => &self.string,
            FieldType::Number => &self.number,
            FieldType::SemanticVersion => &self.semver,
            FieldType::IpAddress => &self.ip,
        }
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}
