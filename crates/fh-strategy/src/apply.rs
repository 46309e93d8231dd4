// SPDX-License-Identifier: MIT OR Apache-2.0
//! Combines percentage bucketing and attribute matching across an ordered
//! list of strategies to produce a single [`Applied`] result.

use crate::context::EvalContext;
use crate::matchers::MatcherRegistry;
use crate::percentage::PercentageCalculator;
use chrono::Utc;
use fh_core::{Applied, Conditional, FieldType, RolloutStrategy, RolloutStrategyAttribute};
use std::collections::HashMap;

/// `fieldName` that triggers synthesis of the current UTC date/datetime when
/// the context has no explicit value for it.
const NOW_FIELD: &str = "now";

fn resolve_supplied(
    ctx: &dyn EvalContext,
    attr: &RolloutStrategyAttribute,
) -> Option<Vec<String>> {
    if let Some(supplied) = ctx.get_attr(&attr.field_name) {
        return Some(supplied);
    }
    if attr.field_name.eq_ignore_ascii_case(NOW_FIELD) {
        return match attr.field_type {
            FieldType::Date => Some(vec![Utc::now().format("%Y-%m-%d").to_string()]),
            FieldType::Datetime => Some(vec![Utc::now().to_rfc3339()]),
            _ => None,
        };
    }
    None
}

/// Whether every attribute of `strategy` matches `ctx`. Short-circuits on the
/// first mismatch.
pub fn match_attributes(
    ctx: &dyn EvalContext,
    strategy: &RolloutStrategy,
    registry: &MatcherRegistry,
) -> bool {
    strategy
        .attributes
        .iter()
        .all(|attr| match_attribute(ctx, attr, registry))
}

/// Whether a single attribute clause matches `ctx`.
pub fn match_attribute(
    ctx: &dyn EvalContext,
    attr: &RolloutStrategyAttribute,
    registry: &MatcherRegistry,
) -> bool {
    let supplied = resolve_supplied(ctx, attr);
    let values_absent = attr.values.is_empty();
    match supplied {
        None if values_absent => attr.conditional == Conditional::Equals,
        None => false,
        Some(_) if values_absent => false,
        Some(supplied) => registry.find(attr.field_type).matches(&supplied, attr),
    }
}

fn determine_percentage_key(ctx: &dyn EvalContext, strategy: &RolloutStrategy) -> String {
    if strategy.has_percentage_attributes() {
        strategy
            .percentage_attributes
            .iter()
            .map(|name| {
                ctx.get_attr(name)
                    .map(|values| values.join(","))
                    .unwrap_or_else(|| "<none>".to_string())
            })
            .collect::<Vec<_>>()
            .join("$")
    } else {
        ctx.default_percentage_key().unwrap_or_default()
    }
}

/// Evaluates `strategies` against `ctx` in order and returns the first match.
///
/// `feature_value_id` seeds the percentage bucket so that the same context
/// buckets consistently per-feature. `key` identifies the feature for
/// diagnostics only and does not affect matching.
pub fn apply(
    strategies: &[RolloutStrategy],
    key: &str,
    feature_value_id: &str,
    ctx: Option<&dyn EvalContext>,
    registry: &MatcherRegistry,
    calculator: &dyn PercentageCalculator,
) -> Applied {
    let Some(ctx) = ctx else {
        return Applied::unmatched();
    };
    if strategies.is_empty() {
        return Applied::unmatched();
    }

    let mut base_percentage: HashMap<String, i64> = HashMap::new();
    let mut percentage_cache: HashMap<String, u32> = HashMap::new();

    for strategy in strategies {
        if strategy.percentage != 0
            && (ctx.default_percentage_key().is_some() || strategy.has_percentage_attributes())
        {
            let pk = determine_percentage_key(ctx, strategy);
            let percentage = *percentage_cache
                .entry(pk.clone())
                .or_insert_with(|| calculator.percentage(&pk, feature_value_id));
            let use_base = if strategy.has_attributes() {
                0
            } else {
                *base_percentage.get(&pk).unwrap_or(&0)
            };
            if percentage as i64 <= use_base + strategy.percentage {
                if !strategy.has_attributes() || match_attributes(ctx, strategy, registry) {
                    tracing::debug!(target: "featurehub.strategy.apply", key, pk, "strategy matched on percentage");
                    return Applied::matched(strategy.value.clone());
                }
            }
            if !strategy.has_attributes() {
                *base_percentage.entry(pk).or_insert(0) += strategy.percentage;
            }
        } else if strategy.percentage == 0
            && strategy.has_attributes()
            && match_attributes(ctx, strategy, registry)
        {
            tracing::debug!(target: "featurehub.strategy.apply", key, "strategy matched on attributes");
            return Applied::matched(strategy.value.clone());
        }
    }
    Applied::unmatched()
}
