// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rollout-strategy matchers, percentage bucketing and the apply engine: the
//! deterministic core that decides which rollout branch of a feature applies
//! to a given request context.

#![deny(unsafe_code)]

mod apply;
mod context;
mod matchers;
mod percentage;

pub use apply::{apply, match_attribute, match_attributes};
pub use context::EvalContext;
pub use matchers::{
    BooleanMatcher, FallthroughMatcher, IpAddressMatcher, MatcherRegistry, NumberMatcher,
    SemanticVersionMatcher, StrategyMatcher, StringMatcher,
};
pub use percentage::{Murmur3PercentageCalculator, PercentageCalculator};
