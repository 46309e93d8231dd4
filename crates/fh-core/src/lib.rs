// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stable value types shared by every `fh-*` crate: the rollout strategy
//! model, the feature wire record, and the [`Applied`] result of evaluating
//! strategies against a context.

#![deny(unsafe_code)]

mod applied;
mod error;
mod feature;
mod strategy;

pub use applied::Applied;
pub use error::StrategyError;
pub use feature::{FeatureState, FeatureValueType};
pub use strategy::{Conditional, FieldType, RolloutStrategy, RolloutStrategyAttribute};
