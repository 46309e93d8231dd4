// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised while parsing or applying the strategy model.

use fh_error::{ErrorCode, FeatureHubError};

/// Errors raised by [`crate::strategy`] and [`crate::feature`] construction.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// A `conditional` string did not match any known [`crate::strategy::Conditional`].
    #[error("unknown conditional: {0}")]
    UnknownConditional(String),
    /// A `type` string did not match any known [`crate::strategy::FieldType`].
    #[error("unknown field type: {0}")]
    UnknownFieldType(String),
    /// A `type` string on a feature record did not match any known
    /// [`crate::feature::FeatureValueType`].
    #[error("unknown feature value type: {0}")]
    UnknownFeatureValueType(String),
}

impl From<StrategyError> for FeatureHubError {
    fn from(err: StrategyError) -> Self {
        FeatureHubError::new(ErrorCode::StrategyUnknownField, err.to_string())
    }
}
