// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy for the FeatureHub client SDK.
//!
//! Every error raised by a `fh-*` crate carries a stable [`ErrorCode`] (a
//! machine-readable tag), a human-readable message and, optionally, a cause.
//! Crate-local error enums (`StrategyError`, `EdgeError`, `ConfigError`, ...)
//! convert into [`FeatureHubError`] via `#[from]` so callers that don't care
//! about a specific crate's error shape can work with one type.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Feature/strategy model parsing and evaluation errors.
    Strategy,
    /// Feature repository and holder errors.
    Repository,
    /// Edge transport (polling / streaming) errors.
    Edge,
    /// Client configuration and assembly errors.
    Config,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Strategy => "strategy",
            Self::Repository => "repository",
            Self::Edge => "edge",
            Self::Config => "config",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string guaranteed not
/// to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Strategy --
    /// A `conditional` or `type` string in a rollout strategy is unrecognised.
    StrategyUnknownField,
    /// A feature value could not be coerced to the requested type.
    StrategyValueCoercionFailed,

    // -- Repository --
    /// The requested feature key has never been seen by the repository.
    RepositoryUnknownFeature,
    /// An update was rejected because its version was not newer.
    RepositoryStaleVersion,

    // -- Edge --
    /// The edge service received an unexpected HTTP status code.
    EdgeUnexpectedStatus,
    /// The edge transport could not reach the server.
    EdgeTransportFailed,
    /// The server-sent-event stream was malformed.
    EdgeMalformedStream,

    // -- Config --
    /// The supplied edge URL is invalid.
    ConfigInvalidUrl,
    /// The supplied API key(s) are invalid or inconsistent.
    ConfigInvalidApiKey,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::StrategyUnknownField | Self::StrategyValueCoercionFailed => {
                ErrorCategory::Strategy
            }
            Self::RepositoryUnknownFeature | Self::RepositoryStaleVersion => {
                ErrorCategory::Repository
            }
            Self::EdgeUnexpectedStatus | Self::EdgeTransportFailed | Self::EdgeMalformedStream => {
                ErrorCategory::Edge
            }
            Self::ConfigInvalidUrl | Self::ConfigInvalidApiKey => ErrorCategory::Config,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation (e.g. `"EDGE_TRANSPORT_FAILED"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrategyUnknownField => "STRATEGY_UNKNOWN_FIELD",
            Self::StrategyValueCoercionFailed => "STRATEGY_VALUE_COERCION_FAILED",
            Self::RepositoryUnknownFeature => "REPOSITORY_UNKNOWN_FEATURE",
            Self::RepositoryStaleVersion => "REPOSITORY_STALE_VERSION",
            Self::EdgeUnexpectedStatus => "EDGE_UNEXPECTED_STATUS",
            Self::EdgeTransportFailed => "EDGE_TRANSPORT_FAILED",
            Self::EdgeMalformedStream => "EDGE_MALFORMED_STREAM",
            Self::ConfigInvalidUrl => "CONFIG_INVALID_URL",
            Self::ConfigInvalidApiKey => "CONFIG_INVALID_API_KEY",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for the FeatureHub client SDK.
#[derive(Debug, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct FeatureHubError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FeatureHubError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = FeatureHubError::new(ErrorCode::Internal, "boom");
        assert_eq!(err.to_string(), "[INTERNAL] boom");
    }

    #[test]
    fn category_lookup() {
        assert_eq!(
            ErrorCode::EdgeTransportFailed.category(),
            ErrorCategory::Edge
        );
        assert_eq!(ErrorCode::ConfigInvalidUrl.category(), ErrorCategory::Config);
    }

    #[test]
    fn serde_rename() {
        let json = serde_json::to_string(&ErrorCode::RepositoryStaleVersion).unwrap();
        assert_eq!(json, r#""REPOSITORY_STALE_VERSION""#);
    }

    #[test]
    fn with_source_chain() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "inner");
        let err = FeatureHubError::new(ErrorCode::EdgeTransportFailed, "request failed")
            .with_source(inner);
        let src = std::error::Error::source(&err).unwrap();
        assert_eq!(src.to_string(), "inner");
    }

    #[test]
    fn category_display() {
        assert_eq!(ErrorCategory::Edge.to_string(), "edge");
    }
}
