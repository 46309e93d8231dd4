// SPDX-License-Identifier: MIT OR Apache-2.0
//! Synchronous configuration validation errors.

use fh_error::{ErrorCode, FeatureHubError};

/// Raised synchronously at [`crate::Config::new`] construction time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("edge URL must not be empty")]
    EmptyUrl,
    #[error("at least one API key is required")]
    EmptyKeys,
    #[error("API keys must not be empty strings")]
    BlankKey,
    #[error("API keys must be consistently client-eval (`*`) or server-eval")]
    MixedKeyTypes,
}

impl From<ConfigError> for FeatureHubError {
    fn from(err: ConfigError) -> Self {
        let code = match err {
            ConfigError::EmptyUrl => ErrorCode::ConfigInvalidUrl,
            ConfigError::EmptyKeys | ConfigError::BlankKey | ConfigError::MixedKeyTypes => {
                ErrorCode::ConfigInvalidApiKey
            }
        };
        FeatureHubError::new(code, err.to_string())
    }
}
