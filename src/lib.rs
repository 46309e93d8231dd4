// SPDX-License-Identifier: MIT OR Apache-2.0
//! Client SDK for evaluating FeatureHub-style feature flags.
//!
//! A minimal client-eval usage:
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use featurehub_client::{Config, Context};
//!
//! let config = Config::new("https://edge.example.com", vec!["*default".into()])?;
//! config.init().await?;
//!
//! let Some(Context::Client(ctx)) = config.new_context() else {
//!     unreachable!("client-eval key always vends a client context");
//! };
//! ctx.user_key("user-123").build().await?;
//!
//! if ctx.feature("NEW_CHECKOUT").is_enabled() {
//!     // serve the new checkout flow
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub use fh_context::{ClientEvalContext, Config, ConfigError, Context, ServerEvalContext};
pub use fh_core::{
    Applied, Conditional, FeatureState, FeatureValueType, FieldType, RolloutStrategy,
    RolloutStrategyAttribute, StrategyError,
};
pub use fh_edge::{EdgeError, EdgeService, PollingEdge, StreamingEdge};
pub use fh_error::{ErrorCategory, ErrorCode, FeatureHubError};
pub use fh_intercept::{EnvironmentInterceptor, InterceptorValue, StaticInterceptor, ValueInterceptor};
pub use fh_repository::{FeatureHubRepository, FeatureRepository, FeatureStateHolder};
pub use fh_strategy::EvalContext;
