// SPDX-License-Identifier: MIT OR Apache-2.0
//! Result of applying a list of rollout strategies to a context.

/// Outcome of [`crate`]-level strategy application.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Whether a strategy matched.
    pub matched: bool,
    /// The matched strategy's value, if any.
    pub value: Option<serde_json::Value>,
}

impl Applied {
    /// No strategy matched.
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            value: None,
        }
    }

    /// A strategy matched with the given value.
    pub fn matched(value: Option<serde_json::Value>) -> Self {
        Self {
            matched: true,
            value,
        }
    }
}
