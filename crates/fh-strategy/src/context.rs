// SPDX-License-Identifier: MIT OR Apache-2.0
//! The minimal context surface the apply engine needs. Implemented by
//! `fh-context`'s `ClientEvalContext`/`ServerEvalContext`.

/// Read-only view over a request's attributes, as needed by strategy
/// evaluation.
pub trait EvalContext {
    /// Returns the attribute's value(s), or `None` if unset. Multi-valued
    /// attributes are returned in declaration order.
    fn get_attr(&self, name: &str) -> Option<Vec<String>>;

    /// The default percentage-bucket key: `session` if set, else `userkey`,
    /// else `None`.
    fn default_percentage_key(&self) -> Option<String>;
}
