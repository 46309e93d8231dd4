// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared attribute storage backing both context subtypes.

/// Builder-style attribute bag implementing the common `ClientContext`
/// surface: named, possibly multi-valued attributes, plus the
/// percentage-bucket key convention (`session` else `userkey`).
///
/// Attributes are stored in insertion order (re-setting an existing key
/// keeps its original position), matching a plain Python `dict`'s iteration
/// order — the context header must reproduce the order callers actually set
/// attributes in, not an alphabetical one.
#[derive(Clone, Default)]
pub struct BaseContext {
    attributes: Vec<(String, Vec<String>)>,
}

impl BaseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_key(&mut self, value: impl Into<String>) {
        self.attribute_values("userkey", vec![value.into()]);
    }

    pub fn session_key(&mut self, value: impl Into<String>) {
        self.attribute_values("session", vec![value.into()]);
    }

    pub fn country(&mut self, value: impl Into<String>) {
        self.attribute_values("country", vec![value.into()]);
    }

    pub fn device(&mut self, value: impl Into<String>) {
        self.attribute_values("device", vec![value.into()]);
    }

    pub fn platform(&mut self, value: impl Into<String>) {
        self.attribute_values("platform", vec![value.into()]);
    }

    pub fn version(&mut self, value: impl Into<String>) {
        self.attribute_values("version", vec![value.into()]);
    }

    pub fn attribute_values(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = values,
            None => self.attributes.push((key, values)),
        }
    }

    pub fn clear(&mut self) {
        self.attributes.clear();
    }

    pub fn get_attr(&self, key: &str, default: Option<&str>) -> Option<String> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, values)| values.first().cloned())
            .or_else(|| default.map(str::to_string))
    }

    pub fn get_attr_values(&self, key: &str) -> Option<Vec<String>> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.clone())
    }

    pub fn default_percentage_key(&self) -> Option<String> {
        self.get_attr("session", None)
            .or_else(|| self.get_attr("userkey", None))
    }

    /// Attributes in the order they were set, each rendered as its first
    /// value — the shape `ServerEvalContext` URL-encodes into the context
    /// header.
    pub fn sorted_first_values(&self) -> Vec<(String, String)> {
        self.attributes
            .iter()
            .filter_map(|(k, v)| v.first().map(|first| (k.clone(), first.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_percentage_key_prefers_session_over_userkey() {
        let mut ctx = BaseContext::new();
        ctx.user_key("user-1");
        ctx.session_key("session-1");
        assert_eq!(ctx.default_percentage_key(), Some("session-1".to_string()));
    }

    #[test]
    fn default_percentage_key_falls_back_to_userkey() {
        let mut ctx = BaseContext::new();
        ctx.user_key("user-1");
        assert_eq!(ctx.default_percentage_key(), Some("user-1".to_string()));
    }

    #[test]
    fn default_percentage_key_absent_when_neither_set() {
        let ctx = BaseContext::new();
        assert_eq!(ctx.default_percentage_key(), None);
    }

    #[test]
    fn get_attr_falls_back_to_default() {
        let ctx = BaseContext::new();
        assert_eq!(ctx.get_attr("country", Some("NZ")), Some("NZ".to_string()));
    }

    #[test]
    fn clear_removes_all_attributes() {
        let mut ctx = BaseContext::new();
        ctx.country("NZ");
        ctx.clear();
        assert_eq!(ctx.get_attr("country", None), None);
    }

    #[test]
    fn sorted_first_values_preserves_insertion_order() {
        let mut ctx = BaseContext::new();
        ctx.device("mobile");
        ctx.country("NZ");
        ctx.attribute_values("tag", vec!["a".into(), "b".into()]);
        assert_eq!(
            ctx.sorted_first_values(),
            vec![
                ("device".to_string(), "mobile".to_string()),
                ("country".to_string(), "NZ".to_string()),
                ("tag".to_string(), "a".to_string()),
            ]
        );
    }

    #[test]
    fn resetting_an_existing_key_keeps_its_original_position() {
        let mut ctx = BaseContext::new();
        ctx.user_key("fred");
        ctx.country("NZ");
        ctx.user_key("fred2");
        assert_eq!(
            ctx.sorted_first_values(),
            vec![
                ("userkey".to_string(), "fred2".to_string()),
                ("country".to_string(), "NZ".to_string()),
            ]
        );
    }
}
