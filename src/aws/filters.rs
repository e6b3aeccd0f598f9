//! Typed builder for EC2 describe filters.
//!
//! Filter names are written with underscores (`resource_type`, `tag_Name`)
//! and translated to the canonical EC2 form (`resource-type`, `tag:Name`)
//! when the filter list is built.

use aws_sdk_ec2::types::Filter;

use crate::{Ec2ToolsError, Result};

/// A single filter value: a scalar string, a list of strings, or a boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Str(String),
    List(Vec<String>),
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Str(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Str(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(value: Vec<String>) -> Self {
        FilterValue::List(value)
    }
}

impl From<&[&str]> for FilterValue {
    fn from(value: &[&str]) -> Self {
        FilterValue::List(value.iter().map(|s| s.to_string()).collect())
    }
}

/// An explicit ordered list of (name, value) filter pairs.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    entries: Vec<(String, FilterValue)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter. Keys use underscores in place of hyphens; `tag_<key>`
    /// selects on the value of tag `<key>`. Supplying the same key twice is
    /// a caller error; the last write wins.
    #[must_use]
    pub fn push(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the canonical EC2 filter list.
    pub fn build(&self) -> Result<Vec<Filter>> {
        let mut translated: Vec<(String, Vec<String>)> = Vec::new();

        for (key, value) in &self.entries {
            let name = translate_key(key);
            let values = normalize_value(&name, value)?;

            match translated.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => entry.1 = values,
                None => translated.push((name, values)),
            }
        }

        Ok(translated
            .into_iter()
            .map(|(name, values)| {
                Filter::builder()
                    .name(name)
                    .set_values(Some(values))
                    .build()
            })
            .collect())
    }
}

/// Translate an underscore-separated key to canonical EC2 filter form.
///
/// `tag_<key>` (but not the literal `tag_key` filter) becomes `tag:<key>`,
/// with every remaining underscore also turned into a colon; all other keys
/// have every underscore replaced with a hyphen.
fn translate_key(key: &str) -> String {
    if key.starts_with("tag_") && key != "tag_key" {
        key.replace('_', ":")
    } else {
        key.replace('_', "-")
    }
}

/// Normalize a value into the list-of-strings form the API expects.
///
/// Booleans render as the literal lowercase strings; for boolean-valued
/// predicates (keys starting with `is-`, e.g. describe-images' `is-public`)
/// the string spellings "True"/"False" are lower-cased as well. Scalars wrap
/// into single-element lists; an empty list is rejected.
fn normalize_value(translated_key: &str, value: &FilterValue) -> Result<Vec<String>> {
    match value {
        FilterValue::Bool(b) => Ok(vec![b.to_string()]),
        FilterValue::Str(s) => {
            let rendered = if translated_key.starts_with("is-") && (s == "True" || s == "False") {
                s.to_lowercase()
            } else {
                s.clone()
            };
            Ok(vec![rendered])
        }
        FilterValue::List(values) => {
            if values.is_empty() {
                return Err(Ec2ToolsError::Config(format!(
                    "Filter '{}' has no values; supply a string or a non-empty list",
                    translated_key
                )));
            }
            Ok(values.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built(filters: Filters) -> Vec<(String, Vec<String>)> {
        filters
            .build()
            .unwrap()
            .into_iter()
            .map(|f| {
                (
                    f.name().unwrap_or_default().to_string(),
                    f.values().to_vec(),
                )
            })
            .collect()
    }

    #[test]
    fn test_plain_key_is_hyphen_joined() {
        let result = built(Filters::new().push("resource_type", "instance"));
        assert_eq!(
            result,
            vec![("resource-type".to_string(), vec!["instance".to_string()])]
        );
    }

    #[test]
    fn test_tag_key_is_colon_joined() {
        let result = built(Filters::new().push("tag_Name", "web"));
        assert_eq!(result, vec![("tag:Name".to_string(), vec!["web".to_string()])]);
    }

    #[test]
    fn test_literal_tag_key_filter_stays_hyphenated() {
        let result = built(Filters::new().push("tag_key", "Name"));
        assert_eq!(result, vec![("tag-key".to_string(), vec!["Name".to_string()])]);
    }

    #[test]
    fn test_scalar_wraps_into_single_element_list() {
        let result = built(Filters::new().push("instance_type", "t2.micro"));
        assert_eq!(result[0].1, vec!["t2.micro".to_string()]);
    }

    #[test]
    fn test_list_passes_through() {
        let values = vec!["i-1".to_string(), "i-2".to_string()];
        let result = built(Filters::new().push("instance_id", values.clone()));
        assert_eq!(result, vec![("instance-id".to_string(), values)]);
    }

    #[test]
    fn test_bool_renders_as_lowercase_literal() {
        let result = built(Filters::new().push("is_public", true));
        assert_eq!(result, vec![("is-public".to_string(), vec!["true".to_string()])]);

        let result = built(Filters::new().push("is_public", false));
        assert_eq!(result[0].1, vec!["false".to_string()]);
    }

    #[test]
    fn test_bool_string_spelling_lowercased_for_is_keys() {
        let result = built(Filters::new().push("is_public", "True"));
        assert_eq!(result[0].1, vec!["true".to_string()]);

        // Non-predicate keys keep the spelling as given.
        let result = built(Filters::new().push("tag_Flag", "True"));
        assert_eq!(result[0].1, vec!["True".to_string()]);
    }

    #[test]
    fn test_empty_value_list_is_rejected() {
        let err = Filters::new()
            .push("size", Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, Ec2ToolsError::Config(_)));
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let result = built(Filters::new().push("size", "8").push("size", "16"));
        assert_eq!(result, vec![("size".to_string(), vec!["16".to_string()])]);
    }
}
