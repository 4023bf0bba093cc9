//! Stored document model.
//!
//! Config collections hold flat documents: a set of named fields with scalar or shard-key
//! values. The same shape doubles as an equality filter for `find` and `remove`.

use std::collections::BTreeMap;
use std::fmt;

use sbal_common::ids::ChunkKey;

/// One field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// UTF-8 string.
    Str(String),
    /// Signed integer.
    Int(i64),
    /// Boolean flag.
    Bool(bool),
    /// Shard key value (chunk bound).
    Key(ChunkKey),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "\"{value}\""),
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Key(value) => write!(f, "{value}"),
        }
    }
}

/// Field-name keyed document, iterated in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Creates an empty document (as a filter it matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets one field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    /// Returns one field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns a string field; `None` when missing or of another type.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns a boolean field; `None` when missing or of another type.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.fields.get(name) {
            Some(FieldValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Returns a shard-key field; `None` when missing or of another type.
    #[must_use]
    pub fn get_key(&self, name: &str) -> Option<&ChunkKey> {
        match self.fields.get(name) {
            Some(FieldValue::Key(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns true when every field of `filter` is present here with an equal value.
    #[must_use]
    pub fn matches(&self, filter: &Self) -> bool {
        filter
            .fields
            .iter()
            .all(|(name, expected)| self.fields.get(name) == Some(expected))
    }

    /// Projects the document onto `fields`; missing fields project to `None`.
    #[must_use]
    pub fn project<'a>(&'a self, fields: &[String]) -> Vec<Option<&'a FieldValue>> {
        fields.iter().map(|name| self.fields.get(name)).collect()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for (index, (name, value)) in self.fields.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str(" }")
    }
}

#[cfg(test)]
mod tests {
    use super::{Document, FieldValue};
    use googletest::prelude::*;
    use rstest::rstest;
    use sbal_common::ids::ChunkKey;

    fn sample() -> Document {
        Document::new()
            .with("ns", FieldValue::Str("db.coll".to_owned()))
            .with("min", FieldValue::Key(ChunkKey::int(10)))
            .with("waitForDelete", FieldValue::Bool(false))
    }

    #[rstest]
    fn typed_getters_reject_mismatched_types() {
        let document = sample();

        assert_that!(document.get_str("ns"), eq(Some("db.coll")));
        assert_that!(document.get_bool("waitForDelete"), eq(Some(false)));
        assert_that!(document.get_key("min"), eq(Some(&ChunkKey::int(10))));
        assert_that!(document.get_str("min"), eq(None));
        assert_that!(document.get_key("missing"), eq(None));
    }

    #[rstest]
    fn filter_matches_on_field_subset() {
        let document = sample();
        let identity = Document::new()
            .with("ns", FieldValue::Str("db.coll".to_owned()))
            .with("min", FieldValue::Key(ChunkKey::int(10)));
        let other = Document::new().with("min", FieldValue::Key(ChunkKey::int(11)));

        assert_that!(document.matches(&identity), eq(true));
        assert_that!(document.matches(&Document::new()), eq(true));
        assert_that!(document.matches(&other), eq(false));
    }

    #[rstest]
    fn display_lists_fields_in_name_order() {
        assert_that!(
            sample().to_string().as_str(),
            eq("{ min: { 10 }, ns: \"db.coll\", waitForDelete: false }")
        );
        assert_that!(Document::new().to_string().as_str(), eq("{}"));
    }
}
