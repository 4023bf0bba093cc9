//! Canonical identifier types used across the catalog and balancer crates.

use std::fmt;

use crate::error::{BalancerError, BalancerResult};

/// Name of one shard (data owner) in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShardId(String);

impl ShardId {
    /// Creates a validated shard id.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::InvalidRange` for an empty name.
    pub fn new(name: impl Into<String>) -> BalancerResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(BalancerError::InvalidRange(
                "shard id must not be empty".to_owned(),
            ));
        }
        Ok(Self(name))
    }

    /// Returns the shard name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully qualified collection name in `<db>.<collection>` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamespaceString(String);

impl NamespaceString {
    /// Parses a namespace, splitting on the first `.`.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::InvalidNamespace` when either the database or the collection part
    /// is empty.
    pub fn new(full: impl Into<String>) -> BalancerResult<Self> {
        let full = full.into();
        let Some(db_len) = full.find('.') else {
            return Err(BalancerError::InvalidNamespace(format!(
                "'{full}' is missing a collection name"
            )));
        };
        if db_len == 0 || db_len + 1 == full.len() {
            return Err(BalancerError::InvalidNamespace(format!(
                "'{full}' must name both a database and a collection"
            )));
        }
        Ok(Self(full))
    }

    /// Returns the full `<db>.<collection>` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One component of a shard key value.
///
/// Variant order is the comparison order: `MinKey` sorts below every value and `MaxKey` above.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    /// Global lower bound.
    MinKey,
    /// Integer component.
    Int(i64),
    /// String component.
    Str(String),
    /// Global upper bound.
    MaxKey,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinKey => f.write_str("MinKey"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "\"{value}\""),
            Self::MaxKey => f.write_str("MaxKey"),
        }
    }
}

/// Compound shard key value; chunk bounds are expressed with it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkKey(Vec<KeyValue>);

impl ChunkKey {
    /// Builds a key from its components.
    #[must_use]
    pub fn new(parts: Vec<KeyValue>) -> Self {
        Self(parts)
    }

    /// Single integer component key.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self(vec![KeyValue::Int(value)])
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for (index, part) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str(" }")
    }
}

/// Half-open chunk range `[min, max)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkRange {
    min: ChunkKey,
    max: ChunkKey,
}

impl ChunkRange {
    /// Creates a validated range.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::InvalidRange` unless `min < max`.
    pub fn new(min: ChunkKey, max: ChunkKey) -> BalancerResult<Self> {
        if min >= max {
            return Err(BalancerError::InvalidRange(format!(
                "min {min} must be less than max {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Inclusive lower bound; identifies the chunk within its collection.
    #[must_use]
    pub fn min(&self) -> &ChunkKey {
        &self.min
    }

    /// Exclusive upper bound.
    #[must_use]
    pub fn max(&self) -> &ChunkKey {
        &self.max
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChunkKey, ChunkRange, KeyValue, NamespaceString, ShardId};
    use googletest::prelude::*;
    use rstest::rstest;

    #[rstest]
    fn namespace_keeps_dots_inside_collection_name() {
        let nss = NamespaceString::new("db.coll.sub").expect("namespace is valid");
        assert_that!(nss.as_str(), eq("db.coll.sub"));
        assert_that!(nss.to_string().as_str(), eq("db.coll.sub"));
    }

    #[rstest]
    #[case("dbcoll")]
    #[case(".coll")]
    #[case("db.")]
    #[case("")]
    fn namespace_rejects_missing_parts(#[case] input: &str) {
        assert_that!(NamespaceString::new(input).is_err(), eq(true));
    }

    #[rstest]
    fn shard_id_rejects_empty_name() {
        assert_that!(ShardId::new("").is_err(), eq(true));
        let shard = ShardId::new("shard0001").expect("name is valid");
        assert_that!(shard.as_str(), eq("shard0001"));
    }

    #[rstest]
    fn key_values_order_min_below_everything_and_max_above() {
        let min = ChunkKey::new(vec![KeyValue::MinKey]);
        let max = ChunkKey::new(vec![KeyValue::MaxKey]);
        let int = ChunkKey::int(i64::MAX);
        let text = ChunkKey::new(vec![KeyValue::Str(String::new())]);

        assert_that!(min < int, eq(true));
        assert_that!(int < text, eq(true));
        assert_that!(text < max, eq(true));
    }

    #[rstest]
    #[case(20, 10)]
    #[case(10, 10)]
    fn chunk_range_requires_min_below_max(#[case] min: i64, #[case] max: i64) {
        assert_that!(
            ChunkRange::new(ChunkKey::int(min), ChunkKey::int(max)).is_err(),
            eq(true)
        );
    }

    #[rstest]
    fn chunk_range_displays_bounds() {
        let range = ChunkRange::new(ChunkKey::int(10), ChunkKey::int(20)).expect("range is valid");

        assert_that!(range.min(), eq(&ChunkKey::int(10)));
        assert_that!(range.max(), eq(&ChunkKey::int(20)));
        assert_that!(range.to_string().as_str(), eq("[{ 10 }, { 20 })"));
    }
}
