//! Shared error model for cross-crate APIs.

use thiserror::Error;

/// Unified result type used by balancer-facing public interfaces.
pub type BalancerResult<T> = Result<T, BalancerError>;

/// Result type returned by config metadata store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-defined failures.
///
/// Duplicate-key rejections are not errors: stores report them as a named insert outcome so
/// callers can reconcile the race instead of matching on an error string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The contacted node is not (or is no longer) the primary.
    #[error("not primary: {0}")]
    NotPrimary(String),

    /// The write was applied locally but not acknowledged at the requested level in time.
    #[error("write concern timeout: {0}")]
    WriteConcernTimeout(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other store-internal failure.
    #[error("store internal error: {0}")]
    Internal(String),
}

/// Error categories surfaced by migration registration and disposal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalancerError {
    /// Configuration is invalid for the requested operation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Namespace string does not have the `<db>.<collection>` shape.
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    /// Chunk range or owner descriptor is malformed.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// A stored document could not be decoded.
    #[error("invalid migration record: {0}")]
    InvalidRecord(String),

    /// A different migration is already active for the requested chunk.
    #[error(
        "there is already an active migration for that chunk; \
         requested migration '{requested}', active migration '{active}'"
    )]
    ConflictingMigration {
        /// Descriptor of the migration the caller asked for.
        requested: String,
        /// Descriptor of the migration found in the store.
        active: String,
    },

    /// Duplicate-key races persisted past the retry bound.
    #[error(
        "Failed to insert the config.migrations document after max number of retries. \
         Chunk '{range}' in collection '{namespace}' was being moved (somewhere) by another \
         operation."
    )]
    RetriesExhausted {
        /// Chunk range being registered.
        range: String,
        /// Collection namespace.
        namespace: String,
    },

    /// Config metadata store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Another error annotated with the operation that produced it.
    #[error("{context} :: caused by :: {source}")]
    Context {
        /// What was being attempted.
        context: String,
        /// Underlying failure.
        source: Box<BalancerError>,
    },
}

impl BalancerError {
    /// Wraps this error with a description of the operation that failed.
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping context wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::{BalancerError, StoreError};
    use googletest::prelude::*;
    use rstest::rstest;

    #[rstest]
    fn context_wrapper_renders_cause_chain() {
        let error = BalancerError::from(StoreError::NotPrimary("node-2".to_owned()))
            .with_context("Failed to verify whether conflicting migration is in progress");

        assert_that!(
            error.to_string().as_str(),
            eq("Failed to verify whether conflicting migration is in progress \
                :: caused by :: not primary: node-2")
        );
    }

    #[rstest]
    fn root_cause_skips_nested_context() {
        let inner = BalancerError::InvalidRecord("missing field 'ns'".to_owned());
        let error = inner.clone().with_context("outer").with_context("outermost");

        assert_that!(error.root_cause(), eq(&inner));
    }

    #[rstest]
    fn retries_exhausted_names_chunk_and_collection() {
        let error = BalancerError::RetriesExhausted {
            range: "[{ 10 }, { 20 })".to_owned(),
            namespace: "db.coll".to_owned(),
        };
        let message = error.to_string();

        assert_that!(message.as_str(), contains_substring("[{ 10 }, { 20 })"));
        assert_that!(message.as_str(), contains_substring("'db.coll'"));
        assert_that!(message.as_str(), contains_substring("by another operation"));
    }
}
