//! Config metadata store contract.

use sbal_common::config::{ReadSettings, WriteConcern};
use sbal_common::error::StoreResult;

use crate::document::Document;

/// Result of an insert that reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The document was written.
    Inserted,
    /// A document with the same unique identity already exists; nothing was written.
    DuplicateKey,
}

/// Replicated config metadata store consumed by the balancer.
///
/// Implementations are responsible for:
/// - enforcing unique indexes atomically on `insert`, reporting a collision as
///   `InsertOutcome::DuplicateKey` rather than an error;
/// - treating `remove` of a missing identity as success (returning `0`);
/// - honoring the supplied write concern and read settings, including their timeouts.
pub trait ConfigStore: Send + Sync {
    /// Inserts one document.
    fn insert(
        &self,
        collection: &str,
        document: Document,
        write_concern: &WriteConcern,
    ) -> StoreResult<InsertOutcome>;

    /// Removes every document matching `filter`; returns the removed count.
    fn remove(
        &self,
        collection: &str,
        filter: &Document,
        write_concern: &WriteConcern,
    ) -> StoreResult<u64>;

    /// Returns every document matching `filter`.
    fn find(
        &self,
        collection: &str,
        filter: &Document,
        read: ReadSettings,
    ) -> StoreResult<Vec<Document>>;
}
