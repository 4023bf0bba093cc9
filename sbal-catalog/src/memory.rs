//! In-memory config store.
//!
//! A single-node stand-in for the replicated config servers: every acknowledged write is
//! trivially majority-durable, so write concerns and read settings are accepted and ignored.
//! Unique indexes are enforced under one lock, which gives the same "exactly one concurrent
//! insert wins" guarantee the real store provides.

use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use sbal_common::config::{ReadSettings, WriteConcern};
use sbal_common::error::{StoreError, StoreResult};

use crate::document::Document;
use crate::store::{ConfigStore, InsertOutcome};

/// Snapshot of store call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOpCounts {
    /// Inserts that wrote a document.
    pub inserted: u64,
    /// Inserts rejected by a unique index.
    pub duplicate_keys: u64,
    /// `remove` calls, including ones that matched nothing.
    pub removes: u64,
    /// Documents actually deleted by `remove`.
    pub removed_documents: u64,
    /// `find` calls.
    pub finds: u64,
}

#[derive(Debug, Default)]
struct CollectionState {
    unique_fields: Vec<String>,
    documents: Vec<Document>,
}

#[derive(Debug, Default)]
struct OpCounters {
    inserted: AtomicU64,
    duplicate_keys: AtomicU64,
    removes: AtomicU64,
    removed_documents: AtomicU64,
    finds: AtomicU64,
}

/// Thread-safe in-memory `ConfigStore`.
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    collections: Mutex<HashMap<String, CollectionState>>,
    counters: OpCounters,
}

impl InMemoryConfigStore {
    /// Creates an empty store with no unique indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a unique index over `fields` on `collection`.
    ///
    /// Two documents collide when their projections onto `fields` are equal; a missing field
    /// projects to "absent", which collides with another absent field.
    #[must_use]
    pub fn with_unique_index(self, collection: &str, fields: &[&str]) -> Self {
        if let Ok(mut collections) = self.collections.lock() {
            collections.entry(collection.to_owned()).or_default().unique_fields =
                fields.iter().map(|field| (*field).to_owned()).collect();
        }
        self
    }

    /// Number of documents currently stored in `collection`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Internal` if the store lock is poisoned.
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        let collections = self.lock_collections()?;
        Ok(collections
            .get(collection)
            .map_or(0, |state| state.documents.len()))
    }

    /// Returns the call counters accumulated so far.
    #[must_use]
    pub fn op_counts(&self) -> StoreOpCounts {
        StoreOpCounts {
            inserted: self.counters.inserted.load(Ordering::Relaxed),
            duplicate_keys: self.counters.duplicate_keys.load(Ordering::Relaxed),
            removes: self.counters.removes.load(Ordering::Relaxed),
            removed_documents: self.counters.removed_documents.load(Ordering::Relaxed),
            finds: self.counters.finds.load(Ordering::Relaxed),
        }
    }

    fn lock_collections(&self) -> StoreResult<MutexGuard<'_, HashMap<String, CollectionState>>> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Internal("config store mutex is poisoned".to_owned()))
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn insert(
        &self,
        collection: &str,
        document: Document,
        _write_concern: &WriteConcern,
    ) -> StoreResult<InsertOutcome> {
        let mut collections = self.lock_collections()?;
        let state = collections.entry(collection.to_owned()).or_default();

        if !state.unique_fields.is_empty() {
            let key = document.project(&state.unique_fields);
            if state
                .documents
                .iter()
                .any(|existing| existing.project(&state.unique_fields) == key)
            {
                self.counters.duplicate_keys.fetch_add(1, Ordering::Relaxed);
                return Ok(InsertOutcome::DuplicateKey);
            }
        }

        state.documents.push(document);
        self.counters.inserted.fetch_add(1, Ordering::Relaxed);
        Ok(InsertOutcome::Inserted)
    }

    fn remove(
        &self,
        collection: &str,
        filter: &Document,
        _write_concern: &WriteConcern,
    ) -> StoreResult<u64> {
        let mut collections = self.lock_collections()?;
        self.counters.removes.fetch_add(1, Ordering::Relaxed);
        let Some(state) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let before = state.documents.len();
        state.documents.retain(|document| !document.matches(filter));
        let removed = u64::try_from(before - state.documents.len()).unwrap_or(u64::MAX);
        self.counters
            .removed_documents
            .fetch_add(removed, Ordering::Relaxed);
        Ok(removed)
    }

    fn find(
        &self,
        collection: &str,
        filter: &Document,
        _read: ReadSettings,
    ) -> StoreResult<Vec<Document>> {
        let collections = self.lock_collections()?;
        self.counters.finds.fetch_add(1, Ordering::Relaxed);
        Ok(collections
            .get(collection)
            .map(|state| {
                state
                    .documents
                    .iter()
                    .filter(|document| document.matches(filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryConfigStore, StoreOpCounts};
    use crate::document::{Document, FieldValue};
    use crate::store::{ConfigStore, InsertOutcome};
    use googletest::prelude::*;
    use rstest::rstest;
    use sbal_common::config::{BalancerConfig, ReadSettings};
    use sbal_common::ids::ChunkKey;
    use std::sync::Barrier;

    const COLLECTION: &str = "config.migrations";

    fn store() -> InMemoryConfigStore {
        InMemoryConfigStore::new().with_unique_index(COLLECTION, &["ns", "min"])
    }

    fn identity(min: i64) -> Document {
        Document::new()
            .with("ns", FieldValue::Str("db.coll".to_owned()))
            .with("min", FieldValue::Key(ChunkKey::int(min)))
    }

    fn record(min: i64, to: &str) -> Document {
        identity(min).with("toShard", FieldValue::Str(to.to_owned()))
    }

    #[rstest]
    fn unique_index_rejects_second_insert_for_same_identity() {
        let store = store();
        let wc = BalancerConfig::default().migration_write_concern;

        let first = store
            .insert(COLLECTION, record(10, "s1"), &wc)
            .expect("insert should reach the store");
        let second = store
            .insert(COLLECTION, record(10, "s2"), &wc)
            .expect("insert should reach the store");
        let other_chunk = store
            .insert(COLLECTION, record(20, "s2"), &wc)
            .expect("insert should reach the store");

        assert_that!(first, eq(InsertOutcome::Inserted));
        assert_that!(second, eq(InsertOutcome::DuplicateKey));
        assert_that!(other_chunk, eq(InsertOutcome::Inserted));
        assert_that!(store.count(COLLECTION).expect("count"), eq(2_usize));
    }

    #[rstest]
    fn collections_without_index_accept_duplicates() {
        let store = InMemoryConfigStore::new();
        let wc = BalancerConfig::default().migration_write_concern;

        for _ in 0..2 {
            let outcome = store
                .insert("config.actionlog", record(10, "s1"), &wc)
                .expect("insert should reach the store");
            assert_that!(outcome, eq(InsertOutcome::Inserted));
        }
        assert_that!(store.count("config.actionlog").expect("count"), eq(2_usize));
    }

    #[rstest]
    fn remove_of_missing_identity_is_not_an_error() {
        let store = store();
        let wc = BalancerConfig::default().migration_write_concern;

        let removed = store
            .remove(COLLECTION, &identity(10), &wc)
            .expect("remove should succeed");
        assert_that!(removed, eq(0_u64));

        let _ = store
            .insert(COLLECTION, record(10, "s1"), &wc)
            .expect("insert should reach the store");
        let removed = store
            .remove(COLLECTION, &identity(10), &wc)
            .expect("remove should succeed");
        assert_that!(removed, eq(1_u64));
        assert_that!(store.count(COLLECTION).expect("count"), eq(0_usize));
    }

    #[rstest]
    fn find_returns_matching_documents_only() {
        let store = store();
        let wc = BalancerConfig::default().migration_write_concern;
        let _ = store.insert(COLLECTION, record(10, "s1"), &wc);
        let _ = store.insert(COLLECTION, record(20, "s2"), &wc);

        let found = store
            .find(COLLECTION, &identity(20), ReadSettings::primary_local())
            .expect("find should succeed");
        assert_that!(&found, eq(&vec![record(20, "s2")]));

        let missing = store
            .find("config.unknown", &identity(20), ReadSettings::primary_local())
            .expect("find should succeed");
        assert_that!(missing.is_empty(), eq(true));
    }

    #[rstest]
    fn op_counts_track_every_call() {
        let store = store();
        let wc = BalancerConfig::default().migration_write_concern;
        let _ = store.insert(COLLECTION, record(10, "s1"), &wc);
        let _ = store.insert(COLLECTION, record(10, "s1"), &wc);
        let _ = store.find(COLLECTION, &identity(10), ReadSettings::primary_local());
        let _ = store.remove(COLLECTION, &identity(10), &wc);
        let _ = store.remove(COLLECTION, &identity(10), &wc);

        assert_that!(
            store.op_counts(),
            eq(StoreOpCounts {
                inserted: 1,
                duplicate_keys: 1,
                removes: 2,
                removed_documents: 1,
                finds: 1,
            })
        );
    }

    #[rstest]
    #[case(2)]
    #[case(8)]
    fn concurrent_inserts_for_one_identity_have_exactly_one_winner(#[case] writers: usize) {
        let store = store();
        let barrier = Barrier::new(writers);
        let wc = BalancerConfig::default().migration_write_concern;

        let outcomes = std::thread::scope(|scope| {
            let handles = (0..writers)
                .map(|writer| {
                    let store = &store;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        store
                            .insert(COLLECTION, record(10, &format!("s{writer}")), &wc)
                            .expect("insert should reach the store")
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("writer thread should not panic"))
                .collect::<Vec<_>>()
        });

        let winners = outcomes
            .iter()
            .filter(|outcome| **outcome == InsertOutcome::Inserted)
            .count();
        assert_that!(winners, eq(1_usize));
        assert_that!(store.count(COLLECTION).expect("count"), eq(1_usize));
    }
}
