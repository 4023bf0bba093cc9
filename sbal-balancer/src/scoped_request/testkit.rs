use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use sbal_catalog::document::Document;
use sbal_catalog::store::{ConfigStore, InsertOutcome};
use sbal_common::config::{ReadSettings, WriteConcern};
use sbal_common::error::StoreResult;
use sbal_common::ids::{ChunkKey, ChunkRange, NamespaceString, ShardId};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::migrate_info::MigrateInfo;

/// One call observed by [`ScriptedStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum StoreCall {
    Insert {
        collection: String,
        document: Document,
        write_concern: WriteConcern,
    },
    Remove {
        collection: String,
        filter: Document,
        write_concern: WriteConcern,
    },
    Find {
        collection: String,
        filter: Document,
        read: ReadSettings,
    },
}

#[derive(Debug, Default)]
struct Script {
    inserts: VecDeque<StoreResult<InsertOutcome>>,
    removes: VecDeque<StoreResult<u64>>,
    finds: VecDeque<StoreResult<Vec<Document>>>,
    calls: Vec<StoreCall>,
}

/// Store replaying queued results and journaling every call.
///
/// With an empty queue, inserts succeed, removes delete one document and finds return nothing.
#[derive(Debug, Default)]
pub(super) struct ScriptedStore {
    script: Mutex<Script>,
}

impl ScriptedStore {
    pub(super) fn push_insert(&self, result: StoreResult<InsertOutcome>) {
        self.lock().inserts.push_back(result);
    }

    pub(super) fn push_remove(&self, result: StoreResult<u64>) {
        self.lock().removes.push_back(result);
    }

    pub(super) fn push_find(&self, result: StoreResult<Vec<Document>>) {
        self.lock().finds.push_back(result);
    }

    pub(super) fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub(super) fn remove_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, StoreCall::Remove { .. }))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("script lock should not be poisoned")
    }
}

impl ConfigStore for ScriptedStore {
    fn insert(
        &self,
        collection: &str,
        document: Document,
        write_concern: &WriteConcern,
    ) -> StoreResult<InsertOutcome> {
        let mut script = self.lock();
        script.calls.push(StoreCall::Insert {
            collection: collection.to_owned(),
            document,
            write_concern: *write_concern,
        });
        script.inserts.pop_front().unwrap_or(Ok(InsertOutcome::Inserted))
    }

    fn remove(
        &self,
        collection: &str,
        filter: &Document,
        write_concern: &WriteConcern,
    ) -> StoreResult<u64> {
        let mut script = self.lock();
        script.calls.push(StoreCall::Remove {
            collection: collection.to_owned(),
            filter: filter.clone(),
            write_concern: *write_concern,
        });
        script.removes.pop_front().unwrap_or(Ok(1))
    }

    fn find(
        &self,
        collection: &str,
        filter: &Document,
        read: ReadSettings,
    ) -> StoreResult<Vec<Document>> {
        let mut script = self.lock();
        script.calls.push(StoreCall::Find {
            collection: collection.to_owned(),
            filter: filter.clone(),
            read,
        });
        script.finds.pop_front().unwrap_or(Ok(Vec::new()))
    }
}

pub(super) fn migrate_info(from: &str, to: &str) -> MigrateInfo {
    MigrateInfo::new(
        NamespaceString::new("db.coll").expect("namespace is valid"),
        ChunkRange::new(ChunkKey::int(10), ChunkKey::int(20)).expect("range is valid"),
        ShardId::new(from).expect("shard is valid"),
        ShardId::new(to).expect("shard is valid"),
    )
    .expect("descriptor is valid")
}

/// One tracing event recorded by [`capture_events`].
#[derive(Debug, Clone)]
pub(super) struct CapturedEvent {
    pub(super) level: Level,
    pub(super) message: String,
    pub(super) fields: Vec<(String, String)>,
}

impl CapturedEvent {
    pub(super) fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{value:?}"));
    }
}

impl EventVisitor {
    fn record(&mut self, field: &Field, rendered: String) {
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.push((field.name().to_owned(), rendered));
        }
    }
}

#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        if let Ok(mut events) = self.events.lock() {
            events.push(CapturedEvent {
                level: *event.metadata().level(),
                message: visitor.message,
                fields: visitor.fields,
            });
        }
    }
}

/// Runs `body` with a thread-local subscriber and returns the events it emitted.
pub(super) fn capture_events<T>(body: impl FnOnce() -> T) -> (T, Vec<CapturedEvent>) {
    let layer = CaptureLayer::default();
    let events = Arc::clone(&layer.events);
    let subscriber = tracing_subscriber::registry().with(layer);
    let output = tracing::subscriber::with_default(subscriber, body);
    let captured = events.lock().expect("capture lock should not be poisoned").clone();
    (output, captured)
}
