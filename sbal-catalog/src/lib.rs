//! Config metadata store interfaces.
//!
//! The balancer never talks to a concrete store directly: it consumes [`store::ConfigStore`]
//! through an injected handle. [`memory::InMemoryConfigStore`] is the reference implementation
//! used by tests and single-process embeddings.

pub mod document;
pub mod memory;
pub mod store;

pub use document::{Document, FieldValue};
pub use memory::{InMemoryConfigStore, StoreOpCounts};
pub use store::{ConfigStore, InsertOutcome};
