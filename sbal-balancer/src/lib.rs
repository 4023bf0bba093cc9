//! Balancer-side bookkeeping for chunk migrations.
//!
//! Before a chunk moves, the balancer registers a durable `config.migrations` record so that
//! concurrent or restarted coordinators agree on what is in flight. [`ScopedMigrationRequest`]
//! creates or joins that record and guarantees it is removed when the request goes out of
//! scope, unless ownership is explicitly handed to recovery.

pub mod context;
pub mod migrate_info;
pub mod migration_type;
pub mod scoped_request;

pub use context::OperationContext;
pub use migrate_info::{ForceJumbo, MigrateInfo};
pub use migration_type::{IDENTITY_FIELDS, MIGRATIONS_NS, MigrationRecord};
pub use scoped_request::ScopedMigrationRequest;
