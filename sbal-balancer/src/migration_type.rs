//! Persisted form of an in-flight migration.

use sbal_catalog::document::{Document, FieldValue};
use sbal_common::error::{BalancerError, BalancerResult};
use sbal_common::ids::{ChunkKey, ChunkRange, NamespaceString, ShardId};

use crate::migrate_info::{ForceJumbo, MigrateInfo};

/// Config collection holding one record per in-flight migration.
pub const MIGRATIONS_NS: &str = "config.migrations";

/// Field names of a stored migration record.
pub mod fields {
    /// Collection namespace.
    pub const NS: &str = "ns";
    /// Chunk lower bound.
    pub const MIN: &str = "min";
    /// Chunk upper bound.
    pub const MAX: &str = "max";
    /// Source shard.
    pub const FROM_SHARD: &str = "fromShard";
    /// Destination shard.
    pub const TO_SHARD: &str = "toShard";
    /// Whether the donor waits for range deletion before the move completes.
    pub const WAIT_FOR_DELETE: &str = "waitForDelete";
    /// Jumbo handling.
    pub const FORCE_JUMBO: &str = "forceJumbo";
}

/// Unique identity of a migration record: one record per chunk.
pub const IDENTITY_FIELDS: [&str; 2] = [fields::NS, fields::MIN];

/// One `config.migrations` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    /// Chunk collection.
    pub nss: NamespaceString,
    /// Chunk bounds.
    pub range: ChunkRange,
    /// Source shard.
    pub from: ShardId,
    /// Destination shard.
    pub to: ShardId,
    /// Await range deletion on the donor.
    pub wait_for_delete: bool,
    /// Jumbo handling.
    pub force_jumbo: ForceJumbo,
}

impl MigrationRecord {
    /// Builds the record written when registering `migrate_info`.
    #[must_use]
    pub fn new(migrate_info: &MigrateInfo, wait_for_delete: bool) -> Self {
        Self {
            nss: migrate_info.nss.clone(),
            range: migrate_info.range.clone(),
            from: migrate_info.from.clone(),
            to: migrate_info.to.clone(),
            wait_for_delete,
            force_jumbo: migrate_info.force_jumbo,
        }
    }

    /// Equality filter selecting the record for chunk `(nss, min_key)`.
    #[must_use]
    pub fn identity_filter(nss: &NamespaceString, min_key: &ChunkKey) -> Document {
        Document::new()
            .with(fields::NS, FieldValue::Str(nss.as_str().to_owned()))
            .with(fields::MIN, FieldValue::Key(min_key.clone()))
    }

    /// Encodes the record for storage.
    #[must_use]
    pub fn to_document(&self) -> Document {
        Self::identity_filter(&self.nss, self.range.min())
            .with(fields::MAX, FieldValue::Key(self.range.max().clone()))
            .with(fields::FROM_SHARD, FieldValue::Str(self.from.as_str().to_owned()))
            .with(fields::TO_SHARD, FieldValue::Str(self.to.as_str().to_owned()))
            .with(fields::WAIT_FOR_DELETE, FieldValue::Bool(self.wait_for_delete))
            .with(
                fields::FORCE_JUMBO,
                FieldValue::Str(self.force_jumbo.as_str().to_owned()),
            )
    }

    /// Decodes a stored record.
    ///
    /// Unknown fields are ignored so store-internal bookkeeping does not break parsing. A
    /// missing `forceJumbo` field decodes as `ForceJumbo::DoNotForce`.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::InvalidRecord` when a required field is missing, has the wrong
    /// type, or holds an invalid value.
    pub fn from_document(document: &Document) -> BalancerResult<Self> {
        let ns = required(document.get_str(fields::NS), fields::NS)?;
        let min = required(document.get_key(fields::MIN), fields::MIN)?;
        let max = required(document.get_key(fields::MAX), fields::MAX)?;
        let from = required(document.get_str(fields::FROM_SHARD), fields::FROM_SHARD)?;
        let to = required(document.get_str(fields::TO_SHARD), fields::TO_SHARD)?;
        let wait_for_delete = required(
            document.get_bool(fields::WAIT_FOR_DELETE),
            fields::WAIT_FOR_DELETE,
        )?;
        let force_jumbo = match document.get(fields::FORCE_JUMBO) {
            None => ForceJumbo::DoNotForce,
            Some(FieldValue::Str(value)) => ForceJumbo::parse(value).ok_or_else(|| {
                BalancerError::InvalidRecord(format!(
                    "unknown value '{value}' for field '{}'",
                    fields::FORCE_JUMBO
                ))
            })?,
            Some(_) => return Err(wrong_type(fields::FORCE_JUMBO)),
        };

        Ok(Self {
            nss: NamespaceString::new(ns).map_err(invalid_value)?,
            range: ChunkRange::new(min.clone(), max.clone()).map_err(invalid_value)?,
            from: ShardId::new(from).map_err(invalid_value)?,
            to: ShardId::new(to).map_err(invalid_value)?,
            wait_for_delete,
            force_jumbo,
        })
    }

    /// Rebuilds the descriptor this record was written for.
    #[must_use]
    pub fn to_migrate_info(&self) -> MigrateInfo {
        MigrateInfo {
            nss: self.nss.clone(),
            range: self.range.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            force_jumbo: self.force_jumbo,
        }
    }
}

fn required<T>(value: Option<T>, field: &str) -> BalancerResult<T> {
    value.ok_or_else(|| wrong_type(field))
}

fn wrong_type(field: &str) -> BalancerError {
    BalancerError::InvalidRecord(format!("missing or mistyped field '{field}'"))
}

fn invalid_value(error: BalancerError) -> BalancerError {
    BalancerError::InvalidRecord(error.to_string())
}
