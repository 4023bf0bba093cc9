//! Scope-bound ownership of a `config.migrations` record.
//!
//! Registering a migration writes a record keyed by `(namespace, min key)` so that every
//! balancer instance, including one started after a failover, can see which chunks are moving.
//! [`ScopedMigrationRequest`] owns the obligation to delete that record again: when it goes out
//! of scope while still armed it issues a best-effort delete. Failures of that delete are logged
//! and swallowed because the guard usually drops on an error path already; records left behind
//! are reconciled by the balancer recovery pass, which re-attaches to them through
//! [`ScopedMigrationRequest::attach_for_recovery`].

use std::fmt;

use sbal_catalog::store::InsertOutcome;
use sbal_common::error::{BalancerError, BalancerResult};
use sbal_common::ids::{ChunkKey, NamespaceString};
use tracing::{debug, info, warn};

use crate::context::OperationContext;
use crate::migrate_info::MigrateInfo;
use crate::migration_type::{MIGRATIONS_NS, MigrationRecord};

/// Guard owning the cleanup of one migration record.
///
/// The guard is armed while it holds the operation context. Ownership moves with the value;
/// [`ScopedMigrationRequest::take`] moves it out of a place that must stay initialized, leaving
/// a disarmed guard behind. Overwriting an armed guard drops it, which runs its cleanup.
#[must_use = "dropping the request immediately removes its migration record"]
pub struct ScopedMigrationRequest<'a> {
    op_ctx: Option<&'a OperationContext>,
    nss: NamespaceString,
    min_key: ChunkKey,
}

impl<'a> ScopedMigrationRequest<'a> {
    fn armed(op_ctx: &'a OperationContext, nss: NamespaceString, min_key: ChunkKey) -> Self {
        Self {
            op_ctx: Some(op_ctx),
            nss,
            min_key,
        }
    }

    /// Writes the migration record for `migrate_info`, or joins an identical in-flight one.
    ///
    /// The insert uses the configured majority write concern so a successor balancer can see
    /// the record after failover. On a duplicate-key collision the active record is read back
    /// from the primary: if it moves the chunk between the same shards the caller joins it and
    /// still receives an armed guard; if the record vanished meanwhile the insert is retried up
    /// to `duplicate_key_max_retries` extra times.
    ///
    /// # Errors
    ///
    /// - `BalancerError::ConflictingMigration` when another migration with different owners is
    ///   active for the chunk.
    /// - `BalancerError::RetriesExhausted` when the record kept vanishing between insert and
    ///   query.
    /// - `BalancerError::Context` wrapping a non-duplicate insert failure. A best-effort removal
    ///   by `(namespace, min key)` is issued first because the write may have been applied
    ///   before the failure was reported. The removal does not check owners: if the write was
    ///   never applied and another coordinator's record took the identity in the meantime, that
    ///   record is removed as well.
    /// - `BalancerError::Context` wrapping a failed or unparseable conflict query.
    pub fn register(
        op_ctx: &'a OperationContext,
        migrate_info: &MigrateInfo,
        wait_for_delete: bool,
    ) -> BalancerResult<Self> {
        let config = op_ctx.config();
        let record = MigrationRecord::new(migrate_info, wait_for_delete);
        let attempts = config.duplicate_key_max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let inserted = op_ctx.store().insert(
                MIGRATIONS_NS,
                record.to_document(),
                &config.migration_write_concern,
            );
            match inserted {
                Ok(InsertOutcome::Inserted) => {
                    return Ok(Self::armed(
                        op_ctx,
                        migrate_info.nss.clone(),
                        migrate_info.min_key().clone(),
                    ));
                }
                Ok(InsertOutcome::DuplicateKey) => {}
                Err(error) => {
                    drop(Self::armed(
                        op_ctx,
                        migrate_info.nss.clone(),
                        migrate_info.min_key().clone(),
                    ));
                    return Err(BalancerError::from(error).with_context(format!(
                        "Failed to write config.migrations document for migration \
                         '{migrate_info}'."
                    )));
                }
            }

            let Some(active) = find_active_migration(op_ctx, migrate_info)? else {
                debug!(
                    migration = %migrate_info,
                    attempt,
                    "Conflicting config.migrations document disappeared, retrying insert"
                );
                continue;
            };

            let active_info = active.to_migrate_info();
            if !active_info.same_owners(migrate_info) {
                info!(
                    new_migration = %migrate_info,
                    active_migration = %active_info,
                    "Failed to write document to config.migrations because there is already an \
                     active migration for that chunk"
                );
                return Err(BalancerError::ConflictingMigration {
                    requested: migrate_info.to_string(),
                    active: active_info.to_string(),
                });
            }

            debug!(migration = %migrate_info, "Joining identical active migration");
            return Ok(Self::armed(
                op_ctx,
                migrate_info.nss.clone(),
                migrate_info.min_key().clone(),
            ));
        }

        Err(BalancerError::RetriesExhausted {
            range: migrate_info.range.to_string(),
            namespace: migrate_info.nss.to_string(),
        })
    }

    /// Takes over a record written by an earlier process; the record is not looked up.
    pub fn attach_for_recovery(
        op_ctx: &'a OperationContext,
        nss: NamespaceString,
        min_key: ChunkKey,
    ) -> Self {
        Self::armed(op_ctx, nss, min_key)
    }

    /// Deletes the record now.
    ///
    /// On success the guard is disarmed. On failure it stays armed, so the delete is attempted
    /// once more when the guard drops.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::Context` wrapping the store failure when the delete fails.
    ///
    /// # Panics
    ///
    /// Panics if the guard is already disarmed.
    pub fn try_remove(&mut self) -> BalancerResult<()> {
        let op_ctx = self.armed_context();
        remove_record(op_ctx, &self.nss, &self.min_key).map_err(|error| {
            error.with_context(format!(
                "Failed to remove config.migrations document for migration on '{}' starting at \
                 {}.",
                self.nss, self.min_key
            ))
        })?;
        self.op_ctx = None;
        Ok(())
    }

    /// Disarms the guard without touching the store, leaving the record for recovery.
    ///
    /// # Panics
    ///
    /// Panics if the guard is already disarmed.
    pub fn keep_on_destruct(&mut self) {
        assert!(
            self.is_armed(),
            "migration request for {} {} is already disarmed",
            self.nss,
            self.min_key
        );
        self.op_ctx = None;
        debug!(
            namespace = %self.nss,
            min_key = %self.min_key,
            "Keeping config.migrations document for balancer recovery"
        );
    }

    /// Moves the cleanup obligation into the returned guard and disarms `self`.
    pub fn take(&mut self) -> Self {
        Self {
            op_ctx: self.op_ctx.take(),
            nss: self.nss.clone(),
            min_key: self.min_key.clone(),
        }
    }

    /// Returns true while the guard still owns the record's cleanup.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.op_ctx.is_some()
    }

    /// Collection of the tracked chunk.
    #[must_use]
    pub fn namespace(&self) -> &NamespaceString {
        &self.nss
    }

    /// Lower bound of the tracked chunk.
    #[must_use]
    pub fn min_key(&self) -> &ChunkKey {
        &self.min_key
    }

    fn armed_context(&self) -> &'a OperationContext {
        let Some(op_ctx) = self.op_ctx else {
            panic!(
                "migration request for {} {} is already disarmed",
                self.nss, self.min_key
            );
        };
        op_ctx
    }
}

impl Drop for ScopedMigrationRequest<'_> {
    fn drop(&mut self) {
        let Some(op_ctx) = self.op_ctx.take() else {
            return;
        };
        if let Err(error) = remove_record(op_ctx, &self.nss, &self.min_key) {
            warn!(
                namespace = %self.nss,
                min_key = %self.min_key,
                %error,
                "Failed to remove config.migrations document for migration"
            );
        }
    }
}

impl fmt::Debug for ScopedMigrationRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedMigrationRequest")
            .field("nss", &self.nss)
            .field("min_key", &self.min_key)
            .field("armed", &self.is_armed())
            .finish()
    }
}

fn remove_record(
    op_ctx: &OperationContext,
    nss: &NamespaceString,
    min_key: &ChunkKey,
) -> BalancerResult<()> {
    let filter = MigrationRecord::identity_filter(nss, min_key);
    let _ = op_ctx.store().remove(
        MIGRATIONS_NS,
        &filter,
        &op_ctx.config().migration_write_concern,
    )?;
    Ok(())
}

/// Reads the record currently holding `migrate_info`'s identity, if any.
fn find_active_migration(
    op_ctx: &OperationContext,
    migrate_info: &MigrateInfo,
) -> BalancerResult<Option<MigrationRecord>> {
    let filter = MigrationRecord::identity_filter(&migrate_info.nss, migrate_info.min_key());
    let documents = op_ctx
        .store()
        .find(MIGRATIONS_NS, &filter, op_ctx.config().conflict_read)
        .map_err(|error| {
            BalancerError::from(error).with_context(format!(
                "Failed to verify whether conflicting migration is in progress for migration \
                 '{migrate_info}' while trying to query config.migrations."
            ))
        })?;
    assert!(
        documents.len() <= 1,
        "unique index on {MIGRATIONS_NS} violated: {} documents match {filter}",
        documents.len()
    );

    let Some(document) = documents.into_iter().next() else {
        return Ok(None);
    };
    MigrationRecord::from_document(&document)
        .map(Some)
        .map_err(|error| {
            error.with_context(format!(
                "Failed to verify whether conflicting migration is in progress for migration \
                 '{migrate_info}' while trying to parse active migration document '{document}'."
            ))
        })
}
