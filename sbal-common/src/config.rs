//! Runtime configuration shared by the balancer crates.

use std::time::Duration;

use crate::error::{BalancerError, BalancerResult};

/// Write-concern timeout used for migration record writes.
pub const MIGRATION_WRITE_CONCERN_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra insert attempts allowed when the conflicting record disappears mid-registration.
pub const DUPLICATE_KEY_MAX_RETRIES: u32 = 2;

/// Acknowledgement level a write must reach before the store reports success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAcknowledgement {
    /// A majority of voting members; survives primary failover.
    Majority,
    /// A fixed number of members.
    Nodes(u32),
}

/// Durability requirement attached to store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteConcern {
    /// Required acknowledgement level.
    pub acknowledgement: WriteAcknowledgement,
    /// How long the store may wait for the acknowledgement.
    pub timeout: Duration,
}

impl WriteConcern {
    /// Majority write concern with the given timeout.
    #[must_use]
    pub const fn majority(timeout: Duration) -> Self {
        Self {
            acknowledgement: WriteAcknowledgement::Majority,
            timeout,
        }
    }

    /// Returns true when writes under this concern survive leadership failover.
    #[must_use]
    pub const fn is_majority(&self) -> bool {
        matches!(self.acknowledgement, WriteAcknowledgement::Majority)
    }
}

/// Which replica set member serves a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPreference {
    /// Only the current primary.
    PrimaryOnly,
}

/// Consistency level of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadConcernLevel {
    /// Latest data on the serving node, without waiting for replication.
    Local,
}

/// Read routing and consistency settings for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSettings {
    /// Member selection.
    pub preference: ReadPreference,
    /// Consistency level.
    pub concern: ReadConcernLevel,
}

impl ReadSettings {
    /// Reads the primary's latest committed state without waiting for majority durability.
    #[must_use]
    pub const fn primary_local() -> Self {
        Self {
            preference: ReadPreference::PrimaryOnly,
            concern: ReadConcernLevel::Local,
        }
    }
}

/// Tunables for migration request registration and disposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancerConfig {
    /// Write concern for inserting and removing migration records.
    pub migration_write_concern: WriteConcern,
    /// Read settings for the conflict-resolution query after a duplicate-key insert.
    pub conflict_read: ReadSettings,
    /// Extra insert attempts beyond the first when the conflicting record vanished.
    pub duplicate_key_max_retries: u32,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            migration_write_concern: WriteConcern::majority(MIGRATION_WRITE_CONCERN_TIMEOUT),
            conflict_read: ReadSettings::primary_local(),
            duplicate_key_max_retries: DUPLICATE_KEY_MAX_RETRIES,
        }
    }
}

impl BalancerConfig {
    /// Checks that the configuration keeps migration records visible across failover.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::InvalidConfig` when the migration write concern is not majority
    /// or its timeout is zero.
    pub fn validate(&self) -> BalancerResult<()> {
        if !self.migration_write_concern.is_majority() {
            return Err(BalancerError::InvalidConfig(
                "migration write concern must be majority",
            ));
        }
        if self.migration_write_concern.timeout.is_zero() {
            return Err(BalancerError::InvalidConfig(
                "migration write concern timeout must be non-zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BalancerConfig, DUPLICATE_KEY_MAX_RETRIES, ReadConcernLevel, ReadPreference,
        WriteAcknowledgement, WriteConcern,
    };
    use crate::error::BalancerError;
    use googletest::prelude::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    fn default_config_uses_majority_and_primary_local_reads() {
        let config = BalancerConfig::default();

        assert_that!(config.migration_write_concern.is_majority(), eq(true));
        assert_that!(
            config.migration_write_concern.timeout,
            eq(Duration::from_secs(30))
        );
        assert_that!(config.conflict_read.preference, eq(ReadPreference::PrimaryOnly));
        assert_that!(config.conflict_read.concern, eq(ReadConcernLevel::Local));
        assert_that!(config.duplicate_key_max_retries, eq(DUPLICATE_KEY_MAX_RETRIES));
        assert_that!(config.validate().is_ok(), eq(true));
    }

    #[rstest]
    fn validate_rejects_non_majority_write_concern() {
        let config = BalancerConfig {
            migration_write_concern: WriteConcern {
                acknowledgement: WriteAcknowledgement::Nodes(1),
                timeout: Duration::from_secs(30),
            },
            ..BalancerConfig::default()
        };

        let error = config
            .validate()
            .expect_err("single-node acknowledgement must be rejected");
        assert_that!(
            &error,
            eq(&BalancerError::InvalidConfig(
                "migration write concern must be majority"
            ))
        );
    }

    #[rstest]
    fn validate_rejects_zero_timeout() {
        let config = BalancerConfig {
            migration_write_concern: WriteConcern::majority(Duration::ZERO),
            ..BalancerConfig::default()
        };

        assert_that!(config.validate().is_err(), eq(true));
    }
}
