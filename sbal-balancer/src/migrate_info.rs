//! Migration descriptor produced by the balancer policy.

use std::fmt;

use sbal_common::error::{BalancerError, BalancerResult};
use sbal_common::ids::{ChunkKey, ChunkRange, NamespaceString, ShardId};

/// Whether a chunk too large to split may still be moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForceJumbo {
    /// Jumbo chunks are refused.
    #[default]
    DoNotForce,
    /// An operator explicitly asked to move a jumbo chunk.
    ForceManual,
    /// The balancer decided to move a jumbo chunk.
    ForceBalancer,
}

impl ForceJumbo {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DoNotForce => "doNotForceJumbo",
            Self::ForceManual => "forceJumboManual",
            Self::ForceBalancer => "forceJumboBalancer",
        }
    }

    /// Parses the stored representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "doNotForceJumbo" => Some(Self::DoNotForce),
            "forceJumboManual" => Some(Self::ForceManual),
            "forceJumboBalancer" => Some(Self::ForceBalancer),
            _ => None,
        }
    }
}

/// One requested chunk move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateInfo {
    /// Collection owning the chunk.
    pub nss: NamespaceString,
    /// Chunk bounds.
    pub range: ChunkRange,
    /// Current owner.
    pub from: ShardId,
    /// Destination owner.
    pub to: ShardId,
    /// Jumbo handling.
    pub force_jumbo: ForceJumbo,
}

impl MigrateInfo {
    /// Builds a descriptor for moving `range` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::InvalidRange` when source and destination are the same shard.
    pub fn new(
        nss: NamespaceString,
        range: ChunkRange,
        from: ShardId,
        to: ShardId,
    ) -> BalancerResult<Self> {
        if from == to {
            return Err(BalancerError::InvalidRange(format!(
                "chunk {range} of {nss} cannot be moved from shard {from} to itself"
            )));
        }
        Ok(Self {
            nss,
            range,
            from,
            to,
            force_jumbo: ForceJumbo::DoNotForce,
        })
    }

    /// Sets jumbo handling.
    #[must_use]
    pub fn with_force_jumbo(mut self, force_jumbo: ForceJumbo) -> Self {
        self.force_jumbo = force_jumbo;
        self
    }

    /// Lower bound identifying the chunk.
    #[must_use]
    pub fn min_key(&self) -> &ChunkKey {
        self.range.min()
    }

    /// Returns true when both descriptors move between the same pair of shards.
    #[must_use]
    pub fn same_owners(&self, other: &Self) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl fmt::Display for MigrateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, from {}, to {}",
            self.nss, self.range, self.from, self.to
        )
    }
}
