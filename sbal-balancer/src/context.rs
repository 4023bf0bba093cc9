//! Execution context threaded through balancer store calls.

use std::fmt;
use std::sync::Arc;

use sbal_catalog::store::ConfigStore;
use sbal_common::config::BalancerConfig;
use sbal_common::error::BalancerResult;

/// Store handle plus tunables for one balancer operation.
///
/// The context is created by whoever owns the store connection and passed explicitly into every
/// registration; nothing here is looked up from process-global state.
pub struct OperationContext {
    store: Arc<dyn ConfigStore>,
    config: BalancerConfig,
}

impl OperationContext {
    /// Creates a context after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::InvalidConfig` when `config` fails validation.
    pub fn new(store: Arc<dyn ConfigStore>, config: BalancerConfig) -> BalancerResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Creates a context with the default configuration.
    #[must_use]
    pub fn with_default_config(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            config: BalancerConfig::default(),
        }
    }

    /// Config metadata store.
    #[must_use]
    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }

    /// Active tunables.
    #[must_use]
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
