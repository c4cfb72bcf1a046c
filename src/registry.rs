//! Registry of configured grant flows
//!
//! Built once from configuration and read thereafter — no runtime
//! mutation, so lookups need no locking. Keys are the grant-type wire
//! literals (extension grants are keyed by their URN).

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::OAuth2Config;
use crate::error::OAuth2Error;
use crate::flow::{GrantFlow, GrantType};

/// Immutable mapping from grant-type name to configured flow
#[derive(Debug)]
pub struct FlowRegistry {
    flows: HashMap<String, GrantFlow>,
}

impl FlowRegistry {
    /// Build the registry from the enabled grant types
    ///
    /// # Arguments
    /// * `config` - Provider configuration shared by every flow
    /// * `enabled` - Grant types to expose; later duplicates win
    #[must_use]
    pub fn from_config(
        config: Arc<OAuth2Config>,
        enabled: impl IntoIterator<Item = GrantType>,
    ) -> Self {
        let flows = enabled
            .into_iter()
            .map(|grant_type| {
                let key = grant_type.as_str().to_string();
                (key, GrantFlow::new(grant_type, Arc::clone(&config)))
            })
            .collect();
        Self { flows }
    }

    /// Look up a flow by its grant-type name
    ///
    /// # Errors
    /// Returns [`OAuth2Error::UnknownFlow`] when the grant type was not
    /// configured.
    pub fn get(&self, name: &str) -> Result<&GrantFlow, OAuth2Error> {
        self.flows.get(name).ok_or_else(|| OAuth2Error::UnknownFlow(name.to_string()))
    }

    /// True when the grant type is configured
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.flows.contains_key(name)
    }

    /// Iterate over the configured grant types
    pub fn grant_types(&self) -> impl Iterator<Item = &GrantType> + '_ {
        self.flows.values().map(GrantFlow::grant_type)
    }

    /// Number of configured flows
    #[must_use]
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// True when no flows are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
