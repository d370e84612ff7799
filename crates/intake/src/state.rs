//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::IntakeConfig;
use crate::supabase::{ServiceStore, StoreError, UserStore};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds only configuration; store handles are
/// constructed per invocation so each request gets clients scoped to its own
/// credentials.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: IntakeConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: IntakeConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config }),
        }
    }

    /// Get a reference to the intake configuration.
    #[must_use]
    pub fn config(&self) -> &IntakeConfig {
        &self.inner.config
    }

    /// Build a store handle that acts as the caller holding `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be used to construct a client.
    pub fn user_store(&self, access_token: &str) -> Result<UserStore, StoreError> {
        UserStore::new(&self.inner.config.supabase, access_token)
    }

    /// Build a store handle with the trusted service-role credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the privileged client cannot be constructed.
    pub fn service_store(&self) -> Result<ServiceStore, StoreError> {
        ServiceStore::new(&self.inner.config.supabase)
    }
}
