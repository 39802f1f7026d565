//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::GomflowConfig;
use crate::services::auth::{AuthError, HostedAuthClient};
use crate::services::storage::{StorageClient, StorageError};

/// Error building the backend clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("auth client: {0}")]
    Auth(#[from] AuthError),
    #[error("storage client: {0}")]
    Storage(#[from] StorageError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GomflowConfig,
    pool: PgPool,
    auth: HostedAuthClient,
    storage: StorageClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend key is not a valid header value or an
    /// HTTP client fails to build.
    pub fn new(config: GomflowConfig, pool: PgPool) -> Result<Self, StateError> {
        let auth = HostedAuthClient::new(&config.backend)?;
        let storage = StorageClient::new(&config.backend)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                auth,
                storage,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &GomflowConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the hosted auth client.
    #[must_use]
    pub fn auth(&self) -> &HostedAuthClient {
        &self.inner.auth
    }

    /// Get a reference to the object storage client.
    #[must_use]
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }
}
