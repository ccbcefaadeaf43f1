//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::media::MediaStore;
use crate::services::auth::TokenKeys;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the store, media storage and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn Store>,
    media: Arc<dyn MediaStore>,
    tokens: TokenKeys,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Storage backend
    /// * `media` - Upload storage
    #[must_use]
    pub fn new(config: ServerConfig, store: Arc<dyn Store>, media: Arc<dyn MediaStore>) -> Self {
        let tokens = TokenKeys::new(&config.auth);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                media,
                tokens,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the upload storage.
    #[must_use]
    pub fn media(&self) -> &dyn MediaStore {
        self.inner.media.as_ref()
    }

    /// Get a reference to the session token keys.
    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }
}
