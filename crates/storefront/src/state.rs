//! Session state shared across views.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::AuthSession;
use crate::cart::CartStore;
use crate::checkout::Checkout;
use crate::config::StorefrontConfig;
use crate::error::StorefrontError;
use crate::storage::{FileStorage, SharedStorage};

/// Everything a storefront session needs, built once and passed around.
///
/// This struct is cheaply cloneable via `Arc`. The API client, the cart store
/// and the auth session all share the same storage and token.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    storage: SharedStorage,
    api: ApiClient,
    cart: CartStore,
    auth: AuthSession,
    checkout: Checkout,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("data_dir", &self.inner.config.data_dir)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Create a session backed by files under `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StorefrontError> {
        let storage: SharedStorage = Arc::new(FileStorage::new(config.data_dir.clone()));
        Self::with_storage(config, storage)
    }

    /// Create a session over an explicit storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_storage(
        config: StorefrontConfig,
        storage: SharedStorage,
    ) -> Result<Self, StorefrontError> {
        let api = ApiClient::new(&config, storage.clone())?;
        let cart = CartStore::new(api.clone(), storage.clone());
        let auth = AuthSession::new(api.clone(), cart.clone());
        let checkout = Checkout::new(api.clone(), cart.clone());

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                storage,
                api,
                cart,
                auth,
                checkout,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the local storage backend.
    #[must_use]
    pub fn storage(&self) -> &SharedStorage {
        &self.inner.storage
    }

    /// Get a reference to the API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the customer session.
    #[must_use]
    pub fn auth(&self) -> &AuthSession {
        &self.inner.auth
    }

    /// Get a reference to checkout.
    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }

    /// Load the session: restore the user when a token is stored, then load
    /// the matching cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be loaded. A failed user lookup
    /// only logs the session out.
    pub async fn start(&self) -> Result<(), StorefrontError> {
        self.inner.auth.refresh_user().await;
        self.inner.cart.sync().await?;
        Ok(())
    }
}
