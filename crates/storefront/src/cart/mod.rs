//! Cart state container.
//!
//! [`CartStore`] owns the session's [`Cart`] and routes every mutation
//! through a [`CartRepository`]: the local one for guests, the remote one
//! once the API client holds a token. Whatever the repository returns becomes
//! the new cart; on failure the previous cart is kept and the error message is
//! recorded in [`CartState::error`].
//!
//! Mutations are serialized: each one holds an async mutex until its state
//! change is committed, so overlapping calls queue up and apply in order.
//! [`CartStore::state`] never waits on that mutex.
//!
//! After every committed change the line list is mirrored to local storage
//! under `zodiaco-cart` (or the entry removed when the cart is empty).

pub mod repository;

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::{instrument, warn};
use zodiaco_core::{Cart, CartAction, CartError, Product, ProductId, VariantId};

use crate::api::ApiClient;
use crate::storage::SharedStorage;

pub use repository::{CartRepository, LocalCartRepository, RemoteCartRepository};

/// Snapshot of the cart as views see it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    pub cart: Cart,
    /// A mutation or sync is in flight.
    pub loading: bool,
    /// Message of the last failed operation, cleared by the next success.
    pub error: Option<String>,
}

/// Shared handle to the session cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    api: ApiClient,
    local: LocalCartRepository,
    remote: RemoteCartRepository,
    state: RwLock<CartState>,
    mutation: Mutex<()>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create an empty store. Call [`Self::sync`] to load the session cart.
    #[must_use]
    pub fn new(api: ApiClient, storage: SharedStorage) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                remote: RemoteCartRepository::new(api.clone()),
                local: LocalCartRepository::new(storage),
                api,
                state: RwLock::new(CartState::default()),
                mutation: Mutex::new(()),
            }),
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current cart snapshot.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.state().cart
    }

    fn update_state(&self, f: impl FnOnce(&mut CartState)) {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    async fn repository(&self) -> &dyn CartRepository {
        if self.inner.api.is_authenticated().await {
            &self.inner.remote
        } else {
            &self.inner.local
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Load the session cart: the server cart when authenticated, otherwise
    /// the guest cart from local storage.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence` if the server cart cannot be fetched.
    /// The previous cart is kept in that case.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<(), CartError> {
        let _guard = self.inner.mutation.lock().await;
        self.begin();

        let result = self.repository().await.load().await;
        self.commit(result).await
    }

    /// Add `quantity` units of a product variant.
    ///
    /// # Errors
    ///
    /// Returns `CartError::VariantNotFound` if the product has no such
    /// variant, `CartError::InvalidQuantity` for zero units,
    /// `CartError::AmountOverflow` if the total would not fit, or
    /// `CartError::Persistence` if the server rejects the line.
    #[instrument(skip(self, product), fields(product_id = %product.id, variant_id = %variant_id))]
    pub async fn add_item(
        &self,
        product: Product,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CartError> {
        self.dispatch(CartAction::Add {
            product,
            variant_id,
            quantity,
        })
        .await
    }

    /// Remove the line for a product variant. Removing a missing line is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence` if the server call fails.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        product_id: ProductId,
        variant_id: VariantId,
    ) -> Result<(), CartError> {
        self.dispatch(CartAction::Remove {
            product_id,
            variant_id,
        })
        .await
    }

    /// Set the quantity of a line. Negative values count as zero, and zero
    /// removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence` if the server call fails.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: i64,
    ) -> Result<(), CartError> {
        self.dispatch(CartAction::UpdateQuantity {
            product_id,
            variant_id,
            quantity,
        })
        .await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence` if the server call fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), CartError> {
        self.dispatch(CartAction::Clear).await
    }

    async fn dispatch(&self, action: CartAction) -> Result<(), CartError> {
        let _guard = self.inner.mutation.lock().await;
        self.begin();

        let current = self.cart();
        let kind = action.name();
        let result = self.repository().await.apply(&current, action).await;
        if let Err(e) = &result {
            warn!(action = kind, error = %e, "Cart mutation failed");
        }
        self.commit(result).await
    }

    fn begin(&self) {
        self.update_state(|state| state.loading = true);
    }

    /// Adopt a successful result or record the failure. Runs under the
    /// mutation lock.
    async fn commit(&self, result: Result<Cart, CartError>) -> Result<(), CartError> {
        match result {
            Ok(cart) => {
                if let Err(e) = self.inner.local.persist(cart.clone()).await {
                    warn!(error = %e, "Failed to persist cart to local storage");
                }
                self.update_state(|state| {
                    state.cart = cart;
                    state.loading = false;
                    state.error = None;
                });
                Ok(())
            }
            Err(e) => {
                self.update_state(|state| {
                    state.loading = false;
                    state.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use zodiaco_core::Price;

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::storage::{LocalStorage, MemoryStorage, keys};

    fn product(id: &str, variants: &[(&str, i64)]) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("Producto {id}"),
            "variants": variants
                .iter()
                .map(|(vid, price)| serde_json::json!({
                    "id": vid, "product_id": id, "price": price, "stock": 10,
                }))
                .collect::<Vec<_>>(),
        }))
        .unwrap()
    }

    fn guest_store() -> (CartStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        // Nothing listens here; guest operations never reach the network.
        let config = StorefrontConfig::for_api("http://127.0.0.1:9/api/v1").unwrap();
        let api = ApiClient::new(&config, storage.clone()).unwrap();
        (CartStore::new(api, storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_guest_add_accumulates() {
        let (store, _) = guest_store();
        let shirt = product("p1", &[("v1", 40_000)]);

        store
            .add_item(shirt.clone(), VariantId::new("v1"), 1)
            .await
            .unwrap();
        store.add_item(shirt, VariantId::new("v1"), 2).await.unwrap();

        let state = store.state();
        assert_eq!(state.cart.items().len(), 1);
        assert_eq!(state.cart.items()[0].quantity, 3);
        assert_eq!(state.cart.total_items(), 3);
        assert_eq!(state.cart.total_amount(), Price::from_units(120_000));
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_variant_records_error() {
        let (store, _) = guest_store();
        let shirt = product("p1", &[("v1", 40_000)]);
        store
            .add_item(shirt.clone(), VariantId::new("v1"), 1)
            .await
            .unwrap();

        let err = store
            .add_item(shirt, VariantId::new("v9"), 1)
            .await
            .unwrap_err();

        let state = store.state();
        assert_eq!(err, CartError::VariantNotFound(VariantId::new("v9")));
        assert_eq!(state.error.as_deref(), Some("Variant not found"));
        assert_eq!(state.cart.total_items(), 1);
    }

    #[tokio::test]
    async fn test_total_overflow_records_error() {
        let (store, storage) = guest_store();
        let shirt = product("p1", &[("v1", 40_000)]);
        let vault: Product = serde_json::from_value(serde_json::json!({
            "id": "p9",
            "name": "Colección completa",
            "variants": [
                {"id": "v1", "product_id": "p9", "price": "50000000000000000000000000000", "stock": 5}
            ]
        }))
        .unwrap();
        store.add_item(shirt, VariantId::new("v1"), 1).await.unwrap();
        let before = store.cart();
        let stored = storage.get(keys::CART).unwrap();

        let err = store
            .add_item(vault, VariantId::new("v1"), 2)
            .await
            .unwrap_err();

        let state = store.state();
        assert_eq!(err, CartError::AmountOverflow);
        assert_eq!(state.cart, before);
        assert_eq!(state.error.as_deref(), Some("Cart total is too large"));
        assert!(!state.loading);
        assert_eq!(storage.get(keys::CART).unwrap(), stored);
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let (store, _) = guest_store();
        let shirt = product("p1", &[("v1", 40_000)]);

        let _ = store.add_item(shirt.clone(), VariantId::new("v9"), 1).await;
        assert!(store.state().error.is_some());

        store.add_item(shirt, VariantId::new("v1"), 1).await.unwrap();
        assert!(store.state().error.is_none());
    }

    #[tokio::test]
    async fn test_update_to_zero_matches_remove() {
        let (updated, _) = guest_store();
        let (removed, _) = guest_store();
        let shirt = product("p1", &[("v1", 40_000), ("v2", 42_000)]);

        for store in [&updated, &removed] {
            store
                .add_item(shirt.clone(), VariantId::new("v1"), 2)
                .await
                .unwrap();
            store
                .add_item(shirt.clone(), VariantId::new("v2"), 1)
                .await
                .unwrap();
        }

        updated
            .update_quantity(ProductId::new("p1"), VariantId::new("v1"), 0)
            .await
            .unwrap();
        removed
            .remove_item(ProductId::new("p1"), VariantId::new("v1"))
            .await
            .unwrap();

        assert_eq!(updated.cart(), removed.cart());
        assert_eq!(updated.cart().total_amount(), Price::from_units(42_000));
    }

    #[tokio::test]
    async fn test_remove_missing_line_is_noop() {
        let (store, _) = guest_store();
        let shirt = product("p1", &[("v1", 40_000)]);
        store.add_item(shirt, VariantId::new("v1"), 1).await.unwrap();
        let before = store.cart();

        store
            .remove_item(ProductId::new("p2"), VariantId::new("v1"))
            .await
            .unwrap();

        assert_eq!(store.cart(), before);
        assert!(store.state().error.is_none());
    }

    #[tokio::test]
    async fn test_local_persistence_round_trip() {
        let (store, storage) = guest_store();
        let shirt = product("p1", &[("v1", 40_000)]);
        let mug = product("p2", &[("v7", 25_000)]);

        store.add_item(shirt, VariantId::new("v1"), 2).await.unwrap();
        store.add_item(mug, VariantId::new("v7"), 1).await.unwrap();
        assert!(storage.contains(keys::CART));

        // A new session over the same storage sees the same lines.
        let config = StorefrontConfig::for_api("http://127.0.0.1:9/api/v1").unwrap();
        let api = ApiClient::new(&config, storage.clone()).unwrap();
        let restored = CartStore::new(api, storage.clone());
        restored.sync().await.unwrap();
        assert_eq!(restored.cart(), store.cart());

        restored.clear().await.unwrap();
        assert!(!storage.contains(keys::CART));
    }

    #[tokio::test]
    async fn test_sync_ignores_corrupt_storage() {
        let (store, storage) = guest_store();
        storage.set(keys::CART, "[{\"broken\": true}]").unwrap();

        store.sync().await.unwrap();
        assert!(store.cart().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_mutations_are_serialized() {
        let (store, _) = guest_store();
        let shirt = product("p1", &[("v1", 10_000)]);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                let shirt = shirt.clone();
                tokio::spawn(async move { store.add_item(shirt, VariantId::new("v1"), 1).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.cart().total_items(), 10);
        assert_eq!(store.cart().total_amount(), Price::from_units(100_000));
    }
}
