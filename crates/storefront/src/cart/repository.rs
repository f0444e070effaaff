//! Cart persistence strategies.
//!
//! The cart store picks one of two repositories per operation, depending on
//! whether the API client holds a token:
//!
//! - [`LocalCartRepository`] applies mutations in memory through the reducer
//!   and reads the guest cart from local storage.
//! - [`RemoteCartRepository`] forwards mutations to the server and adopts the
//!   server's canonical line list as the new cart.

use async_trait::async_trait;
use tracing::{debug, warn};
use zodiaco_core::cart::clamp_quantity;
use zodiaco_core::{Cart, CartAction, CartError, CartItem};

use crate::api::{ApiClient, ApiError};
use crate::storage::{SharedStorage, keys};

/// Where cart state lives and how mutations reach it.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Load the cart this repository is authoritative for.
    async fn load(&self) -> Result<Cart, CartError>;

    /// Apply `action` to `current` and return the resulting cart.
    ///
    /// On error `current` must still be a valid description of the cart.
    async fn apply(&self, current: &Cart, action: CartAction) -> Result<Cart, CartError>;
}

impl From<ApiError> for CartError {
    fn from(err: ApiError) -> Self {
        Self::Persistence(err.to_string())
    }
}

// =============================================================================
// LocalCartRepository
// =============================================================================

/// Guest cart kept in local storage.
#[derive(Clone)]
pub struct LocalCartRepository {
    storage: SharedStorage,
}

impl LocalCartRepository {
    #[must_use]
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// Write the cart lines to storage, or remove the entry when empty.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence` if the lines cannot be encoded or
    /// storage rejects the write.
    pub fn save(&self, cart: &Cart) -> Result<(), CartError> {
        if cart.is_empty() {
            self.storage
                .remove(keys::CART)
                .map_err(|e| CartError::Persistence(e.to_string()))
        } else {
            let encoded = serde_json::to_string(cart.items())
                .map_err(|e| CartError::Persistence(e.to_string()))?;
            self.storage
                .set(keys::CART, &encoded)
                .map_err(|e| CartError::Persistence(e.to_string()))
        }
    }

    /// [`Self::save`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`Self::save`], or `CartError::Persistence` if the write task
    /// panicked.
    pub async fn persist(&self, cart: Cart) -> Result<(), CartError> {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || repo.save(&cart))
            .await
            .map_err(|e| CartError::Persistence(e.to_string()))?
    }

    fn read(&self) -> Result<Cart, CartError> {
        let stored = self
            .storage
            .get(keys::CART)
            .map_err(|e| CartError::Persistence(e.to_string()))?;

        let Some(raw) = stored else {
            return Ok(Cart::default());
        };

        match serde_json::from_str::<Vec<CartItem>>(&raw) {
            Ok(items) => {
                debug!(lines = items.len(), "Loaded guest cart from local storage");
                Cart::from_items(items)
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable guest cart in local storage");
                Ok(Cart::default())
            }
        }
    }
}

#[async_trait]
impl CartRepository for LocalCartRepository {
    async fn load(&self) -> Result<Cart, CartError> {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || repo.read())
            .await
            .map_err(|e| CartError::Persistence(e.to_string()))?
    }

    async fn apply(&self, current: &Cart, action: CartAction) -> Result<Cart, CartError> {
        let mut next = current.clone();
        next.apply(action)?;
        Ok(next)
    }
}

// =============================================================================
// RemoteCartRepository
// =============================================================================

/// Server cart of the authenticated user.
#[derive(Clone)]
pub struct RemoteCartRepository {
    api: ApiClient,
}

impl RemoteCartRepository {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CartRepository for RemoteCartRepository {
    async fn load(&self) -> Result<Cart, CartError> {
        let remote = self.api.cart().await?;
        Cart::from_items(remote.into_items())
    }

    async fn apply(&self, current: &Cart, action: CartAction) -> Result<Cart, CartError> {
        let remote = match action {
            CartAction::Load(items) => return Cart::from_items(items),
            CartAction::Add {
                product,
                variant_id,
                quantity,
            } => {
                // Reject locally what the reducer would reject, before any
                // request is made.
                if product.variant(&variant_id).is_none() {
                    return Err(CartError::VariantNotFound(variant_id));
                }
                if quantity == 0 {
                    return Err(CartError::InvalidQuantity);
                }
                self.api
                    .add_to_cart(&product.id, &variant_id, quantity)
                    .await?
            }
            CartAction::Remove {
                product_id,
                variant_id,
            } => {
                let Some(line) = current.find(&product_id, &variant_id) else {
                    return Ok(current.clone());
                };
                self.api.remove_from_cart(&line.id).await?
            }
            CartAction::UpdateQuantity {
                product_id,
                variant_id,
                quantity,
            } => {
                let Some(line) = current.find(&product_id, &variant_id) else {
                    return Ok(current.clone());
                };
                match clamp_quantity(quantity) {
                    0 => self.api.remove_from_cart(&line.id).await?,
                    quantity => self.api.update_cart_item(&line.id, quantity).await?,
                }
            }
            CartAction::Clear => {
                self.api.clear_cart().await?;
                return Ok(Cart::default());
            }
        };

        Cart::from_items(remote.into_items())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use zodiaco_core::{Price, Product, VariantId};

    use super::*;
    use crate::storage::{FileStorage, LocalStorage, MemoryStorage};

    fn product() -> Product {
        serde_json::from_value(serde_json::json!({
            "id": "p1",
            "name": "Camiseta Leo",
            "variants": [
                {"id": "v1", "product_id": "p1", "name": "M", "price": 50000, "stock": 5}
            ]
        }))
        .unwrap()
    }

    fn add(quantity: u32) -> CartAction {
        CartAction::Add {
            product: product(),
            variant_id: VariantId::new("v1"),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_local_apply_does_not_touch_current() {
        let repo = LocalCartRepository::new(Arc::new(MemoryStorage::new()));
        let current = Cart::default();

        let next = repo.apply(&current, add(2)).await.unwrap();

        assert!(current.is_empty());
        assert_eq!(next.total_items(), 2);
        assert_eq!(next.total_amount(), Price::from_units(100_000));
    }

    #[tokio::test]
    async fn test_local_save_and_load() {
        let storage = Arc::new(MemoryStorage::new());
        let repo = LocalCartRepository::new(storage.clone());

        let cart = repo.apply(&Cart::default(), add(3)).await.unwrap();
        repo.save(&cart).unwrap();
        assert!(storage.contains(keys::CART));

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded, cart);

        repo.save(&Cart::default()).unwrap();
        assert!(!storage.contains(keys::CART));
    }

    #[tokio::test]
    async fn test_local_persist_on_file_storage() {
        let dir = std::env::temp_dir().join(format!("zodiaco-cart-persist-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let repo = LocalCartRepository::new(Arc::new(FileStorage::new(&dir)));

        let cart = repo.apply(&Cart::default(), add(2)).await.unwrap();
        repo.persist(cart.clone()).await.unwrap();
        assert!(dir.join(keys::CART).exists());
        assert_eq!(repo.load().await.unwrap(), cart);

        repo.persist(Cart::default()).await.unwrap();
        assert!(!dir.join(keys::CART).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_local_load_ignores_corrupt_entry() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::CART, "{not json").unwrap();

        let repo = LocalCartRepository::new(storage);
        assert!(repo.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_unknown_variant() {
        let repo = LocalCartRepository::new(Arc::new(MemoryStorage::new()));
        let err = repo
            .apply(
                &Cart::default(),
                CartAction::Add {
                    product: product(),
                    variant_id: VariantId::new("missing"),
                    quantity: 1,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Variant not found");
    }

    #[test]
    fn test_api_error_becomes_persistence_error() {
        let err: CartError = ApiError::Status {
            status: 400,
            message: "Insufficient stock".to_string(),
        }
        .into();
        assert_eq!(err, CartError::Persistence("Insufficient stock".to_string()));
    }
}
