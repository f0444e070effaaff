//! REST API client.
//!
//! Wraps every remote operation of the storefront backend (`/api/v1`) in one
//! async method that returns `Result<T, ApiError>`. Responses are unwrapped
//! from their envelope (see [`envelope`]) before being decoded, so callers
//! always receive the payload type they asked for.
//!
//! The bearer token is restored from local storage on construction and kept
//! in sync with it: login and registration store it, logout and any 401
//! response clear it.
//!
//! Catalog reads (single products, featured products, categories) are cached
//! using `moka` (5-minute TTL).

mod cache;
pub mod envelope;
mod error;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument, warn};
use url::Url;
use zodiaco_core::{
    Address, AddressId, AddressUpdate, CartItemId, Category, CategoryId, NewAddress, NewOrder,
    NewReview, Order, OrderId, Paginated, Product, ProductId, ProductQuery, Review, User,
    VariantId,
};

use crate::config::StorefrontConfig;
use crate::storage::{SharedStorage, keys};

use cache::{CacheKey, CacheValue};
pub use envelope::unwrap_envelope;
pub use error::ApiError;
use types::AddToCartBody;
pub use types::{
    AccessToken, AuthResponse, LoginRequest, PasswordChange, ProfileUpdate, RegisterRequest,
    RemoteCart, RemoteCartItem,
};

/// Default page size for paginated listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Which stored token authenticates a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Credential {
    Access,
    Refresh,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront REST API.
///
/// Cheap to clone; clones share the token, the HTTP connection pool and the
/// catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    storage: SharedStorage,
    access_token: RwLock<Option<SecretString>>,
    refresh_token: RwLock<Option<SecretString>>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the configured API.
    ///
    /// Any token left in `storage` by a previous session is restored.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig, storage: SharedStorage) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let access_token = restore_token(&storage, keys::ACCESS_TOKEN);
        let refresh_token = restore_token(&storage, keys::REFRESH_TOKEN);

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                storage,
                access_token: RwLock::new(access_token),
                refresh_token: RwLock::new(refresh_token),
                cache,
            }),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Token handling
    // =========================================================================

    /// Whether a bearer token is currently held.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.access_token.read().await.is_some()
    }

    /// The current bearer token, if any.
    pub async fn token(&self) -> Option<SecretString> {
        self.inner
            .access_token
            .read()
            .await
            .as_ref()
            .map(|t| SecretString::from(t.expose_secret().to_string()))
    }

    async fn set_access_token(&self, token: &str) {
        if let Err(e) = self.inner.storage.set(keys::ACCESS_TOKEN, token) {
            warn!(error = %e, "Failed to persist access token");
        }
        *self.inner.access_token.write().await = Some(SecretString::from(token.to_string()));
    }

    async fn set_refresh_token(&self, token: &str) {
        if let Err(e) = self.inner.storage.set(keys::REFRESH_TOKEN, token) {
            warn!(error = %e, "Failed to persist refresh token");
        }
        *self.inner.refresh_token.write().await = Some(SecretString::from(token.to_string()));
    }

    /// Forget both tokens, in memory and in storage.
    pub async fn clear_tokens(&self) {
        *self.inner.access_token.write().await = None;
        *self.inner.refresh_token.write().await = None;
        for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN] {
            if let Err(e) = self.inner.storage.remove(key) {
                warn!(error = %e, key, "Failed to remove stored token");
            }
        }
    }

    async fn store_auth(&self, auth: &AuthResponse) {
        self.set_access_token(&auth.access_token).await;
        if let Some(refresh) = &auth.refresh_token {
            self.set_refresh_token(refresh).await;
        }
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Build an endpoint URL from path segments and query pairs.
    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidRequest("API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Send a request and return the raw JSON body (`Null` when empty).
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        credential: Credential,
    ) -> Result<Value, ApiError> {
        let lock = match credential {
            Credential::Access => &self.inner.access_token,
            Credential::Refresh => &self.inner.refresh_token,
        };
        let token = lock
            .read()
            .await
            .as_ref()
            .map(|t| t.expose_secret().to_string());

        debug!(method = %method, path = url.path(), "Sending API request");

        let mut request = self.inner.client.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!("API returned 401, clearing stored credentials");
            self.clear_tokens().await;
            return Err(ApiError::Unauthorized);
        }

        let text = response.text().await?;

        if !status.is_success() {
            debug!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            return Err(status_error(status, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse API response"
            );
            ApiError::Decode(e.to_string())
        })
    }

    /// Send a request and decode the unwrapped payload.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let value = self.send(method, url, body, Credential::Access).await?;
        decode(value)
    }

    /// Send a request whose response body carries nothing of interest.
    async fn request_unit(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<(), ApiError> {
        self.send(method, url, body, Credential::Access).await?;
        Ok(())
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Log in with email and password.
    ///
    /// On success the returned tokens are stored and used for later calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint(&["auth", "login"], &[])?;
        let auth: AuthResponse = self
            .request(Method::POST, url, Some(serde_json::to_value(credentials)?))
            .await?;
        self.store_auth(&auth).await;
        Ok(auth)
    }

    /// Create an account. Stores the returned tokens like [`Self::login`].
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the registration or the request
    /// fails.
    #[instrument(skip(self, details), fields(email = %details.email))]
    pub async fn register(&self, details: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint(&["auth", "register"], &[])?;
        let auth: AuthResponse = self
            .request(Method::POST, url, Some(serde_json::to_value(details)?))
            .await?;
        self.store_auth(&auth).await;
        Ok(auth)
    }

    /// Log out. The stored tokens are cleared whether or not the call
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns the server or transport error, after clearing the tokens.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let url = self.endpoint(&["auth", "logout"], &[])?;
        let result = self.request_unit(Method::POST, url, None).await;
        self.clear_tokens().await;
        result
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NoRefreshToken` if no refresh token is stored, or
    /// the server or transport error.
    #[instrument(skip(self))]
    pub async fn refresh_token(&self) -> Result<AccessToken, ApiError> {
        if self.inner.refresh_token.read().await.is_none() {
            return Err(ApiError::NoRefreshToken);
        }

        let url = self.endpoint(&["auth", "refresh"], &[])?;
        let value = self
            .send(Method::POST, url, None, Credential::Refresh)
            .await?;
        let token: AccessToken = decode(value)?;
        self.set_access_token(&token.access_token).await;
        Ok(token)
    }

    /// Fetch the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if no valid token is held, or the
    /// server or transport error.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User, ApiError> {
        let url = self.endpoint(&["users", "me"], &[])?;
        self.request(Method::GET, url, None).await
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Search and filter products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Paginated<Product>, ApiError> {
        let url = self.endpoint(&["products"], &query.to_pairs())?;
        self.request(Method::GET, url, None).await
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&["products", id.as_str()], &[])?;
        let product: Product = self.request(Method::GET, url, None).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get featured products for the home page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn featured_products(&self, limit: u32) -> Result<Vec<Product>, ApiError> {
        let cache_key = CacheKey::FeaturedProducts { limit };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let url = self.endpoint(&["products", "featured"], &[("limit", limit.to_string())])?;
        let products: Vec<Product> = self.request(Method::GET, url, None).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get all product categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let url = self.endpoint(&["products", "categories"], &[])?;
        let categories: Vec<Category> = self.request(Method::GET, url, None).await?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Get one page of the products in a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn category_products(
        &self,
        id: &CategoryId,
        page: u32,
        limit: u32,
    ) -> Result<Paginated<Product>, ApiError> {
        let url = self.endpoint(
            &["products", "categories", id.as_str(), "products"],
            &page_query(page, limit),
        )?;
        self.request(Method::GET, url, None).await
    }

    /// Get products related to a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn related_products(
        &self,
        id: &ProductId,
        limit: u32,
    ) -> Result<Vec<Product>, ApiError> {
        let url = self.endpoint(
            &["products", id.as_str(), "related"],
            &[("limit", limit.to_string())],
        )?;
        self.request(Method::GET, url, None).await
    }

    /// Get one page of a product's reviews.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product_reviews(
        &self,
        id: &ProductId,
        page: u32,
        limit: u32,
    ) -> Result<Paginated<Review>, ApiError> {
        let url = self.endpoint(&["products", id.as_str(), "reviews"], &page_query(page, limit))?;
        self.request(Method::GET, url, None).await
    }

    /// Post a review for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the review or the request fails.
    #[instrument(skip(self, review), fields(product_id = %id, rating = review.rating))]
    pub async fn add_product_review(
        &self,
        id: &ProductId,
        review: &NewReview,
    ) -> Result<Review, ApiError> {
        let url = self.endpoint(&["products", id.as_str(), "reviews"], &[])?;
        let review = self
            .request(Method::POST, url, Some(serde_json::to_value(review)?))
            .await?;
        self.inner.cache.invalidate(&CacheKey::Product(id.clone())).await;
        Ok(review)
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Get the authenticated user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<RemoteCart, ApiError> {
        let url = self.endpoint(&["cart"], &[])?;
        self.request(Method::GET, url, None).await
    }

    /// Add units of a product variant to the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the line (e.g. insufficient
    /// stock) or the request fails.
    #[instrument(skip(self), fields(product_id = %product_id, variant_id = %variant_id))]
    pub async fn add_to_cart(
        &self,
        product_id: &ProductId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<RemoteCart, ApiError> {
        let url = self.endpoint(&["cart", "items"], &[])?;
        let body = AddToCartBody {
            product_id: product_id.as_str(),
            variant_id: variant_id.as_str(),
            quantity,
        };
        self.request(Method::POST, url, Some(serde_json::to_value(body)?))
            .await
    }

    /// Set the quantity of a server cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update_cart_item(
        &self,
        item_id: &CartItemId,
        quantity: u32,
    ) -> Result<RemoteCart, ApiError> {
        let url = self.endpoint(&["cart", "items", item_id.as_str()], &[])?;
        let body = types::UpdateCartItemBody { quantity };
        self.request(Method::PUT, url, Some(serde_json::to_value(body)?))
            .await
    }

    /// Remove a line from the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_from_cart(&self, item_id: &CartItemId) -> Result<RemoteCart, ApiError> {
        let url = self.endpoint(&["cart", "items", item_id.as_str()], &[])?;
        self.request(Method::DELETE, url, None).await
    }

    /// Empty the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart"], &[])?;
        self.request_unit(Method::DELETE, url, None).await
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the order or the request fails.
    #[instrument(skip(self, order), fields(lines = order.items.len(), payment = %order.payment_method))]
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        let url = self.endpoint(&["orders"], &[])?;
        self.request(Method::POST, url, Some(serde_json::to_value(order)?))
            .await
    }

    /// Get one page of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn orders(&self, page: u32, limit: u32) -> Result<Paginated<Order>, ApiError> {
        let url = self.endpoint(&["orders"], &page_query(page, limit))?;
        self.request(Method::GET, url, None).await
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not found or the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: &OrderId) -> Result<Order, ApiError> {
        let url = self.endpoint(&["orders", id.as_str()], &[])?;
        self.request(Method::GET, url, None).await
    }

    // =========================================================================
    // User Methods
    // =========================================================================

    /// Update the user's name or email.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the update or the request fails.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let url = self.endpoint(&["users", "profile"], &[])?;
        self.request(Method::PUT, url, Some(serde_json::to_value(update)?))
            .await
    }

    /// Change the user's password.
    ///
    /// # Errors
    ///
    /// Returns an error if the current password is wrong or the request fails.
    #[instrument(skip(self, change))]
    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        let url = self.endpoint(&["users", "change-password"], &[])?;
        self.request_unit(Method::POST, url, Some(serde_json::to_value(change)?))
            .await
    }

    /// List the user's saved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        let url = self.endpoint(&["users", "addresses"], &[])?;
        self.request(Method::GET, url, None).await
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the address or the request fails.
    #[instrument(skip(self, address))]
    pub async fn add_address(&self, address: &NewAddress) -> Result<Address, ApiError> {
        let url = self.endpoint(&["users", "addresses"], &[])?;
        self.request(Method::POST, url, Some(serde_json::to_value(address)?))
            .await
    }

    /// Change fields of a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not found or the request fails.
    #[instrument(skip(self, update), fields(address_id = %id))]
    pub async fn update_address(
        &self,
        id: &AddressId,
        update: &AddressUpdate,
    ) -> Result<Address, ApiError> {
        let url = self.endpoint(&["users", "addresses", id.as_str()], &[])?;
        self.request(Method::PUT, url, Some(serde_json::to_value(update)?))
            .await
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not found or the request fails.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn delete_address(&self, id: &AddressId) -> Result<(), ApiError> {
        let url = self.endpoint(&["users", "addresses", id.as_str()], &[])?;
        self.request_unit(Method::DELETE, url, None).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn restore_token(storage: &SharedStorage, key: &str) -> Option<SecretString> {
    match storage.get(key) {
        Ok(token) => token
            .filter(|t| !t.trim().is_empty())
            .map(|t| SecretString::from(t.trim().to_string())),
        Err(e) => {
            warn!(error = %e, key, "Failed to read stored token");
            None
        }
    }
}

fn page_query(page: u32, limit: u32) -> [(&'static str, String); 2] {
    [("page", page.to_string()), ("limit", limit.to_string())]
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(unwrap_envelope(value))?)
}

/// Build the error for a non-2xx, non-401 response.
fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| server_message(&value))
        .unwrap_or_else(|| {
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        });

    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

/// The server's own error text: `error`, then `message`, either as a string
/// or as an object carrying `message`.
fn server_message(body: &Value) -> Option<String> {
    ["error", "message"].iter().find_map(|key| match body.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    })
}
