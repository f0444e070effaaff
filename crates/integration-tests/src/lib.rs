//! End-to-end test support for the Zodiaco storefront client.
//!
//! [`MockApi`] serves an in-process `axum` imitation of the REST API on
//! `127.0.0.1:0`, with a small fixed catalog, one customer account and a
//! server cart. Each test starts its own server, so tests run in parallel.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p zodiaco-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_api` - Envelopes, errors and tokens at the API client level
//! - `storefront_cart` - Guest and server cart flows through the cart store
//! - `storefront_checkout` - Login, checkout and account flows

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use zodiaco_storefront::{MemoryStorage, SharedStorage, Storefront, StorefrontConfig};

/// Password of the fixture customer.
pub const PASSWORD: &str = "secreto";

/// Email of the fixture customer.
pub const EMAIL: &str = "ana@zodiaco.co";

const ACCESS_TOKEN: &str = "tok-ana";
const REFRESH_TOKEN: &str = "ref-ana";

// =============================================================================
// Fixtures
// =============================================================================

/// The fixture customer as the API returns it.
#[must_use]
pub fn customer() -> Value {
    json!({
        "id": "u1",
        "email": EMAIL,
        "firstName": "Ana",
        "lastName": "Ruiz",
        "role": "customer",
        "is_active": true,
    })
}

/// `p1` Camiseta Leo: `v1` (M, 40.000, plenty) and `v2` (L, 40.000, two left).
/// `p2` Gorra Aries: `v3` (35.000).
#[must_use]
pub fn catalog() -> Vec<Value> {
    vec![
        json!({
            "id": "p1",
            "name": "Camiseta Leo",
            "brand": "Zodiaco",
            "category_id": "c1",
            "is_featured": true,
            "variants": [
                {"id": "v1", "product_id": "p1", "name": "M", "price": "40000",
                 "stock": 10, "low_stock_threshold": 3, "attributes": {"size": "M"}},
                {"id": "v2", "product_id": "p1", "name": "L", "price": "40000",
                 "stock": 2, "low_stock_threshold": 3, "attributes": {"size": "L"}}
            ]
        }),
        json!({
            "id": "p2",
            "name": "Gorra Aries",
            "brand": "Zodiaco",
            "category_id": "c1",
            "variants": [
                {"id": "v3", "product_id": "p2", "name": "Única", "price": "35000", "stock": 5}
            ]
        }),
    ]
}

// =============================================================================
// Mock state
// =============================================================================

#[derive(Debug, Default)]
struct MockState {
    products: Vec<Value>,
    /// Server cart lines: `(line_id, product_id, variant_id, quantity)`.
    cart: Vec<(String, String, String, u32)>,
    next_line: u32,
    orders: Vec<Value>,
    addresses: Vec<Value>,
    requests: Vec<String>,
    tokens_revoked: bool,
    reject_cart_adds: bool,
    reject_orders: bool,
    /// Hold every response for this long before answering.
    delay: Option<Duration>,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockState {
    fn product(&self, id: &str) -> Option<&Value> {
        self.products.iter().find(|p| p["id"] == id)
    }

    fn variant(&self, product_id: &str, variant_id: &str) -> Option<&Value> {
        self.product(product_id)?["variants"]
            .as_array()?
            .iter()
            .find(|v| v["id"] == variant_id)
    }

    fn unit_price(&self, product_id: &str, variant_id: &str) -> u64 {
        self.variant(product_id, variant_id)
            .and_then(|v| v["price"].as_str())
            .and_then(|p| p.parse().ok())
            .unwrap_or(0)
    }

    fn cart_json(&self) -> Value {
        let items: Vec<Value> = self
            .cart
            .iter()
            .map(|(id, product_id, variant_id, quantity)| {
                json!({
                    "id": id,
                    "quantity": quantity,
                    "product": self.product(product_id),
                    "variant": self.variant(product_id, variant_id),
                })
            })
            .collect();
        let total: u64 = self
            .cart
            .iter()
            .map(|(_, p, v, q)| self.unit_price(p, v) * u64::from(*q))
            .sum();
        let count: u32 = self.cart.iter().map(|line| line.3).sum();
        json!({
            "id": "cart-u1",
            "items": items,
            "total_amount": total.to_string(),
            "total_items": count,
        })
    }
}

// =============================================================================
// MockApi
// =============================================================================

/// A running mock of the REST API.
#[derive(Debug, Clone)]
pub struct MockApi {
    base_url: String,
    state: Shared,
}

impl MockApi {
    /// Bind to an ephemeral port and serve in the background.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState {
            products: catalog(),
            next_line: 1,
            ..MockState::default()
        }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock API listener");
        let addr = listener.local_addr().expect("mock API address");

        let app = router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}/api/v1"),
            state,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig::for_api(&self.base_url).expect("mock API URL is valid")
    }

    /// A fresh storefront session over in-memory storage.
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        self.storefront_with(Arc::new(MemoryStorage::new()))
    }

    /// A storefront session over the given storage.
    #[must_use]
    pub fn storefront_with(&self, storage: SharedStorage) -> Storefront {
        Storefront::with_storage(self.config(), storage).expect("build storefront")
    }

    /// A storefront session whose requests give up after `timeout`.
    #[must_use]
    pub fn storefront_with_timeout(&self, timeout: Duration) -> Storefront {
        let config = StorefrontConfig {
            request_timeout: timeout,
            ..self.config()
        };
        Storefront::with_storage(config, Arc::new(MemoryStorage::new()))
            .expect("build storefront")
    }

    /// Every request served so far, as `METHOD /path?query`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }

    /// Number of served requests starting with `prefix`, e.g. `"POST /api/v1/cart"`.
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }

    /// Server cart as `(product_id, variant_id, quantity)`.
    #[must_use]
    pub fn server_cart(&self) -> Vec<(String, String, u32)> {
        lock(&self.state)
            .cart
            .iter()
            .map(|(_, p, v, q)| (p.clone(), v.clone(), *q))
            .collect()
    }

    /// Put a line straight into the server cart.
    pub fn seed_server_cart(&self, product_id: &str, variant_id: &str, quantity: u32) {
        let mut state = lock(&self.state);
        let id = format!("line-{}", state.next_line);
        state.next_line += 1;
        state
            .cart
            .push((id, product_id.to_string(), variant_id.to_string(), quantity));
    }

    /// Orders received by `POST /orders`.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        lock(&self.state).orders.clone()
    }

    /// Make every authenticated call answer 401 from now on.
    pub fn revoke_tokens(&self) {
        lock(&self.state).tokens_revoked = true;
    }

    /// Make `POST /cart/items` answer 409.
    pub fn reject_cart_adds(&self) {
        lock(&self.state).reject_cart_adds = true;
    }

    /// Make `POST /orders` answer 422.
    pub fn reject_orders(&self) {
        lock(&self.state).reject_orders = true;
    }

    /// Hold every response for `delay` from now on. Requests are still
    /// recorded on arrival.
    pub fn respond_after(&self, delay: Duration) {
        lock(&self.state).delay = Some(delay);
    }
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/users/me", get(me))
        .route("/users/addresses", get(addresses).post(add_address))
        .route("/users/addresses/{id}", delete(delete_address))
        .route("/products", get(products))
        .route("/products/featured", get(featured))
        .route("/products/categories", get(categories))
        .route("/products/{id}", get(product))
        .route("/products/{id}/related", get(related))
        .route("/products/{id}/reviews", get(reviews))
        .route("/cart", get(cart).delete(clear_cart))
        .route("/cart/items", post(add_cart_item))
        .route(
            "/cart/items/{id}",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/orders", get(orders).post(create_order))
        .route("/orders/{id}", get(order));

    Router::new()
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let line = format!(
        "{} {}",
        request.method(),
        request
            .uri()
            .path_and_query()
            .map_or_else(|| request.uri().path().to_string(), ToString::to_string)
    );
    let delay = {
        let mut state = lock(&state);
        state.requests.push(line);
        state.delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    next.run(request).await
}

fn error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    error(StatusCode::UNAUTHORIZED, json!({"message": "Token inválido"}))
}

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    !state.tokens_revoked
        && headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some(format!("Bearer {ACCESS_TOKEN}").as_str())
}

fn auth_payload() -> Value {
    json!({
        "access_token": ACCESS_TOKEN,
        "refresh_token": REFRESH_TOKEN,
        "user": customer(),
    })
}

// -----------------------------------------------------------------------------
// Auth
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(Json(body): Json<Credentials>) -> Response {
    if body.email == EMAIL && body.password == PASSWORD {
        Json(json!({"success": true, "data": auth_payload()})).into_response()
    } else {
        error(
            StatusCode::BAD_REQUEST,
            json!({"error": {"message": "Credenciales inválidas"}}),
        )
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == EMAIL {
        return error(
            StatusCode::CONFLICT,
            json!({"error": "Email already registered"}),
        );
    }
    let user = json!({
        "id": "u2",
        "email": body["email"],
        "firstName": body["firstName"],
        "lastName": body["lastName"],
    });
    (
        StatusCode::CREATED,
        Json(json!({"access_token": ACCESS_TOKEN, "user": user})),
    )
        .into_response()
}

async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn refresh(headers: HeaderMap) -> Response {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if bearer == Some(format!("Bearer {REFRESH_TOKEN}").as_str()) {
        Json(json!({"access_token": ACCESS_TOKEN})).into_response()
    } else {
        unauthorized()
    }
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&lock(&state), &headers) {
        return unauthorized();
    }
    Json(json!({"user": customer()})).into_response()
}

// -----------------------------------------------------------------------------
// Addresses
// -----------------------------------------------------------------------------

async fn addresses(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!({"addresses": state.addresses})).into_response()
}

async fn add_address(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    body["id"] = json!(format!("a{}", state.addresses.len() + 1));
    state.addresses.push(body.clone());
    (StatusCode::CREATED, Json(json!({"address": body}))).into_response()
}

async fn delete_address(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut state = lock(&state);
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let before = state.addresses.len();
    state.addresses.retain(|a| a["id"] != id.as_str());
    if state.addresses.len() == before {
        return error(StatusCode::NOT_FOUND, json!({"message": "Dirección no encontrada"}));
    }
    StatusCode::NO_CONTENT.into_response()
}

// -----------------------------------------------------------------------------
// Catalog
// -----------------------------------------------------------------------------

async fn products(State(state): State<Shared>) -> Response {
    let state = lock(&state);
    let total = state.products.len();
    Json(json!({
        "products": state.products,
        "pagination": {"page": 1, "limit": 20, "total": total, "pages": 1},
    }))
    .into_response()
}

async fn featured(State(state): State<Shared>) -> Response {
    let state = lock(&state);
    let featured: Vec<&Value> = state
        .products
        .iter()
        .filter(|p| p["is_featured"] == true)
        .collect();
    Json(json!(featured)).into_response()
}

async fn categories() -> Response {
    Json(json!({
        "categories": [{"id": "c1", "name": "Signos de Fuego", "slug": "signos-de-fuego"}]
    }))
    .into_response()
}

async fn product(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let state = lock(&state);
    state.product(&id).map_or_else(
        || error(StatusCode::NOT_FOUND, json!({"message": "Producto no encontrado"})),
        |product| Json(json!({"product": product})).into_response(),
    )
}

async fn related(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let state = lock(&state);
    let others: Vec<&Value> = state.products.iter().filter(|p| p["id"] != id.as_str()).collect();
    Json(json!({"items": others})).into_response()
}

async fn reviews(Path(id): Path<String>) -> Response {
    Json(json!({
        "reviews": [{"id": "r1", "product_id": id, "rating": 5, "title": "Hermosa",
                     "comment": "La tela es muy suave", "is_verified_purchase": true}],
        "pagination": {"page": 1, "limit": 20, "total": 1, "pages": 1},
    }))
    .into_response()
}

// -----------------------------------------------------------------------------
// Cart
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct NewLine {
    product_id: String,
    variant_id: String,
    quantity: u32,
}

#[derive(Deserialize)]
struct QuantityBody {
    quantity: u32,
}

async fn cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!({"success": true, "cart": state.cart_json()})).into_response()
}

async fn add_cart_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(line): Json<NewLine>,
) -> Response {
    let mut state = lock(&state);
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if state.reject_cart_adds {
        return error(StatusCode::CONFLICT, json!({"error": "Stock insuficiente"}));
    }
    if state.variant(&line.product_id, &line.variant_id).is_none() {
        return error(StatusCode::NOT_FOUND, json!({"message": "Variant not found"}));
    }

    if let Some(existing) = state
        .cart
        .iter_mut()
        .find(|(_, p, v, _)| *p == line.product_id && *v == line.variant_id)
    {
        existing.3 += line.quantity;
    } else {
        let id = format!("line-{}", state.next_line);
        state.next_line += 1;
        state
            .cart
            .push((id, line.product_id, line.variant_id, line.quantity));
    }
    Json(state.cart_json()).into_response()
}

async fn update_cart_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<QuantityBody>,
) -> Response {
    let mut state = lock(&state);
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let Some(line) = state.cart.iter_mut().find(|line| line.0 == id) else {
        return error(StatusCode::NOT_FOUND, json!({"message": "Cart item not found"}));
    };
    line.3 = body.quantity;
    Json(state.cart_json()).into_response()
}

async fn remove_cart_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut state = lock(&state);
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    state.cart.retain(|line| line.0 != id);
    Json(state.cart_json()).into_response()
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    state.cart.clear();
    StatusCode::NO_CONTENT.into_response()
}

// -----------------------------------------------------------------------------
// Orders
// -----------------------------------------------------------------------------

async fn create_order(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&state);
    if state.reject_orders {
        return error(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"message": "Pago rechazado"}),
        );
    }

    let items: Vec<Value> = body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    let product_id = item["product_id"].as_str().unwrap_or_default();
                    let variant_id = item["variant_id"].as_str().unwrap_or_default();
                    let mut line = item.clone();
                    line["price"] = json!(state.unit_price(product_id, variant_id).to_string());
                    line
                })
                .collect()
        })
        .unwrap_or_default();
    let total: u64 = items
        .iter()
        .map(|item| {
            item["price"].as_str().and_then(|p| p.parse::<u64>().ok()).unwrap_or(0)
                * item["quantity"].as_u64().unwrap_or(0)
        })
        .sum();

    let number = 1001 + state.orders.len();
    let order = json!({
        "id": format!("o{}", state.orders.len() + 1),
        "order_number": format!("ZD-{number}"),
        "status": "pending",
        "total_amount": total.to_string(),
        "items": items,
        "shipping_address": body["shipping_address"],
        "billing_address": body["billing_address"],
        "payment_method": body["payment_method"],
    });
    state.orders.push(order.clone());
    (StatusCode::CREATED, Json(json!({"order": order}))).into_response()
}

async fn orders(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let total = state.orders.len();
    Json(json!({
        "orders": state.orders,
        "pagination": {"page": 1, "limit": 20, "total": total, "pages": 1},
    }))
    .into_response()
}

async fn order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let state = lock(&state);
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    state
        .orders
        .iter()
        .find(|o| o["id"] == id.as_str())
        .map_or_else(
            || error(StatusCode::NOT_FOUND, json!({"message": "Pedido no encontrado"})),
            |order| Json(json!({"order": order})).into_response(),
        )
}
