//! Response envelope normalization.
//!
//! The backend wraps payloads inconsistently: a bare array, `{"items": [...]}`,
//! `{"item": {...}}`, `{"items": [...], "pagination": {...}}`, or the same
//! shapes under resource-specific keys (`products`, `product`, `categories`,
//! ...). [`unwrap_envelope`] reduces all of them to the payload itself, with
//! paginated responses reduced to `{"items", "pagination"}` so they decode
//! into [`Paginated`](zodiaco_core::Paginated).
//!
//! An object only counts as an envelope when every key is an envelope key and
//! exactly one payload key is present. Real resources that happen to have an
//! `items` or `user` field (a cart, a login response) pass through untouched.

use serde_json::{Map, Value};

/// Keys that carry the payload.
const PAYLOAD_KEYS: &[&str] = &[
    "items",
    "item",
    "data",
    "products",
    "product",
    "categories",
    "category",
    "orders",
    "order",
    "addresses",
    "address",
    "reviews",
    "review",
    "cart",
    "user",
];

/// Keys that may accompany the payload without being part of it.
const META_KEYS: &[&str] = &["pagination", "message", "success", "status", "total", "count"];

/// Strip the envelope from a response body.
#[must_use]
pub fn unwrap_envelope(body: Value) -> Value {
    let Value::Object(mut map) = body else {
        return body;
    };

    let Some(payload_key) = envelope_payload_key(&map) else {
        // Paginated response with an empty page may omit the list entirely.
        if is_bare_pagination(&map) {
            return paginated(Value::Array(Vec::new()), map.remove("pagination"));
        }
        return Value::Object(map);
    };

    let payload = map.remove(&payload_key).unwrap_or(Value::Null);
    match map.remove("pagination") {
        Some(pagination) => paginated(payload, Some(pagination)),
        None => payload,
    }
}

fn envelope_payload_key(map: &Map<String, Value>) -> Option<String> {
    let all_envelope_keys = map
        .keys()
        .all(|k| PAYLOAD_KEYS.contains(&k.as_str()) || META_KEYS.contains(&k.as_str()));
    if !all_envelope_keys {
        return None;
    }

    let mut payload_keys = map.keys().filter(|k| PAYLOAD_KEYS.contains(&k.as_str()));
    let first = payload_keys.next()?;
    if payload_keys.next().is_some() {
        return None;
    }
    Some(first.clone())
}

fn is_bare_pagination(map: &Map<String, Value>) -> bool {
    map.contains_key("pagination") && map.keys().all(|k| META_KEYS.contains(&k.as_str()))
}

fn paginated(items: Value, pagination: Option<Value>) -> Value {
    let mut out = Map::new();
    out.insert("items".to_string(), items);
    out.insert("pagination".to_string(), pagination.unwrap_or(Value::Null));
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_bare_array_passes_through() {
        assert_eq!(unwrap_envelope(json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn test_items_envelope() {
        assert_eq!(unwrap_envelope(json!({"items": [{"id": "a"}]})), json!([{"id": "a"}]));
    }

    #[test]
    fn test_item_envelope() {
        assert_eq!(
            unwrap_envelope(json!({"item": {"id": "a"}, "message": "ok"})),
            json!({"id": "a"})
        );
    }

    #[test]
    fn test_paginated_envelope() {
        let body = json!({
            "items": [{"id": "a"}],
            "pagination": {"page": 1, "limit": 20, "total": 1, "pages": 1},
        });
        assert_eq!(unwrap_envelope(body.clone()), body);
    }

    #[test]
    fn test_named_envelopes() {
        assert_eq!(unwrap_envelope(json!({"products": []})), json!([]));
        assert_eq!(unwrap_envelope(json!({"product": {"id": "p"}})), json!({"id": "p"}));
        assert_eq!(unwrap_envelope(json!({"categories": [1]})), json!([1]));
        assert_eq!(
            unwrap_envelope(json!({
                "products": [1],
                "pagination": {"page": 2, "limit": 1, "total": 3, "pages": 3}
            })),
            json!({
                "items": [1],
                "pagination": {"page": 2, "limit": 1, "total": 3, "pages": 3}
            })
        );
    }

    #[test]
    fn test_pagination_without_items() {
        let pagination = json!({"page": 1, "limit": 20, "total": 0, "pages": 0});
        assert_eq!(
            unwrap_envelope(json!({"pagination": pagination})),
            json!({"items": [], "pagination": pagination})
        );
    }

    #[test]
    fn test_resources_are_not_mistaken_for_envelopes() {
        let cart = json!({"id": "c1", "user_id": "u1", "items": [], "total_amount": 0});
        assert_eq!(unwrap_envelope(cart.clone()), cart);

        let auth = json!({"access_token": "t", "refresh_token": "r", "user": {"id": "u"}});
        assert_eq!(unwrap_envelope(auth.clone()), auth);
    }

    #[test]
    fn test_two_payload_keys_is_not_an_envelope() {
        let body = json!({"user": {"id": "u"}, "cart": {"id": "c"}});
        assert_eq!(unwrap_envelope(body.clone()), body);
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(unwrap_envelope(json!("ok")), json!("ok"));
        assert_eq!(unwrap_envelope(Value::Null), Value::Null);
    }
}
