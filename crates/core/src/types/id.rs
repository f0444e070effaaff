//! Newtype IDs for type-safe entity references.
//!
//! The storefront API identifies every resource with an opaque string, so
//! each ID wraps a `String`. Use the `define_id!` macro to create wrappers
//! that prevent accidentally mixing IDs from different entity types.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<&str>`, `From<String>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use zodiaco_core::define_id;
/// define_id!(WishlistId);
/// define_id!(CouponId);
///
/// let wishlist = WishlistId::new("w-1");
/// let coupon = CouponId::new("w-1");
///
/// // These are different types, so this won't compile:
/// // let _: WishlistId = coupon;
/// assert_eq!(wishlist.as_str(), coupon.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ProductId);
define_id!(VariantId);
define_id!(ImageId);
define_id!(CategoryId);
define_id!(ReviewId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(AddressId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = ProductId::new("prod-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"prod-42\"");

        let parsed: VariantId = serde_json::from_str("\"var-7\"").unwrap();
        assert_eq!(parsed.as_str(), "var-7");
    }

    #[test]
    fn test_display_matches_inner() {
        let id = OrderId::from("ORD-2024-0001");
        assert_eq!(id.to_string(), "ORD-2024-0001");
        assert_eq!(id.into_inner(), "ORD-2024-0001");
    }
}
