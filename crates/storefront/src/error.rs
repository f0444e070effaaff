//! Unified error handling with Sentry integration.
//!
//! Each layer has its own error enum; [`StorefrontError`] wraps all of them
//! for front-ends that only need to report a failure. [`StorefrontError::report`]
//! captures unexpected failures to Sentry and [`StorefrontError::user_message`]
//! yields the one-line text shown to the customer.

use thiserror::Error;
use zodiaco_core::{CartError, User};

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::forms::FormError;
use crate::storage::StorageError;

/// Message shown for transport failures.
pub const NETWORK_MESSAGE: &str = "No pudimos conectar con la tienda. Intenta de nuevo.";

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Cart(#[from] CartError),

    #[error("{0}")]
    Form(#[from] FormError),

    #[error("{0}")]
    Checkout(#[from] CheckoutError),

    /// A lookup in already-loaded data came up empty.
    #[error("{0}")]
    NotFound(String),
}

impl From<AuthError> for StorefrontError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Form(e) => Self::Form(e),
            AuthError::Api(e) => Self::Api(e),
        }
    }
}

impl StorefrontError {
    /// The API error underneath, if any.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) | Self::Checkout(CheckoutError::Api(e)) => Some(e),
            _ => None,
        }
    }

    /// Whether this failure is worth an error report: configuration, storage
    /// and undecodable responses. Validation, auth and server-side domain
    /// errors are expected.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        match self {
            Self::Config(_) | Self::Storage(_) => true,
            _ => matches!(
                self.api_error(),
                Some(ApiError::Decode(_) | ApiError::InvalidRequest(_))
            ),
        }
    }

    /// Capture to Sentry if unexpected. Returns `self` for chaining.
    #[must_use]
    pub fn report(self) -> Self {
        if self.is_unexpected() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        }
        self
    }

    /// One-line message for the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.api_error() {
            Some(ApiError::Network(_)) => NETWORK_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user: &User) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: Some(user.email.clone()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_passes_domain_messages_through() {
        let err = StorefrontError::from(ApiError::Status {
            status: 409,
            message: "Email already registered".to_string(),
        });
        assert_eq!(err.to_string(), "Email already registered");
        assert_eq!(err.user_message(), "Email already registered");

        let err = StorefrontError::from(CartError::VariantNotFound("v9".into()));
        assert_eq!(err.user_message(), "Variant not found");
    }

    #[test]
    fn test_network_errors_get_generic_message() {
        let err = StorefrontError::from(ApiError::Network("connection refused".to_string()));
        assert_eq!(err.user_message(), NETWORK_MESSAGE);

        let err = StorefrontError::from(CheckoutError::Api(ApiError::Network(
            "request timed out".to_string(),
        )));
        assert_eq!(err.user_message(), NETWORK_MESSAGE);
    }

    #[test]
    fn test_auth_error_flattens() {
        let err = StorefrontError::from(AuthError::Form(FormError::TermsNotAccepted));
        assert!(matches!(err, StorefrontError::Form(FormError::TermsNotAccepted)));
    }

    #[test]
    fn test_unexpected_classification() {
        assert!(StorefrontError::from(ApiError::Decode("bad json".to_string())).is_unexpected());
        assert!(!StorefrontError::from(ApiError::Unauthorized).is_unexpected());
        assert!(!StorefrontError::from(FormError::MissingFields).is_unexpected());
        assert!(!StorefrontError::NotFound("p1".to_string()).is_unexpected());
    }
}
