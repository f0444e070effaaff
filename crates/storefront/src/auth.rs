//! Customer session.
//!
//! [`AuthSession`] tracks the logged-in [`User`] on top of the API client's
//! token. Logging in or out re-syncs the cart store, so the cart always
//! follows the current credentials: the server cart after login, the guest
//! cart after logout.

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::{info, instrument, warn};
use zodiaco_core::User;

use crate::api::{ApiClient, ApiError};
use crate::cart::CartStore;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::forms::{FormError, LoginForm, RegisterForm};

/// Errors from login and registration.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Form(#[from] FormError),

    #[error("{0}")]
    Api(#[from] ApiError),
}

/// Snapshot of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
}

/// Shared handle to the customer session.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<AuthSessionInner>,
}

struct AuthSessionInner {
    api: ApiClient,
    cart: CartStore,
    state: RwLock<AuthState>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    #[must_use]
    pub fn new(api: ApiClient, cart: CartStore) -> Self {
        Self {
            inner: Arc::new(AuthSessionInner {
                api,
                cart,
                state: RwLock::new(AuthState::default()),
            }),
        }
    }

    /// Current session snapshot.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The logged-in user, if known.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state().user
    }

    fn update_state(&self, f: impl FnOnce(&mut AuthState)) {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    fn set_user(&self, user: Option<User>) {
        match &user {
            Some(user) => set_sentry_user(user),
            None => clear_sentry_user(),
        }
        self.update_state(|state| {
            state.user = user;
            state.loading = false;
        });
    }

    /// Re-sync the cart after the credentials changed. A failed sync is
    /// already recorded in the cart state.
    async fn resync_cart(&self) {
        if let Err(e) = self.inner.cart.sync().await {
            warn!(error = %e, "Cart sync after session change failed");
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Log in and adopt the server cart.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Form` if the form is invalid (no request is made),
    /// or `AuthError::Api` if the server rejects the credentials.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn login(&self, form: &LoginForm) -> Result<User, AuthError> {
        let request = form.validate()?;

        self.update_state(|state| state.loading = true);
        let auth = match self.inner.api.login(&request).await {
            Ok(auth) => auth,
            Err(e) => {
                self.update_state(|state| state.loading = false);
                return Err(e.into());
            }
        };

        info!(user_id = %auth.user.id, "Logged in");
        self.set_user(Some(auth.user.clone()));
        self.resync_cart().await;
        Ok(auth.user)
    }

    /// Create an account, log in with it and adopt the server cart.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Form` if the form is invalid (no request is made),
    /// or `AuthError::Api` if the server rejects the registration.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &RegisterForm) -> Result<User, AuthError> {
        let request = form.validate()?;

        self.update_state(|state| state.loading = true);
        let auth = match self.inner.api.register(&request).await {
            Ok(auth) => auth,
            Err(e) => {
                self.update_state(|state| state.loading = false);
                return Err(e.into());
            }
        };

        info!(user_id = %auth.user.id, "Registered");
        self.set_user(Some(auth.user.clone()));
        self.resync_cart().await;
        Ok(auth.user)
    }

    /// Log out. The user is forgotten even if the server call fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(e) = self.inner.api.logout().await {
            warn!(error = %e, "Logout request failed; session cleared locally");
        }
        self.set_user(None);
        self.resync_cart().await;
    }

    /// Reload the user from `/users/me`.
    ///
    /// Without a token no request is made. Any failure leaves the session
    /// logged out.
    #[instrument(skip(self))]
    pub async fn refresh_user(&self) -> Option<User> {
        if !self.inner.api.is_authenticated().await {
            self.set_user(None);
            return None;
        }

        self.update_state(|state| state.loading = true);
        match self.inner.api.current_user().await {
            Ok(user) => {
                self.set_user(Some(user.clone()));
                Some(user)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load current user");
                self.set_user(None);
                None
            }
        }
    }
}
