//! Session and account commands.
//!
//! Passwords can be given with `--password` or through the
//! `ZODIACO_PASSWORD` environment variable so they stay out of shell history.

use tracing::info;
use zodiaco_core::{AddressId, AddressUpdate, NewAddress};
use zodiaco_storefront::api::{PasswordChange, ProfileUpdate};
use zodiaco_storefront::error::Result;
use zodiaco_storefront::forms::MIN_PASSWORD_LEN;
use zodiaco_storefront::{FormError, LoginForm, RegisterForm, Storefront};

use crate::views;

pub async fn login(storefront: &Storefront, form: &LoginForm) -> Result<String> {
    let user = storefront.auth().login(form).await?;
    Ok(format!("Hola, {}", views::user(&user)))
}

pub async fn register(storefront: &Storefront, form: &RegisterForm) -> Result<String> {
    let user = storefront.auth().register(form).await?;
    Ok(format!("Cuenta creada. Bienvenida/o, {}", views::user(&user)))
}

pub async fn logout(storefront: &Storefront) -> String {
    storefront.auth().logout().await;
    "Sesión cerrada".to_string()
}

pub async fn whoami(storefront: &Storefront) -> String {
    storefront.auth().refresh_user().await.map_or_else(
        || "No has iniciado sesión".to_string(),
        |user| views::user(&user),
    )
}

// =============================================================================
// Profile
// =============================================================================

/// Update name or email. At least one field must be given.
pub async fn update_profile(storefront: &Storefront, update: &ProfileUpdate) -> Result<String> {
    if update.first_name.is_none() && update.last_name.is_none() && update.email.is_none() {
        return Err(FormError::MissingFields.into());
    }
    let user = storefront.api().update_profile(update).await?;
    info!(user_id = %user.id, "Profile updated");
    Ok(views::user(&user))
}

pub async fn change_password(storefront: &Storefront, change: &PasswordChange) -> Result<String> {
    if change.current_password.is_empty() || change.new_password.is_empty() {
        return Err(FormError::MissingFields.into());
    }
    if change.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FormError::PasswordTooShort.into());
    }
    storefront.api().change_password(change).await?;
    Ok("Contraseña actualizada".to_string())
}

// =============================================================================
// Addresses
// =============================================================================

pub async fn addresses(storefront: &Storefront) -> Result<String> {
    let addresses = storefront.api().addresses().await?;
    Ok(views::addresses(&addresses))
}

pub async fn add_address(storefront: &Storefront, address: &NewAddress) -> Result<String> {
    let saved = storefront.api().add_address(address).await?;
    Ok(views::addresses(std::slice::from_ref(&saved)))
}

pub async fn update_address(
    storefront: &Storefront,
    id: &AddressId,
    update: &AddressUpdate,
) -> Result<String> {
    let saved = storefront.api().update_address(id, update).await?;
    Ok(views::addresses(std::slice::from_ref(&saved)))
}

pub async fn delete_address(storefront: &Storefront, id: &AddressId) -> Result<String> {
    storefront.api().delete_address(id).await?;
    Ok(format!("Dirección {id} eliminada"))
}
