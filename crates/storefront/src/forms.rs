//! Customer-facing forms and their validation.
//!
//! Validation runs before any request is made. Failures are returned as
//! [`FormError`] values whose `Display` text is shown next to the form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zodiaco_core::{Email, EmailError, PostalAddress};

use crate::api::{LoginRequest, RegisterRequest};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Country every storefront order ships to.
pub const DEFAULT_COUNTRY: &str = "CO";

/// Form validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Por favor completa todos los campos requeridos")]
    MissingFields,

    #[error("Correo electrónico inválido")]
    InvalidEmail(#[source] EmailError),

    #[error("Las contraseñas no coinciden")]
    PasswordMismatch,

    #[error("La contraseña debe tener al menos 6 caracteres")]
    PasswordTooShort,

    #[error("Debes aceptar los términos y condiciones")]
    TermsNotAccepted,

    #[error("Método de pago no válido: {0}")]
    InvalidPaymentMethod(String),
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn parse_email(raw: &str) -> Result<Email, FormError> {
    if is_blank(raw) {
        return Err(FormError::MissingFields);
    }
    Email::parse(raw).map_err(FormError::InvalidEmail)
}

// =============================================================================
// Auth forms
// =============================================================================

/// Login form.
#[derive(Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl LoginForm {
    /// Validate the form and build the request body.
    ///
    /// # Errors
    ///
    /// Returns `FormError::MissingFields` if either field is empty, or
    /// `FormError::InvalidEmail` if the email is malformed.
    pub fn validate(&self) -> Result<LoginRequest, FormError> {
        if is_blank(&self.email) || self.password.is_empty() {
            return Err(FormError::MissingFields);
        }
        let email = parse_email(&self.email)?;
        Ok(LoginRequest {
            email: email.into_inner(),
            password: self.password.clone(),
        })
    }
}

/// Registration form.
#[derive(Clone, Default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub accept_terms: bool,
}

impl fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterForm")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("accept_terms", &self.accept_terms)
            .finish_non_exhaustive()
    }
}

impl RegisterForm {
    /// Validate the form and build the request body.
    ///
    /// Checks run in the order the customer fills the form: required
    /// fields, email, matching passwords, password length, terms.
    ///
    /// # Errors
    ///
    /// Returns the first [`FormError`] found.
    pub fn validate(&self) -> Result<RegisterRequest, FormError> {
        if is_blank(&self.email)
            || self.password.is_empty()
            || is_blank(&self.first_name)
            || is_blank(&self.last_name)
        {
            return Err(FormError::MissingFields);
        }
        let email = parse_email(&self.email)?;
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError::PasswordTooShort);
        }
        if !self.accept_terms {
            return Err(FormError::TermsNotAccepted);
        }

        Ok(RegisterRequest {
            email: email.into_inner(),
            password: self.password.clone(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        })
    }
}

// =============================================================================
// Checkout form
// =============================================================================

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Pse,
    Cash,
}

impl PaymentMethod {
    /// Every method, in the order they are offered.
    pub const ALL: [Self; 3] = [Self::Card, Self::Pse, Self::Cash];

    /// Wire value sent to `POST /orders`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Pse => "pse",
            Self::Cash => "cash",
        }
    }

    /// Label shown to the customer.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Card => "Tarjeta de Crédito/Débito",
            Self::Pse => "PSE",
            Self::Cash => "Pago Contra Entrega",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "pse" => Ok(Self::Pse),
            "cash" => Ok(Self::Cash),
            _ => Err(FormError::InvalidPaymentMethod(s.to_string())),
        }
    }
}

/// Checkout form: contact, shipping address and payment method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
    pub payment_method: PaymentMethod,
}

/// A checkout form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCheckout {
    pub email: Email,
    pub address: PostalAddress,
    pub payment_method: PaymentMethod,
}

impl CheckoutForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns `FormError::MissingFields` if any field is blank, or
    /// `FormError::InvalidEmail` if the email is malformed.
    pub fn validate(&self) -> Result<ValidCheckout, FormError> {
        let required = [
            &self.email,
            &self.first_name,
            &self.last_name,
            &self.address,
            &self.city,
            &self.postal_code,
            &self.phone,
        ];
        if required.iter().any(|field| is_blank(field)) {
            return Err(FormError::MissingFields);
        }
        let email = parse_email(&self.email)?;

        let address = PostalAddress {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            address_line_1: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            phone: self.phone.trim().to_string(),
            ..PostalAddress::default()
        };

        Ok(ValidCheckout {
            email,
            address,
            payment_method: self.payment_method,
        })
    }
}
