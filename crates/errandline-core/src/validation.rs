//! Client-side form checks. Nothing here touches the network; a request that
//! fails validation is never sent.

use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::Role;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Username must be at least 3 characters")]
    UsernameTooShort,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Amount must be a positive number.")]
    InvalidAmount,

    #[error("At least one price field is required")]
    NoPrice,

    #[error("Please enter a valid {0}")]
    InvalidPrice(&'static str),
}

/// Login form contents. Vendors sign in with a username, dispatchers with an
/// email address.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub role: Role,
    pub login: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(role: Role, login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            role,
            login: login.into(),
            password: password.into(),
        }
    }

    pub fn login_field(&self) -> &'static str {
        if self.role.uses_username() {
            "username"
        } else {
            "email"
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.login.trim().is_empty() {
            return Err(ValidationError::Required(if self.role.uses_username() {
                "Username"
            } else {
                "Email"
            }));
        }
        if self.password.trim().is_empty() {
            return Err(ValidationError::Required("Password"));
        }

        if self.role.uses_username() {
            if self.login.chars().count() < MIN_USERNAME_LEN {
                return Err(ValidationError::UsernameTooShort);
            }
        } else if !is_valid_email(&self.login) {
            return Err(ValidationError::InvalidEmail);
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        Ok(())
    }

    /// Request body for the role's login route.
    pub fn body(&self) -> Value {
        let mut body = json!({ "password": self.password });
        body[self.login_field()] = Value::String(self.login.clone());
        body
    }
}

/// `local@domain.tld` with no whitespace and a single `@`.
pub fn is_valid_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// A plain positive decimal such as `"1500"` or `"12.50"`. Signs, exponents
/// and separators are rejected.
pub fn parse_amount(input: &str) -> Result<f64, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::Required("Amount"));
    }

    let (whole, frac) = input.split_once('.').unwrap_or((input, ""));
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let shaped = digits_only(whole)
        && digits_only(frac)
        && (!frac.is_empty() || (!whole.is_empty() && !input.ends_with('.')));
    if !shaped {
        return Err(ValidationError::InvalidAmount);
    }

    match input.parse::<f64>() {
        Ok(amount) if amount > 0.0 => Ok(amount),
        _ => Err(ValidationError::InvalidAmount),
    }
}

/// Parse one optional price field. Blank means "not set"; anything else must
/// be a positive number.
pub fn parse_price(input: &str, field: &'static str) -> Result<Option<f64>, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    match input.parse::<f64>() {
        Ok(price) if price > 0.0 && price.is_finite() => Ok(Some(price)),
        _ => Err(ValidationError::InvalidPrice(field)),
    }
}
