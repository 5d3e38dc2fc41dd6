use thiserror::Error;

use crate::api::ApiError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid user role: {0:?}")]
    InvalidRole(String),

    #[error("Invalid login details: {0}")]
    Validation(#[from] ValidationError),

    #[error("Login failed: {0}")]
    Api(#[from] ApiError),

    #[error("Login response did not include {0}")]
    MissingField(&'static str),

    #[error("Failed to persist session: {0}")]
    Storage(#[source] anyhow::Error),
}

impl SessionError {
    /// Message suitable for showing on the login screen.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Validation(e) => e.to_string(),
            SessionError::Api(e) => e.user_message(),
            SessionError::InvalidRole(_) | SessionError::MissingField(_) | SessionError::Storage(_) => {
                "Authentication setup failed. Please try again.".to_string()
            }
        }
    }
}
