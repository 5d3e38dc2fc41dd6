use serde::Deserialize;
use thiserror::Error;

/// Shown when the request never got a response.
pub const CONNECTIVITY_MESSAGE: &str =
    "Unable to connect to the server. Please check your internet connection.";

/// Shown when the server gave no usable message.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session expired or revoked")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// The `message` field of a JSON error body, if any.
    pub(crate) fn server_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }

    /// Map a non-success status to an error. Carries the server's message
    /// when the body has one; otherwise the message is empty.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::server_message(body).unwrap_or_default();
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            422 => ApiError::Validation(message),
            500..=599 => ApiError::ServerError(message),
            code => ApiError::Request { status: code, message },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// The request never produced an HTTP response.
    pub fn is_connectivity(&self) -> bool {
        match self {
            ApiError::Network(e) => !e.is_status() && !e.is_decode(),
            _ => false,
        }
    }

    /// Text for an error notification.
    pub fn user_message(&self) -> String {
        let message = match self {
            ApiError::Unauthorized => return "Session expired. Please log in again.".to_string(),
            ApiError::Network(_) => return CONNECTIVITY_MESSAGE.to_string(),
            ApiError::AccessDenied(m)
            | ApiError::NotFound(m)
            | ApiError::Validation(m)
            | ApiError::ServerError(m)
            | ApiError::Rejected(m)
            | ApiError::Request { message: m, .. } => m.as_str(),
            ApiError::InvalidResponse(_) | ApiError::Config(_) => "",
        };
        if message.is_empty() {
            GENERIC_MESSAGE.to_string()
        } else {
            message.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_maps_codes() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message": "Amount too low"}"#),
            ApiError::Validation(m) if m == "Amount too low"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>"),
            ApiError::ServerError(m) if m.is_empty()
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "{}"),
            ApiError::Request { status: 400, .. }
        ));
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ApiError::from_status(StatusCode::FORBIDDEN, r#"{"status": false, "message": " Not your order "}"#);
        assert_eq!(err.user_message(), "Not your order");

        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "oops");
        assert_eq!(err.user_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(400);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.ends_with("(truncated, 800 total bytes)"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }
}
