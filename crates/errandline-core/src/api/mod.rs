//! REST API client module for the marketplace backend.
//!
//! This module provides the `ApiClient` through which every backend call is
//! made. Requests carry a bearer token read from the session store; responses
//! use a `{status, data, message}` envelope.

pub mod client;
pub mod error;

pub use client::{Ack, ApiClient, Auth, Envelope, LOGGED_OUT_MESSAGE};
pub use error::{ApiError, CONNECTIVITY_MESSAGE, GENERIC_MESSAGE};
