//! Client core for the errandline marketplace.
//!
//! Vendors and dispatchers log in against the backend, browse orders,
//! transactions and catalogue items with an offline cache, move orders through
//! their lifecycle and request payouts. Front ends drive everything through
//! [`context::AppContext`] and receive user-facing messages via
//! [`notify::Notifier`].

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod models;
pub mod notify;
pub mod orders;
pub mod push;
pub mod resource;
pub mod store;
pub mod utils;
pub mod validation;
pub mod vendor;

pub use context::AppContext;
