//! Local caching module for offline data access.
//!
//! This module provides the `CacheManager` for storing the last successful
//! fetch of each resource. Entries live in the shared key-value store as
//! timestamped JSON and are never considered stale; the timestamp only feeds
//! "last updated" labels.

pub mod manager;

pub use manager::{CacheAges, CacheManager, CachedData};
