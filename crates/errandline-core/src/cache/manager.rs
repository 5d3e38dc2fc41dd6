use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::auth::Role;
use crate::store::KeyValueStore;

/// Prefix for cache entries inside the key-value store.
pub const CACHE_PREFIX: &str = "cache.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Negative means clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Last-successful-fetch payloads, stored as timestamped JSON under
/// `cache.<name>` in the shared key-value store.
///
/// Entries never expire. They are replaced by a newer fetch, patched in place
/// by order actions, or purged with the session.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn cache_key(name: &str) -> String {
        format!("{}{}", CACHE_PREFIX, name)
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let Some(contents) = self.store.get(&Self::cache_key(name))? else {
            return Ok(None);
        };

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache entry: {}", name))?;

        Ok(Some(cached))
    }

    /// Store `data` stamped with the current time.
    pub fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        self.save_entry(name, &CachedData::new(data))
    }

    /// Store an entry keeping its existing timestamp.
    pub fn save_entry<T: Serialize>(&self, name: &str, entry: &CachedData<T>) -> Result<()> {
        let contents = serde_json::to_string(entry)
            .with_context(|| format!("Failed to serialize cache entry: {}", name))?;
        self.store.set(&Self::cache_key(name), &contents)?;
        debug!(cache = name, bytes = contents.len(), "Cache entry written");
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        self.store.remove(&Self::cache_key(name))
    }

    /// Remove every cache entry. Returns how many were removed.
    pub fn purge(&self) -> Result<usize> {
        let keys: Vec<String> = self
            .store
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(CACHE_PREFIX))
            .collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.store.multi_remove(&refs)?;
        Ok(keys.len())
    }

    // ===== Cache Age Information =====

    /// Age of an entry for "last updated" display; unreadable entries count
    /// as absent.
    pub fn cache_age(&self, name: &str) -> Option<String> {
        match self.load::<serde_json::Value>(name) {
            Ok(Some(cached)) => Some(cached.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(cache = name, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    pub fn get_cache_ages(&self, role: Role) -> CacheAges {
        let prefix = role.as_str();
        CacheAges {
            orders: self.cache_age(&format!("{}_orders", prefix)),
            transactions: self.cache_age(&format!("{}_transactions", prefix)),
            dashboard: match role {
                Role::Vendor => self.cache_age("vendor_dashboard"),
                Role::Dispatcher => None,
            },
            items: match role {
                Role::Vendor => self.cache_age("vendor_items"),
                Role::Dispatcher => None,
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheAges {
    pub orders: Option<String>,
    pub transactions: Option<String>,
    pub dashboard: Option<String>,
    pub items: Option<String>,
}

impl CacheAges {
    pub fn orders_age(&self) -> String {
        self.orders.clone().unwrap_or_else(|| "never".to_string())
    }

    /// The first known age across resources, or "never".
    pub fn last_updated(&self) -> String {
        [&self.orders, &self.dashboard, &self.transactions, &self.items]
            .into_iter()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "never".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
