//! Cache-then-network views over backend resources.
//!
//! A `ResourceView` shows the cached payload immediately, fetches in the
//! background, and on failure keeps showing what was cached. Only the most
//! recently started refresh may write; results of older ones are discarded.

pub mod kinds;

pub use kinds::{DispatcherOrders, Transactions, VendorDashboardResource, VendorItems, VendorOrders};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::cache::{CacheManager, CachedData};
use crate::models::{Order, OrderCollection};
use crate::notify::Notice;

/// A backend resource with a cache slot.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    type Payload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Cache slot name, stored as `cache.<key>`.
    fn key(&self) -> &'static str;

    /// Display name used in refresh notices, e.g. "Orders".
    fn label(&self) -> &'static str;

    /// Whether refreshes raise success/failure notices.
    fn notifies(&self) -> bool {
        true
    }

    async fn fetch(&self, api: &ApiClient) -> Result<Self::Payload, ApiError>;

    /// Runs after a successful fetch has been stored.
    fn on_fetched(&self, _api: &ApiClient, _payload: &Self::Payload) {}
}

/// Result of a refresh.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// The fetch succeeded and is now shown and cached.
    Fresh(T),
    /// The fetch failed; the cached payload (if any) is shown instead.
    Fallback { cached: Option<T>, error: ApiError },
    /// A newer refresh started before this one finished.
    Superseded,
}

impl<T> FetchOutcome<T> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, FetchOutcome::Fresh(_))
    }

    /// Whatever this refresh left on screen.
    pub fn data(&self) -> Option<&T> {
        match self {
            FetchOutcome::Fresh(data) => Some(data),
            FetchOutcome::Fallback { cached, .. } => cached.as_ref(),
            FetchOutcome::Superseded => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            FetchOutcome::Fallback { error, .. } => Some(error),
            _ => None,
        }
    }
}

pub struct ResourceView<R: Resource> {
    resource: R,
    api: ApiClient,
    cache: CacheManager,
    state: RwLock<Option<CachedData<R::Payload>>>,
    generation: AtomicU64,
}

impl<R: Resource> ResourceView<R> {
    pub fn new(resource: R, api: ApiClient) -> Self {
        let cache = CacheManager::new(api.session().kv().clone());
        Self {
            resource,
            api,
            cache,
            state: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Option<CachedData<R::Payload>>> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Option<CachedData<R::Payload>>> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The cached entry, treating unreadable entries as absent.
    fn load_cached(&self) -> Option<CachedData<R::Payload>> {
        match self.cache.load(self.resource.key()) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(cache = self.resource.key(), error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Show the cached payload, if any. No network.
    pub fn hydrate(&self) -> Option<R::Payload> {
        let cached = self.load_cached();
        let data = cached.as_ref().map(|entry| entry.data.clone());
        if cached.is_some() {
            *self.write_state() = cached;
        }
        data
    }

    pub fn current(&self) -> Option<R::Payload> {
        self.read_state().as_ref().map(|entry| entry.data.clone())
    }

    /// "Last updated" label for the payload on screen.
    pub fn last_updated(&self) -> Option<String> {
        self.read_state().as_ref().map(|entry| entry.age_display())
    }

    /// Fetch from the network, falling back to the cache on failure.
    pub async fn refresh(&self) -> FetchOutcome<R::Payload> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let key = self.resource.key();
        debug!(resource = key, generation, "Refreshing");

        let result = self.resource.fetch(&self.api).await;

        let mut state = self.write_state();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(resource = key, generation, "Discarding superseded refresh");
            return FetchOutcome::Superseded;
        }

        match result {
            Ok(payload) => {
                let entry = CachedData::new(payload.clone());
                if let Err(e) = self.cache.save_entry(key, &entry) {
                    warn!(cache = key, error = %e, "Failed to write cache");
                }
                *state = Some(entry);
                drop(state);

                self.resource.on_fetched(&self.api, &payload);
                if self.resource.notifies() {
                    self.api
                        .notifier()
                        .notify(Notice::success(format!("{} updated successfully!", self.resource.label())));
                }
                FetchOutcome::Fresh(payload)
            }
            Err(error) => {
                warn!(resource = key, error = %error, "Refresh failed, showing cached data");
                let cached = self.load_cached();
                let data = cached.as_ref().map(|entry| entry.data.clone());
                if cached.is_some() {
                    *state = cached;
                }
                drop(state);

                if self.resource.notifies() {
                    self.api.notifier().notify(Notice::error(format!(
                        "Failed to fetch {}!",
                        self.resource.label().to_lowercase()
                    )));
                }
                FetchOutcome::Fallback { cached: data, error }
            }
        }
    }

    /// The screen regained focus.
    pub async fn on_focus(&self) -> FetchOutcome<R::Payload> {
        self.refresh().await
    }

    /// Apply `edit` to the payload on screen and to the cached copy. The
    /// cache keeps its original timestamp. Returns whether either changed.
    pub fn patch<F>(&self, edit: F) -> Result<bool>
    where
        F: Fn(&mut R::Payload) -> bool,
    {
        let key = self.resource.key();
        let mut state = self.write_state();
        let shown = match state.as_mut() {
            Some(entry) => edit(&mut entry.data),
            None => false,
        };

        let stored = match self.cache.load::<R::Payload>(key)? {
            Some(mut entry) => {
                let changed = edit(&mut entry.data);
                if changed {
                    self.cache.save_entry(key, &entry)?;
                }
                changed
            }
            None => false,
        };
        Ok(shown || stored)
    }
}

impl<R> ResourceView<R>
where
    R: Resource,
    R::Payload: OrderCollection,
{
    /// Look an order up on screen, then in the cache.
    pub fn find_order(&self, id: i64) -> Option<Order> {
        if let Some(order) = self.read_state().as_ref().and_then(|e| e.data.find_order(id).cloned()) {
            return Some(order);
        }
        self.find_cached_order(id)
    }

    /// Look an order up in the cached list only.
    pub fn find_cached_order(&self, id: i64) -> Option<Order> {
        self.load_cached()?.data.find_order(id).cloned()
    }

    /// Set an order's status on screen and in the cache.
    pub fn patch_order(&self, id: i64, status: &str) -> Result<bool> {
        self.patch(|orders| orders.set_order_status(id, status))
    }
}
