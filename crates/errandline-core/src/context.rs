//! Application wiring.
//!
//! `AppContext` builds the service graph once at startup so every front end
//! shares one session store, one HTTP client and one notifier.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::auth::{Role, SessionManager, SessionState, SessionStore};
use crate::cache::CacheManager;
use crate::config::Config;
use crate::notify::Notifier;
use crate::orders::OrderActions;
use crate::push::{DeviceRegistrar, PushService};
use crate::resource::{
    DispatcherOrders, ResourceView, Transactions, VendorDashboardResource, VendorItems, VendorOrders,
};
use crate::store::KeyValueStore;
use crate::vendor::VendorService;

#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub api: ApiClient,
    pub session: SessionManager,
    pub push: PushService,
    pub orders: OrderActions,
    pub vendor: VendorService,
    pub cache: CacheManager,
}

impl AppContext {
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        registrar: Arc<dyn DeviceRegistrar>,
    ) -> Result<Self> {
        let session_store =
            Arc::new(SessionStore::new(store.clone()).with_cache_purge(config.clear_cache_on_logout));
        let api = ApiClient::new(&config, session_store, notifier).context("Failed to create API client")?;
        let push = PushService::new(api.clone(), registrar);
        let session = SessionManager::new(api.clone(), push.clone());

        Ok(Self {
            orders: OrderActions::new(api.clone()),
            vendor: VendorService::new(api.clone()),
            cache: CacheManager::new(store),
            config,
            api,
            session,
            push,
        })
    }

    /// Startup sequence: obtain a device token if possible, then restore the
    /// session. Push failures never block the restore.
    pub async fn boot(&self) -> SessionState {
        match self.push.initialize().await {
            Ok(token) => debug!(has_token = token.is_some(), "Push initialized"),
            Err(e) => warn!(error = %e, "Push initialization failed"),
        }
        self.session.check_auth_status().await
    }

    pub fn role(&self) -> Option<Role> {
        self.session.snapshot().logged_in_role()
    }

    pub fn vendor_orders(&self) -> ResourceView<VendorOrders> {
        ResourceView::new(VendorOrders, self.api.clone())
    }

    pub fn dispatcher_orders(&self) -> ResourceView<DispatcherOrders> {
        ResourceView::new(DispatcherOrders, self.api.clone())
    }

    pub fn vendor_dashboard(&self) -> ResourceView<VendorDashboardResource> {
        ResourceView::new(VendorDashboardResource, self.api.clone())
    }

    pub fn vendor_items(&self) -> ResourceView<VendorItems> {
        ResourceView::new(VendorItems, self.api.clone())
    }

    pub fn transactions(&self, role: Role) -> ResourceView<Transactions> {
        ResourceView::new(Transactions::new(role), self.api.clone())
    }
}
