//! The concrete resources each role's screens show.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::api::{ApiClient, ApiError};
use crate::auth::Role;
use crate::models::{sort_newest_first, Order, Transaction, VendorDashboard, VendorOrderBook, VendorProfile};

use super::Resource;

pub const VENDOR_DASHBOARD_ROUTE: &str = "/vendor/dashboard";
pub const VENDOR_SHOW_ROUTE: &str = "/vendor/show";

// ===== Vendor Orders =====

#[derive(Debug, Default, Clone, Copy)]
pub struct VendorOrders;

#[async_trait]
impl Resource for VendorOrders {
    type Payload = VendorOrderBook;

    fn key(&self) -> &'static str {
        "vendor_orders"
    }

    fn label(&self) -> &'static str {
        "Orders"
    }

    async fn fetch(&self, api: &ApiClient) -> Result<VendorOrderBook, ApiError> {
        let mut book: VendorOrderBook = api.get(Role::Vendor.routes().orders).await?;
        sort_newest_first(&mut book.orders);
        Ok(book)
    }
}

// ===== Dispatcher Orders =====

/// The dispatcher order list arrives either bare or wrapped in `{orders}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum DispatcherOrderList {
    Bare(Vec<Order>),
    Wrapped { orders: Vec<Order> },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DispatcherOrders;

#[async_trait]
impl Resource for DispatcherOrders {
    type Payload = Vec<Order>;

    fn key(&self) -> &'static str {
        "dispatcher_orders"
    }

    fn label(&self) -> &'static str {
        "Orders"
    }

    async fn fetch(&self, api: &ApiClient) -> Result<Vec<Order>, ApiError> {
        let list: DispatcherOrderList = api.get(Role::Dispatcher.routes().orders).await?;
        let mut orders = match list {
            DispatcherOrderList::Bare(orders) | DispatcherOrderList::Wrapped { orders } => orders,
        };
        sort_newest_first(&mut orders);
        Ok(orders)
    }
}

// ===== Vendor Dashboard =====

/// Vendor home screen. Refreshes quietly and keeps the stored account
/// record in step with the server's copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct VendorDashboardResource;

#[async_trait]
impl Resource for VendorDashboardResource {
    type Payload = VendorDashboard;

    fn key(&self) -> &'static str {
        "vendor_dashboard"
    }

    fn label(&self) -> &'static str {
        "Dashboard"
    }

    fn notifies(&self) -> bool {
        false
    }

    async fn fetch(&self, api: &ApiClient) -> Result<VendorDashboard, ApiError> {
        let mut dashboard: VendorDashboard = api.get(VENDOR_DASHBOARD_ROUTE).await?;
        sort_newest_first(&mut dashboard.orders);
        Ok(dashboard)
    }

    fn on_fetched(&self, api: &ApiClient, payload: &VendorDashboard) {
        if let Some(user) = &payload.user {
            if let Err(e) = api.session().update_user(user) {
                warn!(error = %e, "Failed to store refreshed account record");
            }
        }
    }
}

// ===== Vendor Items =====

#[derive(Deserialize)]
struct VendorShow {
    vendor: VendorProfile,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VendorItems;

#[async_trait]
impl Resource for VendorItems {
    type Payload = VendorProfile;

    fn key(&self) -> &'static str {
        "vendor_items"
    }

    fn label(&self) -> &'static str {
        "Items"
    }

    async fn fetch(&self, api: &ApiClient) -> Result<VendorProfile, ApiError> {
        let show: VendorShow = api.get(VENDOR_SHOW_ROUTE).await?;
        Ok(show.vendor)
    }
}

// ===== Transactions =====

/// Payment history for one role.
#[derive(Debug, Clone, Copy)]
pub struct Transactions {
    role: Role,
}

impl Transactions {
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

#[async_trait]
impl Resource for Transactions {
    type Payload = Vec<Transaction>;

    fn key(&self) -> &'static str {
        match self.role {
            Role::Dispatcher => "dispatcher_transactions",
            Role::Vendor => "vendor_transactions",
        }
    }

    fn label(&self) -> &'static str {
        "Transactions"
    }

    async fn fetch(&self, api: &ApiClient) -> Result<Vec<Transaction>, ApiError> {
        api.get(self.role.routes().transactions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionStore;
    use crate::models::UserData;
    use crate::notify::LogNotifier;
    use crate::resource::ResourceView;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(route: &str, data: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": true, "data": data})))
            .mount(&server)
            .await;
        server
    }

    fn api(base_url: &str) -> ApiClient {
        let session = Arc::new(SessionStore::new(Arc::new(MemoryStore::new())));
        ApiClient::with_base_url(base_url, Duration::from_secs(5), session, Arc::new(LogNotifier)).unwrap()
    }

    #[tokio::test]
    async fn test_vendor_orders_sorted_newest_first() {
        let server = serve(
            "/vendor/orders",
            json!({
                "orders": [
                    {"id": 1, "status": "Completed", "created_at": "2024-12-01T10:00:00.000000Z"},
                    {"id": 2, "status": "Payment Successful", "created_at": "2024-12-03T10:00:00.000000Z"}
                ],
                "totalOrderCount": 2,
                "totalAmountSpent": "4500.00"
            }),
        )
        .await;

        let book = VendorOrders.fetch(&api(&server.uri())).await.unwrap();
        assert_eq!(book.orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(book.total_amount_spent, Some(4500.0));
    }

    #[tokio::test]
    async fn test_dispatcher_orders_accepts_both_shapes() {
        let bare = serve("/dispatch/orders", json!([{"id": 5, "status": "Dispatcher Assigned"}])).await;
        assert_eq!(DispatcherOrders.fetch(&api(&bare.uri())).await.unwrap()[0].id, 5);

        let wrapped = serve("/dispatch/orders", json!({"orders": [{"id": 6}]})).await;
        assert_eq!(DispatcherOrders.fetch(&api(&wrapped.uri())).await.unwrap()[0].id, 6);
    }

    #[tokio::test]
    async fn test_vendor_items_unwraps_vendor() {
        let server = serve(
            "/vendor/show",
            json!({"vendor": {"id": 4, "name": "Fresh Fold", "items": [{"id": 1, "price": 200}]}}),
        )
        .await;
        let profile = VendorItems.fetch(&api(&server.uri())).await.unwrap();
        assert_eq!(profile.items.len(), 1);
    }

    #[tokio::test]
    async fn test_dashboard_refresh_updates_stored_user() {
        let server = serve(
            "/vendor/dashboard",
            json!({"user": {"id": 9, "name": "Mama Put"}, "orders": []}),
        )
        .await;
        let api = api(&server.uri());
        api.session()
            .persist(&UserData::default(), "tok", Role::Vendor)
            .unwrap();

        let view = ResourceView::new(VendorDashboardResource, api.clone());
        assert!(view.refresh().await.is_fresh());

        let user = api.session().snapshot().user.unwrap();
        assert_eq!(user.id, Some(9));
        assert_eq!(user.full_name.as_deref(), Some("Mama Put"));
    }

    #[test]
    fn test_transactions_key_per_role() {
        assert_eq!(Transactions::new(Role::Vendor).key(), "vendor_transactions");
        assert_eq!(Transactions::new(Role::Dispatcher).key(), "dispatcher_transactions");
    }
}
