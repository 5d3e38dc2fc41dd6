//! Order state transitions driven by the user, and the error type shared by
//! user-initiated actions.
//!
//! Vendors move a paid order into processing; dispatchers mark an assigned
//! order completed. The cached list is only patched after the backend
//! acknowledges, so a failed request leaves both view and cache untouched.

use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::order::{STATUS_COMPLETED, STATUS_PROCESSING};
use crate::models::Order;
use crate::notify::Notice;
use crate::resource::{DispatcherOrders, ResourceView, VendorOrders};
use crate::validation::ValidationError;

pub const COMPLETE_ORDER_ROUTE: &str = "/dispatch/order-complete";

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Order not found")]
    OrderNotFound(i64),

    #[error("Transaction ID not found")]
    MissingTransactionId,

    #[error("Order cannot be {action} while {status:?}")]
    InvalidStatus { action: &'static str, status: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ActionError {
    pub fn user_message(&self) -> String {
        match self {
            ActionError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

pub fn process_route(order_id: i64) -> String {
    format!("/vendor/{}/process", order_id)
}

#[derive(Clone)]
pub struct OrderActions {
    api: ApiClient,
}

impl OrderActions {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn reject(&self, err: ActionError) -> ActionError {
        self.api.notifier().notify(Notice::error(err.user_message()));
        err
    }

    /// Vendor: start work on a paid order.
    pub async fn process_order(
        &self,
        view: &ResourceView<VendorOrders>,
        order_id: i64,
    ) -> Result<Order, ActionError> {
        let Some(mut order) = view.find_order(order_id) else {
            return Err(self.reject(ActionError::OrderNotFound(order_id)));
        };
        if !order.can_process() {
            return Err(self.reject(ActionError::InvalidStatus {
                action: "processed",
                status: order.status,
            }));
        }

        self.api
            .post_action(&process_route(order_id), None::<&()>)
            .await?;

        if let Err(e) = view.patch_order(order_id, STATUS_PROCESSING) {
            warn!(order_id, error = %e, "Order processed but cache update failed");
        }
        info!(order_id, "Order processed");
        self.api
            .notifier()
            .notify(Notice::success("Order processed successfully!"));
        order.status = STATUS_PROCESSING.to_string();
        Ok(order)
    }

    /// Dispatcher: mark an assigned order delivered.
    pub async fn complete_order(
        &self,
        view: &ResourceView<DispatcherOrders>,
        order_id: i64,
    ) -> Result<Order, ActionError> {
        let Some(mut order) = view.find_order(order_id) else {
            return Err(self.reject(ActionError::OrderNotFound(order_id)));
        };
        let Some(transaction_id) = order.transaction_id.clone().filter(|t| !t.is_empty()) else {
            return Err(self.reject(ActionError::MissingTransactionId));
        };
        if !order.can_complete() {
            return Err(self.reject(ActionError::InvalidStatus {
                action: "completed",
                status: order.status,
            }));
        }

        self.api
            .post_action(COMPLETE_ORDER_ROUTE, Some(&json!({ "trans_id": transaction_id })))
            .await?;

        if let Err(e) = view.patch_order(order_id, STATUS_COMPLETED) {
            warn!(order_id, error = %e, "Order completed but cache update failed");
        }
        info!(order_id, "Order completed");
        self.api
            .notifier()
            .notify(Notice::success("Order completed successfully!"));
        order.status = STATUS_COMPLETED.to_string();
        Ok(order)
    }
}
