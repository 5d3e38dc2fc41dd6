//! Vendor account operations: catalogue prices and payouts.
//!
//! Callers refresh the `vendor_items` view after a successful item change;
//! nothing here touches the cache.

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::api::{Ack, ApiClient, ApiError};
use crate::models::ItemPrice;
use crate::notify::Notice;
use crate::orders::ActionError;
use crate::validation::{parse_amount, parse_price, ValidationError};

pub const WITHDRAW_ROUTE: &str = "/vendor/sendMoney";

pub fn item_price_route(item_id: i64) -> String {
    format!("/vendor/vendoritem/{}", item_id)
}

pub fn delete_item_route(item_id: i64) -> String {
    format!("/vendor/{}", item_id)
}

/// A validated new price for a catalogue item.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceUpdate(ItemPrice);

impl PriceUpdate {
    /// One price for the item. Must be positive.
    pub fn flat(price: &str) -> Result<Self, ValidationError> {
        match parse_price(price, "price")? {
            Some(price) => Ok(Self(ItemPrice::Flat(price))),
            None => Err(ValidationError::InvalidPrice("price")),
        }
    }

    /// Per-service laundry prices. Blank fields are left unchanged; at least
    /// one must be given.
    pub fn laundry(wash: &str, iron: &str, starch: &str) -> Result<Self, ValidationError> {
        if [wash, iron, starch].iter().all(|p| p.trim().is_empty()) {
            return Err(ValidationError::NoPrice);
        }
        Ok(Self(ItemPrice::Laundry {
            wash: parse_price(wash, "wash price")?,
            iron: parse_price(iron, "iron price")?,
            starch: parse_price(starch, "starch price")?,
        }))
    }

    pub fn price(&self) -> &ItemPrice {
        &self.0
    }

    pub fn body(&self) -> Value {
        match &self.0 {
            ItemPrice::Flat(price) => json!({ "price": price }),
            ItemPrice::Laundry { wash, iron, starch } => {
                let mut body = Map::new();
                for (name, price) in [("wash", wash), ("iron", iron), ("starch", starch)] {
                    if let Some(price) = price {
                        body.insert(name.to_string(), json!(price));
                    }
                }
                Value::Object(body)
            }
        }
    }
}

#[derive(Clone)]
pub struct VendorService {
    api: ApiClient,
}

impl VendorService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn notify_success(&self, message: impl Into<String>) {
        self.api.notifier().notify(Notice::success(message));
    }

    pub async fn update_item_price(&self, item_id: i64, update: &PriceUpdate) -> Result<Ack, ActionError> {
        let ack = self.api.put_action(&item_price_route(item_id), &update.body()).await?;
        info!(item_id, "Item price updated");
        self.notify_success("Item updated successfully!");
        Ok(ack)
    }

    pub async fn delete_item(&self, item_id: i64) -> Result<Ack, ActionError> {
        let ack = self.api.delete_action(&delete_item_route(item_id)).await?;
        info!(item_id, "Item deleted");
        self.notify_success("Item deleted successfully!");
        Ok(ack)
    }

    /// Request a payout of `amount` to the vendor's bank account. A 2xx
    /// answer with `status: false` is a refusal, not a payout.
    pub async fn withdraw(&self, amount: &str) -> Result<Ack, ActionError> {
        if let Err(e) = parse_amount(amount) {
            self.api.notifier().notify(Notice::error(e.to_string()));
            return Err(e.into());
        }
        let ack = self
            .api
            .post_action(WITHDRAW_ROUTE, Some(&json!({ "amount": amount.trim() })))
            .await?;
        if ack.is_rejected() {
            let err = ApiError::Rejected(ack.message.unwrap_or_default());
            warn!(error = %err, "Withdrawal rejected");
            self.api.notifier().notify(Notice::error(err.user_message()));
            return Err(err.into());
        }
        info!("Withdrawal requested");
        self.notify_success(ack.message.clone().unwrap_or_else(|| "Transfer successful".to_string()));
        Ok(ack)
    }
}
