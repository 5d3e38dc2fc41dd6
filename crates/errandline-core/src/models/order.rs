//! Orders as seen by vendors and dispatchers.
//!
//! Orders are created server-side; the client only reads them, except for the
//! two user-driven status transitions in `crate::orders`.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::de;

/// Vendor has been paid and may start work
pub const STATUS_PAYMENT_SUCCESSFUL: &str = "Payment Successful";
pub const STATUS_PROCESSING: &str = "Processing";
pub const STATUS_COMPLETED: &str = "Completed";
pub const STATUS_DELIVERED: &str = "Delivered";
pub const STATUS_CANCELLED: &str = "Cancelled";
/// Both spellings are produced by the backend.
pub const STATUS_DISPATCHER_ASSIGNED: [&str; 2] = ["Dispatcher Assigned", "Dispatched Assigned"];

/// Coarse status classification used for badges and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusGroup {
    Active,
    Completed,
    Cancelled,
    Other,
}

impl StatusGroup {
    pub fn of(status: &str) -> Self {
        const ACTIVE: [&str; 5] = [
            STATUS_PROCESSING,
            "Dispatcher Assigned",
            "Dispatched Assigned",
            "Make Payment",
            "Pending",
        ];
        if ACTIVE.contains(&status) {
            StatusGroup::Active
        } else if status == STATUS_COMPLETED || status == STATUS_DELIVERED {
            StatusGroup::Completed
        } else if status == STATUS_CANCELLED {
            StatusGroup::Cancelled
        } else {
            StatusGroup::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Restaurant,
    Laundry,
    Package,
    Errand,
    Other,
}

impl ServiceType {
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("restaurant") => ServiceType::Restaurant,
            Some("laundry") => ServiceType::Laundry,
            Some("package") => ServiceType::Package,
            Some("errand") => ServiceType::Errand,
            _ => ServiceType::Other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::opt_amount")]
    pub quantity: Option<f64>,
    #[serde(default, alias = "pricePerItem", deserialize_with = "de::opt_amount")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_amount")]
    pub total: Option<f64>,
}

impl OrderItem {
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("Item")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Area {
    #[serde(default)]
    pub title: Option<String>,
}

/// Receiver/sender details captured when the customer placed the order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDetails {
    #[serde(default)]
    pub receiver_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub receiver_phone: Option<String>,
    #[serde(default)]
    pub receiver_email: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub sender_phone: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub errand_location: Option<String>,
    #[serde(default)]
    pub dropoff_location: Option<String>,
    #[serde(default, deserialize_with = "de::opt_amount")]
    pub package_worth: Option<f64>,
    #[serde(default)]
    pub selected_errand_area: Option<Area>,
    #[serde(default)]
    pub selected_drop_off_area: Option<Area>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderVendor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderDispatcher {
    #[serde(default, alias = "fullname")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawOrder")]
pub struct Order {
    pub id: i64,
    pub status: String,
    pub service_type: Option<String>,
    pub transaction_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub form_details: Option<FormDetails>,
    pub total_amount: Option<f64>,
    pub item_amount: Option<f64>,
    pub delivery_fee: Option<f64>,
    pub delivery_landmark: Option<String>,
    pub vendor: Option<OrderVendor>,
    pub dispatcher: Option<OrderDispatcher>,
    pub created_at: Option<String>,
}

/// Wire shape of an order. Some endpoints send `items`, others `cart_items`;
/// both are accepted and folded into `Order::items`.
#[derive(Deserialize)]
struct RawOrder {
    #[serde(deserialize_with = "de::id")]
    id: i64,
    #[serde(default, deserialize_with = "de::opt_string")]
    status: Option<String>,
    #[serde(default)]
    service_type: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    transaction_id: Option<String>,
    #[serde(default)]
    items: Option<Vec<OrderItem>>,
    #[serde(default)]
    cart_items: Option<Vec<OrderItem>>,
    #[serde(default, deserialize_with = "de::embedded_json")]
    form_details: Option<FormDetails>,
    #[serde(default, alias = "totalAmount", deserialize_with = "de::opt_amount")]
    total_amount: Option<f64>,
    #[serde(default, alias = "itemAmount", deserialize_with = "de::opt_amount")]
    item_amount: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_amount")]
    delivery_fee: Option<f64>,
    #[serde(default)]
    delivery_landmark: Option<String>,
    #[serde(default)]
    vendor: Option<OrderVendor>,
    #[serde(default)]
    dispatcher: Option<OrderDispatcher>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<RawOrder> for Order {
    fn from(raw: RawOrder) -> Self {
        let items = match (raw.items, raw.cart_items) {
            (Some(items), _) if !items.is_empty() => items,
            (_, Some(cart)) => cart,
            (items, None) => items.unwrap_or_default(),
        };
        Self {
            id: raw.id,
            status: raw.status.unwrap_or_default(),
            service_type: raw.service_type,
            transaction_id: raw.transaction_id,
            items,
            form_details: raw.form_details,
            total_amount: raw.total_amount,
            item_amount: raw.item_amount,
            delivery_fee: raw.delivery_fee,
            delivery_landmark: raw.delivery_landmark,
            vendor: raw.vendor,
            dispatcher: raw.dispatcher,
            created_at: raw.created_at,
        }
    }
}

impl Order {
    pub fn status_group(&self) -> StatusGroup {
        StatusGroup::of(&self.status)
    }

    pub fn service(&self) -> ServiceType {
        ServiceType::parse(self.service_type.as_deref())
    }

    /// Vendors may only start work once payment has cleared.
    pub fn can_process(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_PAYMENT_SUCCESSFUL)
    }

    /// Dispatchers complete orders assigned to them.
    pub fn can_complete(&self) -> bool {
        STATUS_DISPATCHER_ASSIGNED.contains(&self.status.as_str())
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref()?)
    }

    pub fn receiver_phone(&self) -> Option<&str> {
        self.form_details.as_ref()?.receiver_phone.as_deref()
    }

    /// One-line summary of the order contents, e.g. `"Shirt (x2)"` or
    /// `"Shirt +2 more"`.
    pub fn items_summary(&self) -> String {
        match self.items.as_slice() {
            [] => "No items".to_string(),
            [item] => format!("{} (x{})", item.label(), quantity_display(item.quantity)),
            [first, rest @ ..] => format!("{} +{} more", first.label(), rest.len()),
        }
    }
}

fn quantity_display(quantity: Option<f64>) -> String {
    match quantity {
        Some(q) if q.fract() == 0.0 && q > 0.0 => format!("{}", q as i64),
        Some(q) if q > 0.0 => format!("{}", q),
        _ => "1".to_string(),
    }
}

/// Parse the backend's timestamps: RFC 3339, or `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Sort newest first; orders without a parseable timestamp go last.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| match (a.created_at_utc(), b.created_at_utc()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Anything that holds a list of orders and can have one patched in place.
pub trait OrderCollection {
    fn orders(&self) -> &[Order];
    fn orders_mut(&mut self) -> &mut Vec<Order>;

    fn find_order(&self, id: i64) -> Option<&Order> {
        self.orders().iter().find(|o| o.id == id)
    }

    /// Replace the status of order `id`. Returns whether an order was found.
    fn set_order_status(&mut self, id: i64, status: &str) -> bool {
        match self.orders_mut().iter_mut().find(|o| o.id == id) {
            Some(order) => {
                order.status = status.to_string();
                true
            }
            None => false,
        }
    }
}

impl OrderCollection for Vec<Order> {
    fn orders(&self) -> &[Order] {
        self
    }

    fn orders_mut(&mut self) -> &mut Vec<Order> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: i64, status: &str, created_at: Option<&str>) -> Order {
        Order {
            id,
            status: status.to_string(),
            service_type: None,
            transaction_id: None,
            items: Vec::new(),
            form_details: None,
            total_amount: None,
            item_amount: None,
            delivery_fee: None,
            delivery_landmark: None,
            vendor: None,
            dispatcher: None,
            created_at: created_at.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_order_with_cart_items_and_string_form_details() {
        let json = r#"{
            "id": "12",
            "status": "Payment Successful",
            "service_type": "Laundry",
            "transaction_id": 884213,
            "cart_items": [{"name": "Shirt", "quantity": 2, "pricePerItem": "500"}],
            "form_details": "{\"receiverName\":\"Bola\",\"receiverPhone\":8031234567}",
            "total_amount": "1500.00",
            "created_at": "2024-12-05T18:10:00.000000Z"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, 12);
        assert_eq!(order.transaction_id.as_deref(), Some("884213"));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].price, Some(500.0));
        assert_eq!(order.total_amount, Some(1500.0));
        assert_eq!(order.receiver_phone(), Some("8031234567"));
        assert_eq!(order.service(), ServiceType::Laundry);
        assert!(order.can_process());
        assert!(!order.can_complete());
    }

    #[test]
    fn test_items_preferred_over_cart_items() {
        let json = r#"{"id": 1, "items": [{"name": "Rice"}], "cart_items": [{"name": "Beans"}]}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.items[0].label(), "Rice");
        assert_eq!(order.status, "");
    }

    #[test]
    fn test_cached_order_round_trips() {
        let json = r#"{"id": 3, "status": "Processing", "cart_items": [{"description": "Parcel"}],
                       "form_details": {"receiverName": "Bola"}}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        let cached = serde_json::to_string(&order).unwrap();
        let restored: Order = serde_json::from_str(&cached).unwrap();
        assert_eq!(order, restored);
    }

    #[test]
    fn test_items_summary() {
        let mut o = order(1, "Pending", None);
        assert_eq!(o.items_summary(), "No items");

        o.items.push(OrderItem { name: Some("Shirt".into()), quantity: Some(2.0), ..Default::default() });
        assert_eq!(o.items_summary(), "Shirt (x2)");

        o.items.push(OrderItem::default());
        o.items.push(OrderItem::default());
        assert_eq!(o.items_summary(), "Shirt +2 more");
    }

    #[test]
    fn test_status_group() {
        assert_eq!(StatusGroup::of("Processing"), StatusGroup::Active);
        assert_eq!(StatusGroup::of("Dispatched Assigned"), StatusGroup::Active);
        assert_eq!(StatusGroup::of("Delivered"), StatusGroup::Completed);
        assert_eq!(StatusGroup::of("Cancelled"), StatusGroup::Cancelled);
        assert_eq!(StatusGroup::of("Payment Successful"), StatusGroup::Other);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut orders = vec![
            order(1, "", Some("2024-12-01T10:00:00Z")),
            order(2, "", None),
            order(3, "", Some("2024-12-05 08:30:00")),
        ];
        sort_newest_first(&mut orders);
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_set_order_status() {
        let mut orders = vec![order(1, "Payment Successful", None), order(2, "Pending", None)];
        assert!(orders.set_order_status(1, STATUS_PROCESSING));
        assert!(!orders.set_order_status(99, STATUS_PROCESSING));
        assert_eq!(orders.find_order(1).unwrap().status, "Processing");
        assert_eq!(orders.find_order(2).unwrap().status, "Pending");
    }
}
