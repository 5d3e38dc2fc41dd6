//! Vendor-side payloads: catalogue items, order book and dashboard.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::de::{self, value_as_f64};
use super::order::{Order, OrderCollection};
use super::user::UserData;

/// Item price. Laundry vendors price each service separately; everyone else
/// has one flat price.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemPrice {
    Flat(f64),
    Laundry {
        #[serde(skip_serializing_if = "Option::is_none")]
        wash: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        iron: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        starch: Option<f64>,
    },
}

impl<'de> Deserialize<'de> for ItemPrice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let value = Value::deserialize(deserializer)?;
        if let Value::Object(map) = &value {
            let service = |name: &str| map.get(name).and_then(value_as_f64);
            return Ok(ItemPrice::Laundry {
                wash: service("wash"),
                iron: service("iron"),
                starch: service("starch"),
            });
        }
        value_as_f64(&value)
            .map(ItemPrice::Flat)
            .ok_or_else(|| D::Error::custom(format!("invalid item price: {}", value)))
    }
}

impl ItemPrice {
    /// Price lines for display, e.g. `[("Wash", 500.0), ("Iron", 300.0)]`.
    pub fn lines(&self) -> Vec<(&'static str, f64)> {
        match self {
            ItemPrice::Flat(price) => vec![("Price", *price)],
            ItemPrice::Laundry { wash, iron, starch } => [("Wash", wash), ("Iron", iron), ("Starch", starch)]
                .into_iter()
                .filter_map(|(label, price)| price.map(|p| (label, p)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorItem {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<ItemPrice>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Vendor record returned by `/vendor/show`, including the item catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorProfile {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "serviceType")]
    pub service_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "de::null_default")]
    pub items: Vec<VendorItem>,
}

impl VendorProfile {
    pub fn is_laundry(&self) -> bool {
        self.service_type
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("laundry"))
            .unwrap_or(false)
    }
}

/// The vendor order list with its aggregate stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorOrderBook {
    #[serde(default, deserialize_with = "de::null_default")]
    pub orders: Vec<Order>,
    #[serde(default, alias = "totalOrderCount", deserialize_with = "de::count")]
    pub total_order_count: u64,
    #[serde(default, alias = "totalAmountSpent", deserialize_with = "de::opt_amount")]
    pub total_amount_spent: Option<f64>,
}

impl OrderCollection for VendorOrderBook {
    fn orders(&self) -> &[Order] {
        &self.orders
    }

    fn orders_mut(&mut self) -> &mut Vec<Order> {
        &mut self.orders
    }
}

/// Vendor home screen: refreshed account record plus recent orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorDashboard {
    #[serde(default)]
    pub user: Option<UserData>,
    #[serde(default, deserialize_with = "de::null_default")]
    pub orders: Vec<Order>,
}

impl OrderCollection for VendorDashboard {
    fn orders(&self) -> &[Order] {
        &self.orders
    }

    fn orders_mut(&mut self) -> &mut Vec<Order> {
        &mut self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vendor_profile_with_mixed_prices() {
        let json = r#"{
            "id": 4,
            "name": "Fresh Fold",
            "serviceType": "Laundry",
            "items": [
                {"id": 1, "name": "Shirt", "price": {"wash": "500", "iron": 300}},
                {"id": 2, "name": "Duvet", "price": "2500.00"},
                {"id": 3, "name": "Cap", "price": null}
            ]
        }"#;
        let vendor: VendorProfile = serde_json::from_str(json).unwrap();
        assert!(vendor.is_laundry());
        assert_eq!(vendor.items.len(), 3);
        assert_eq!(
            vendor.items[0].price,
            Some(ItemPrice::Laundry { wash: Some(500.0), iron: Some(300.0), starch: None })
        );
        assert_eq!(vendor.items[1].price, Some(ItemPrice::Flat(2500.0)));
        assert_eq!(vendor.items[2].price, None);
        assert_eq!(
            vendor.items[0].price.as_ref().unwrap().lines(),
            vec![("Wash", 500.0), ("Iron", 300.0)]
        );
    }

    #[test]
    fn test_parse_order_book_stats() {
        let json = r#"{"orders": null, "totalOrderCount": 7, "totalAmountSpent": "10250.50"}"#;
        let book: VendorOrderBook = serde_json::from_str(json).unwrap();
        assert!(book.orders.is_empty());
        assert_eq!(book.total_order_count, 7);
        assert_eq!(book.total_amount_spent, Some(10250.5));
    }

    #[test]
    fn test_parse_order_book_count_as_string_or_null() {
        let book: VendorOrderBook =
            serde_json::from_str(r#"{"orders": [], "totalOrderCount": "12"}"#).unwrap();
        assert_eq!(book.total_order_count, 12);

        let book: VendorOrderBook =
            serde_json::from_str(r#"{"orders": [], "totalOrderCount": null}"#).unwrap();
        assert_eq!(book.total_order_count, 0);
    }

    #[test]
    fn test_item_price_round_trips_through_cache() {
        let price = ItemPrice::Laundry { wash: Some(500.0), iron: None, starch: Some(100.0) };
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(serde_json::from_str::<ItemPrice>(&json).unwrap(), price);
    }
}
