//! Data models for marketplace entities.
//!
//! This module contains the typed payloads exchanged with the backend:
//!
//! - `Order`, `OrderItem`, `FormDetails`: orders as vendors and dispatchers see them
//! - `Transaction`: payment history entries
//! - `VendorItem`, `VendorProfile`, `VendorOrderBook`, `VendorDashboard`: vendor views
//! - `UserData`: the logged-in account record
//!
//! Loosely-typed backend fields (numeric strings, alternate field names,
//! JSON-in-a-string) are normalized during deserialization, never later.

pub mod de;
pub mod order;
pub mod transaction;
pub mod user;
pub mod vendor;

pub use order::{
    sort_newest_first, FormDetails, Order, OrderCollection, OrderItem, ServiceType, StatusGroup,
};
pub use transaction::Transaction;
pub use user::UserData;
pub use vendor::{ItemPrice, VendorDashboard, VendorItem, VendorOrderBook, VendorProfile};
