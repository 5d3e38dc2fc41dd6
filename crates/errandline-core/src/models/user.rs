//! The logged-in account record.
//!
//! The login response carries a role-specific user object. Vendors and
//! dispatchers share a handful of fields; everything else is kept verbatim
//! so the persisted copy round-trips exactly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::de::{value_as_i64, value_as_string};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct UserData {
    pub id: Option<i64>,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    raw: Map<String, Value>,
}

impl UserData {
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.raw.get(field)
    }

    /// Best available display name for the account header.
    pub fn display_name(&self, fallback: &str) -> String {
        self.full_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl From<Map<String, Value>> for UserData {
    fn from(raw: Map<String, Value>) -> Self {
        let string_field = |names: &[&str]| {
            names.iter().find_map(|name| raw.get(*name).and_then(value_as_string))
        };
        Self {
            id: raw.get("id").and_then(value_as_i64),
            full_name: string_field(&["full_name", "fullname", "name"]),
            username: string_field(&["username"]),
            email: string_field(&["email"]),
            phone_number: string_field(&["phone_number", "phone"]),
            raw,
        }
    }
}

impl From<UserData> for Map<String, Value> {
    fn from(user: UserData) -> Self {
        user.raw
    }
}
