use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SessionError;

/// The two actor types the client can be logged in as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Dispatcher,
    Vendor,
}

/// Backend routes that exist for both roles under different prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRoutes {
    pub login: &'static str,
    pub orders: &'static str,
    pub transactions: &'static str,
    pub save_push_token: &'static str,
    pub remove_push_token: &'static str,
}

const DISPATCHER_ROUTES: RoleRoutes = RoleRoutes {
    login: "/dispatch/login",
    orders: "/dispatch/orders",
    transactions: "/dispatch/transactions",
    save_push_token: "/dispatch/save-fcm-token",
    remove_push_token: "/dispatch/remove-fcm-token",
};

const VENDOR_ROUTES: RoleRoutes = RoleRoutes {
    login: "/vendor/login",
    orders: "/vendor/orders",
    transactions: "/vendor/transactions",
    save_push_token: "/vendor/save-fcm-token",
    remove_push_token: "/vendor/remove-fcm-token",
};

impl Role {
    pub const ALL: [Role; 2] = [Role::Dispatcher, Role::Vendor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Dispatcher => "dispatcher",
            Role::Vendor => "vendor",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Dispatcher => "Dispatcher",
            Role::Vendor => "Vendor",
        }
    }

    pub fn routes(&self) -> &'static RoleRoutes {
        match self {
            Role::Dispatcher => &DISPATCHER_ROUTES,
            Role::Vendor => &VENDOR_ROUTES,
        }
    }

    /// Vendors log in with a username, dispatchers with an email address.
    pub fn uses_username(&self) -> bool {
        matches!(self, Role::Vendor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SessionError;

    /// Exact match only; role strings are written by this client.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| SessionError::InvalidRole(s.to_string()))
    }
}
