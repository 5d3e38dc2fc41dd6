//! Push notification registration.
//!
//! The device token comes from the platform's push provider through a
//! `DeviceRegistrar`. `PushService` keeps two bookkeeping keys in the store
//! (`fcm_token` and `fcm_token_sent`) and reports the token to the backend
//! under the logged-in role's route. Every operation here is a side effect
//! of the session lifecycle; callers log failures and carry on.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::store::KeyValueStore;

/// Device push token as last obtained from the registrar.
pub const KEY_DEVICE_TOKEN: &str = "fcm_token";

/// `"true"` once the backend has accepted the device token.
pub const KEY_TOKEN_SENT: &str = "fcm_token_sent";

/// Source of device push tokens.
#[async_trait]
pub trait DeviceRegistrar: Send + Sync {
    /// Obtain a push token. `Ok(None)` means push is unavailable here, e.g.
    /// permission was denied or the device cannot receive pushes.
    async fn register(&self) -> Result<Option<String>>;
}

/// Registrar for hosts without a push provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedRegistrar;

#[async_trait]
impl DeviceRegistrar for UnsupportedRegistrar {
    async fn register(&self) -> Result<Option<String>> {
        debug!("Push notifications unsupported on this host");
        Ok(None)
    }
}

/// Registrar that hands out a token supplied up front.
#[derive(Debug, Clone)]
pub struct StaticRegistrar {
    token: String,
}

impl StaticRegistrar {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl DeviceRegistrar for StaticRegistrar {
    async fn register(&self) -> Result<Option<String>> {
        Ok(Some(self.token.clone()).filter(|t| !t.is_empty()))
    }
}

/// Drop both push bookkeeping keys.
pub fn clear_registration(store: &dyn KeyValueStore) -> Result<()> {
    store.multi_remove(&[KEY_DEVICE_TOKEN, KEY_TOKEN_SENT])
}

#[derive(Clone)]
pub struct PushService {
    api: ApiClient,
    registrar: Arc<dyn DeviceRegistrar>,
}

impl PushService {
    pub fn new(api: ApiClient, registrar: Arc<dyn DeviceRegistrar>) -> Self {
        Self { api, registrar }
    }

    fn kv(&self) -> &Arc<dyn KeyValueStore> {
        self.api.session().kv()
    }

    pub fn device_token(&self) -> Result<Option<String>> {
        Ok(self.kv().get(KEY_DEVICE_TOKEN)?.filter(|t| !t.is_empty()))
    }

    pub fn token_sent(&self) -> Result<bool> {
        Ok(self.kv().get(KEY_TOKEN_SENT)?.as_deref() == Some("true"))
    }

    /// Reuse the stored device token, or register for a new one.
    pub async fn initialize(&self) -> Result<Option<String>> {
        if let Some(token) = self.device_token()? {
            debug!("Reusing stored device token");
            return Ok(Some(token));
        }
        self.register().await
    }

    /// Ask the registrar for a token and persist it.
    pub async fn register(&self) -> Result<Option<String>> {
        let token = self.registrar.register().await?;
        match &token {
            Some(token) => {
                self.kv().set(KEY_DEVICE_TOKEN, token)?;
                debug!("Device token stored");
            }
            None => debug!("No device token available"),
        }
        Ok(token)
    }

    /// Report a device token to the backend under the persisted role's route.
    /// Falls back to the stored token. Returns `false` when there is no token
    /// or no role to report under.
    pub async fn save_to_backend(&self, token: Option<&str>) -> Result<bool> {
        let token = match token {
            Some(token) => Some(token.to_string()),
            None => self.device_token()?,
        };
        let Some(token) = token else {
            debug!("No device token to save");
            return Ok(false);
        };
        let Some(role) = self.api.session().persisted_role()? else {
            debug!("No role to save device token under");
            return Ok(false);
        };

        self.api
            .post_action(role.routes().save_push_token, Some(&json!({ "fcm_token": token })))
            .await?;
        self.kv().set(KEY_TOKEN_SENT, "true")?;
        info!(role = %role, "Device token saved to backend");
        Ok(true)
    }

    /// Register and report the device token unless the backend already has
    /// it. Returns whether a token was sent.
    pub async fn sync(&self) -> Result<bool> {
        if self.token_sent()? {
            debug!("Device token already sent");
            return Ok(false);
        }
        match self.register().await? {
            Some(token) => self.save_to_backend(Some(&token)).await,
            None => Ok(false),
        }
    }

    /// Ask the backend to forget this device. The sent flag is cleared
    /// whether or not the backend call succeeds.
    pub async fn remove_from_backend(&self) -> Result<bool> {
        let Some(token) = self.device_token()? else {
            debug!("No device token to remove");
            return Ok(true);
        };
        let Some(role) = self.api.session().persisted_role()? else {
            self.kv().remove(KEY_TOKEN_SENT)?;
            return Ok(true);
        };

        let result = self
            .api
            .post_action(role.routes().remove_push_token, Some(&json!({ "fcm_token": token })))
            .await;
        self.kv().remove(KEY_TOKEN_SENT)?;
        match result {
            Ok(_) => {
                info!(role = %role, "Device token removed from backend");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Failed to remove device token from backend");
                Err(e.into())
            }
        }
    }

    /// Forget the device token locally. The backend is not contacted.
    pub fn cleanup(&self) -> Result<()> {
        clear_registration(self.kv().as_ref())
    }
}
