use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::CacheManager;
use crate::models::UserData;
use crate::push;
use crate::store::KeyValueStore;

use super::Role;

/// Persisted session keys. Only `SessionStore` writes these.
pub const KEY_LOGGED_IN: &str = "isLoggedIn";
pub const KEY_ROLE: &str = "userRole";
pub const KEY_USER: &str = "userData";
pub const KEY_TOKEN: &str = "token";

pub const SESSION_KEYS: [&str; 4] = [KEY_USER, KEY_TOKEN, KEY_LOGGED_IN, KEY_ROLE];

/// Published view of the current session.
///
/// Invariant: `is_logged_in` implies `role.is_some()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub is_logged_in: bool,
    pub role: Option<Role>,
    pub user: Option<UserData>,
    pub token: Option<String>,
}

impl SessionState {
    pub fn logged_out() -> Self {
        Self::default()
    }

    pub fn logged_in_role(&self) -> Option<Role> {
        if self.is_logged_in {
            self.role
        } else {
            None
        }
    }
}

/// The four session values exactly as read from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSession {
    pub logged_in: Option<String>,
    pub role: Option<String>,
    pub user: Option<String>,
    pub token: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorruptSession {
    #[error("logged in without a role")]
    MissingRole,

    #[error("logged in with unknown role {0:?}")]
    InvalidRole(String),

    #[error("stored user record is unreadable: {0}")]
    UnreadableUser(String),
}

impl PersistedSession {
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.as_deref() == Some("true")
    }

    /// Turn raw values into a session state, rejecting states that claim to
    /// be logged in without a valid role.
    pub fn validate(&self) -> std::result::Result<SessionState, CorruptSession> {
        let is_logged_in = self.is_logged_in();

        let role = match self.role.as_deref().filter(|r| !r.is_empty()) {
            Some(raw) => match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(_) if is_logged_in => return Err(CorruptSession::InvalidRole(raw.to_string())),
                Err(_) => None,
            },
            None if is_logged_in => return Err(CorruptSession::MissingRole),
            None => None,
        };

        let user = match self.user.as_deref() {
            Some(raw) => Some(
                serde_json::from_str::<UserData>(raw)
                    .map_err(|e| CorruptSession::UnreadableUser(e.to_string()))?,
            ),
            None => None,
        };

        Ok(SessionState {
            is_logged_in,
            role,
            user,
            token: self.token.clone(),
        })
    }
}

/// Single writer of session state, in memory and in storage.
///
/// Consumers read snapshots or subscribe to changes; nothing else touches the
/// session keys.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    cache: CacheManager,
    clear_cache_on_teardown: bool,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(SessionState::logged_out());
        Self {
            cache: CacheManager::new(store.clone()),
            store,
            clear_cache_on_teardown: false,
            state,
        }
    }

    /// Also purge cached resources whenever the session is torn down.
    pub fn with_cache_purge(mut self, enabled: bool) -> Self {
        self.clear_cache_on_teardown = enabled;
        self
    }

    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Read the four session keys as one snapshot.
    pub fn read_persisted(&self) -> Result<PersistedSession> {
        let values = self
            .store
            .multi_get(&[KEY_LOGGED_IN, KEY_ROLE, KEY_USER, KEY_TOKEN])
            .context("Failed to read session")?;
        let mut values = values.into_iter();
        Ok(PersistedSession {
            logged_in: values.next().flatten(),
            role: values.next().flatten(),
            user: values.next().flatten(),
            token: values.next().flatten(),
        })
    }

    /// The bearer token as currently persisted, bypassing in-memory state.
    pub fn persisted_token(&self) -> Result<Option<String>> {
        Ok(self.store.get(KEY_TOKEN)?.filter(|t| !t.is_empty()))
    }

    /// The persisted role, if present and valid.
    pub fn persisted_role(&self) -> Result<Option<Role>> {
        Ok(self.store.get(KEY_ROLE)?.and_then(|r| r.parse().ok()))
    }

    pub(crate) fn persist(&self, user: &UserData, token: &str, role: Role) -> Result<SessionState> {
        let user_json = serde_json::to_string(user).context("Failed to serialize user record")?;
        self.store.set(KEY_USER, &user_json)?;
        self.store.set(KEY_TOKEN, token)?;
        self.store.set(KEY_LOGGED_IN, "true")?;
        self.store.set(KEY_ROLE, role.as_str())?;

        let state = SessionState {
            is_logged_in: true,
            role: Some(role),
            user: Some(user.clone()),
            token: Some(token.to_string()),
        };
        self.publish(state.clone());
        Ok(state)
    }

    pub(crate) fn publish(&self, state: SessionState) {
        debug!(logged_in = state.is_logged_in, role = ?state.role, "Publishing session state");
        self.state.send_replace(state);
    }

    /// Replace the stored account record, e.g. after a dashboard refresh.
    /// Ignored when nobody is logged in.
    pub fn update_user(&self, user: &UserData) -> Result<()> {
        let mut state = self.snapshot();
        if !state.is_logged_in {
            debug!("Ignoring user update while logged out");
            return Ok(());
        }
        let user_json = serde_json::to_string(user).context("Failed to serialize user record")?;
        self.store.set(KEY_USER, &user_json)?;
        state.user = Some(user.clone());
        self.publish(state);
        Ok(())
    }

    /// Remove the session keys and reset to logged out. In-memory state is
    /// reset even when storage fails.
    pub(crate) fn clear(&self) -> Result<()> {
        let result = self.store.multi_remove(&SESSION_KEYS);
        self.publish(SessionState::logged_out());
        result.context("Failed to clear session")
    }

    /// Full logout path: drop push registration, clear the session, and purge
    /// caches when configured. Never fails; problems are logged.
    pub fn teardown(&self) {
        if let Err(e) = push::clear_registration(self.store.as_ref()) {
            warn!(error = %e, "Failed to clear push registration");
        }
        if let Err(e) = self.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        if self.clear_cache_on_teardown {
            match self.cache.purge() {
                Ok(count) => debug!(count, "Purged cached resources"),
                Err(e) => warn!(error = %e, "Failed to purge cached resources"),
            }
        }
        info!("Session torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn persisted(logged_in: Option<&str>, role: Option<&str>) -> PersistedSession {
        PersistedSession {
            logged_in: logged_in.map(str::to_string),
            role: role.map(str::to_string),
            user: Some(r#"{"id": 1}"#.to_string()),
            token: Some("tok".to_string()),
        }
    }

    #[test]
    fn test_validate_logged_in_requires_role() {
        assert_eq!(persisted(Some("true"), None).validate(), Err(CorruptSession::MissingRole));
        assert_eq!(persisted(Some("true"), Some("")).validate(), Err(CorruptSession::MissingRole));
        assert_eq!(
            persisted(Some("true"), Some("admin")).validate(),
            Err(CorruptSession::InvalidRole("admin".to_string()))
        );

        let ok = persisted(Some("true"), Some("vendor")).validate().unwrap();
        assert!(ok.is_logged_in);
        assert_eq!(ok.role, Some(Role::Vendor));
        assert_eq!(ok.user.unwrap().id, Some(1));
    }

    #[test]
    fn test_validate_logged_out_tolerates_missing_role() {
        let state = persisted(None, Some("admin")).validate().unwrap();
        assert!(!state.is_logged_in);
        assert_eq!(state.role, None);
        assert_eq!(state.logged_in_role(), None);
    }

    #[test]
    fn test_validate_unreadable_user() {
        let mut raw = persisted(Some("true"), Some("vendor"));
        raw.user = Some("{not json".to_string());
        assert!(matches!(raw.validate(), Err(CorruptSession::UnreadableUser(_))));
    }

    #[test]
    fn test_persist_then_clear() {
        let kv = Arc::new(MemoryStore::new());
        let session = SessionStore::new(kv.clone());
        let mut rx = session.subscribe();

        let user: UserData = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        session.persist(&user, "tok123", Role::Vendor).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().role, Some(Role::Vendor));
        assert_eq!(session.persisted_token().unwrap().as_deref(), Some("tok123"));
        assert_eq!(kv.get(KEY_LOGGED_IN).unwrap().as_deref(), Some("true"));

        session.clear().unwrap();
        for key in SESSION_KEYS {
            assert_eq!(kv.get(key).unwrap(), None, "{} should be cleared", key);
        }
        assert_eq!(session.snapshot(), SessionState::logged_out());
    }

    #[test]
    fn test_update_user_ignored_when_logged_out() {
        let kv = Arc::new(MemoryStore::new());
        let session = SessionStore::new(kv.clone());
        let user: UserData = serde_json::from_str(r#"{"id": 9}"#).unwrap();
        session.update_user(&user).unwrap();
        assert_eq!(kv.get(KEY_USER).unwrap(), None);
    }

    #[test]
    fn test_teardown_purges_cache_when_enabled() {
        let kv = Arc::new(MemoryStore::new());
        let cache = CacheManager::new(kv.clone());
        cache.save("vendor_orders", &vec![1, 2, 3]).unwrap();
        kv.set(push::KEY_DEVICE_TOKEN, "ExponentPushToken[x]").unwrap();

        let session = SessionStore::new(kv.clone()).with_cache_purge(true);
        let user = UserData::default();
        session.persist(&user, "tok", Role::Dispatcher).unwrap();
        session.teardown();

        assert!(kv.is_empty());
    }
}
