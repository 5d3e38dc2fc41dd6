use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, Auth};
use crate::models::UserData;
use crate::notify::Notice;
use crate::push::PushService;
use crate::validation::LoginRequest;

use super::{Role, SessionError, SessionState, SessionStore};

const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";

#[derive(Deserialize)]
struct LoginData {
    #[serde(default)]
    user: Option<UserData>,
    #[serde(default)]
    token: Option<String>,
}

/// Session lifecycle: boot-time restore, login and logout.
///
/// State itself lives in the `SessionStore`; this type decides when it
/// changes and drives push registration alongside.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<SessionStore>,
    api: ApiClient,
    push: PushService,
}

impl SessionManager {
    pub fn new(api: ApiClient, push: PushService) -> Self {
        Self {
            store: api.session().clone(),
            api,
            push,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn snapshot(&self) -> SessionState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store.subscribe()
    }

    /// Restore the session from storage.
    ///
    /// A persisted state that claims to be logged in without a valid role is
    /// wiped. Storage or parse failures also end logged out. Never fails.
    pub async fn check_auth_status(&self) -> SessionState {
        let persisted = match self.store.read_persisted() {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                self.reset();
                return SessionState::logged_out();
            }
        };

        let state = match persisted.validate() {
            Ok(state) => state,
            Err(reason) => {
                info!(%reason, "Clearing inconsistent session");
                self.reset();
                return SessionState::logged_out();
            }
        };

        self.store.publish(state.clone());
        if state.is_logged_in && state.token.as_deref().is_some_and(|t| !t.is_empty()) {
            self.sync_push().await;
        }
        debug!(logged_in = state.is_logged_in, role = ?state.role, "Session restored");
        state
    }

    fn reset(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session");
        }
    }

    /// Establish a session. The role is checked before anything is written.
    pub async fn login(&self, user: UserData, token: &str, role: &str) -> Result<SessionState, SessionError> {
        let role: Role = role.parse()?;
        let state = self
            .store
            .persist(&user, token, role)
            .map_err(SessionError::Storage)?;
        info!(role = %role, user_id = ?user.id, "Logged in");

        self.sync_push().await;
        Ok(state)
    }

    /// End the session. Always succeeds from the caller's point of view.
    pub async fn logout(&self) {
        self.store.teardown();
        info!("Logged out");
    }

    /// Validate the login form, exchange credentials for a token, and log in.
    pub async fn authenticate(&self, request: &LoginRequest) -> Result<SessionState, SessionError> {
        request.validate()?;
        let role = request.role;

        let result = self.exchange_credentials(request).await;
        let (user, token) = match result {
            Ok(pair) => pair,
            Err(e) => {
                self.notify_login_failure(&e);
                return Err(e);
            }
        };

        match self.login(user, &token, role.as_str()).await {
            Ok(state) => {
                self.api.notifier().notify(Notice::success("Login successful!"));
                Ok(state)
            }
            Err(e) => {
                self.notify_login_failure(&e);
                Err(e)
            }
        }
    }

    async fn exchange_credentials(&self, request: &LoginRequest) -> Result<(UserData, String), SessionError> {
        let data: LoginData = self
            .api
            .post_with(request.role.routes().login, &request.body(), Auth::None)
            .await?;
        let token = data
            .token
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingField("token"))?;
        let user = data.user.ok_or(SessionError::MissingField("user"))?;
        Ok((user, token))
    }

    /// HTTP and connection failures were already reported by the client.
    fn notify_login_failure(&self, err: &SessionError) {
        let message = match err {
            SessionError::Validation(_) => return,
            SessionError::Api(ApiError::Rejected(m)) if !m.trim().is_empty() => m.clone(),
            SessionError::Api(ApiError::Rejected(_) | ApiError::InvalidResponse(_)) => {
                LOGIN_FAILED_MESSAGE.to_string()
            }
            SessionError::Api(_) => return,
            _ => err.user_message(),
        };
        self.api.notifier().notify(Notice::error(message));
    }

    async fn sync_push(&self) {
        match self.push.sync().await {
            Ok(true) => debug!("Push registration synced"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Push registration failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{KEY_LOGGED_IN, KEY_ROLE, KEY_TOKEN, KEY_USER, SESSION_KEYS};
    use crate::notify::{ChannelNotifier, NoticeKind};
    use crate::push::{StaticRegistrar, UnsupportedRegistrar, KEY_TOKEN_SENT};
    use crate::store::{KeyValueStore, MemoryStore};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager_with(
        base_url: &str,
        registrar: Arc<dyn crate::push::DeviceRegistrar>,
    ) -> (Arc<MemoryStore>, SessionManager, UnboundedReceiver<Notice>) {
        let kv = Arc::new(MemoryStore::new());
        let store = Arc::new(SessionStore::new(kv.clone()));
        let (notifier, rx) = ChannelNotifier::new();
        let api = ApiClient::with_base_url(base_url, Duration::from_secs(5), store, Arc::new(notifier))
            .unwrap();
        let push = PushService::new(api.clone(), registrar);
        (kv, SessionManager::new(api, push), rx)
    }

    fn manager() -> (Arc<MemoryStore>, SessionManager) {
        let (kv, manager, _) = manager_with("http://127.0.0.1:1", Arc::new(UnsupportedRegistrar));
        (kv, manager)
    }

    fn user(id: i64) -> UserData {
        serde_json::from_value(json!({ "id": id })).unwrap()
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_role_before_writing() {
        let (kv, manager) = manager();
        let err = manager.login(user(1), "tok", "admin").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidRole(ref r) if r == "admin"));
        assert!(kv.is_empty());
        assert!(!manager.snapshot().is_logged_in);
    }

    #[tokio::test]
    async fn test_login_then_restore() {
        let (kv, manager) = manager();
        manager.login(user(1), "tok123", "vendor").await.unwrap();
        assert_eq!(kv.get(KEY_ROLE).unwrap().as_deref(), Some("vendor"));

        // Fresh manager over the same storage, as after an app restart
        let store = Arc::new(SessionStore::new(kv.clone()));
        let api = ApiClient::with_base_url(
            "http://127.0.0.1:1",
            Duration::from_secs(5),
            store,
            Arc::new(crate::notify::LogNotifier),
        )
        .unwrap();
        let push = PushService::new(api.clone(), Arc::new(UnsupportedRegistrar));
        let restored = SessionManager::new(api, push).check_auth_status().await;

        assert!(restored.is_logged_in);
        assert_eq!(restored.role, Some(Role::Vendor));
        assert_eq!(restored.token.as_deref(), Some("tok123"));
        assert_eq!(restored.user.and_then(|u| u.id), Some(1));
    }

    #[tokio::test]
    async fn test_check_auth_status_heals_missing_role() {
        let (kv, manager) = manager();
        kv.set(KEY_LOGGED_IN, "true").unwrap();
        kv.set(KEY_TOKEN, "tok").unwrap();
        kv.set(KEY_USER, r#"{"id": 3}"#).unwrap();

        for _ in 0..2 {
            let state = manager.check_auth_status().await;
            assert!(!state.is_logged_in);
            assert_eq!(state.role, None);
            for key in SESSION_KEYS {
                assert_eq!(kv.get(key).unwrap(), None, "{} should be cleared", key);
            }
        }
    }

    #[tokio::test]
    async fn test_check_auth_status_heals_invalid_role_and_bad_user() {
        let (kv, manager) = manager();
        kv.set(KEY_LOGGED_IN, "true").unwrap();
        kv.set(KEY_ROLE, "customer").unwrap();
        assert!(!manager.check_auth_status().await.is_logged_in);
        assert!(kv.is_empty());

        kv.set(KEY_LOGGED_IN, "true").unwrap();
        kv.set(KEY_ROLE, "vendor").unwrap();
        kv.set(KEY_USER, "{broken").unwrap();
        assert!(!manager.check_auth_status().await.is_logged_in);
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let (kv, manager) = manager();
        manager.login(user(1), "tok123", "vendor").await.unwrap();
        kv.set(KEY_TOKEN_SENT, "true").unwrap();
        let mut rx = manager.subscribe();

        manager.logout().await;
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_logged_in);

        let state = manager.check_auth_status().await;
        assert!(!state.is_logged_in);
        assert_eq!(state.role, None);
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn test_login_survives_push_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dispatch/save-fcm-token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (kv, manager, _rx) = manager_with(&server.uri(), Arc::new(StaticRegistrar::new("push-tok")));
        let state = manager.login(user(5), "tok", "dispatcher").await.unwrap();
        assert!(state.is_logged_in);
        assert_eq!(kv.get(KEY_TOKEN_SENT).unwrap(), None);
    }

    #[tokio::test]
    async fn test_authenticate_vendor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vendor/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "data": {"user": {"id": 12, "username": "mama_put"}, "token": "tok-v"}
            })))
            .mount(&server)
            .await;

        let (kv, manager, mut rx) = manager_with(&server.uri(), Arc::new(UnsupportedRegistrar));
        let state = manager
            .authenticate(&LoginRequest::new(Role::Vendor, "mama_put", "secret1"))
            .await
            .unwrap();

        assert_eq!(state.role, Some(Role::Vendor));
        assert_eq!(kv.get(KEY_TOKEN).unwrap().as_deref(), Some("tok-v"));
        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.message, "Login successful!");
    }

    #[tokio::test]
    async fn test_authenticate_rejected_by_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dispatch/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": false,
                "message": "Invalid credentials"
            })))
            .mount(&server)
            .await;

        let (kv, manager, mut rx) = manager_with(&server.uri(), Arc::new(UnsupportedRegistrar));
        let err = manager
            .authenticate(&LoginRequest::new(Role::Dispatcher, "r@x.io", "secret1"))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Api(ApiError::Rejected(_))));
        assert!(kv.is_empty());
        assert_eq!(rx.try_recv().unwrap().message, "Invalid credentials");
    }

    #[tokio::test]
    async fn test_authenticate_invalid_form_never_hits_network() {
        let server = MockServer::start().await;
        let (_, manager, mut rx) = manager_with(&server.uri(), Arc::new(UnsupportedRegistrar));

        let err = manager
            .authenticate(&LoginRequest::new(Role::Vendor, "ab", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }
}
