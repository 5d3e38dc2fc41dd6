//! HTTP gateway for the marketplace backend.
//!
//! Every backend call goes through `ApiClient`. It attaches the bearer token
//! read fresh from the session store, unwraps the `{status, data, message}`
//! envelope, and reacts to failures: a 401 tears the session down, other HTTP
//! errors and lost connections raise an error notification. Errors are always
//! returned to the caller as well. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::SessionStore;
use crate::config::Config;
use crate::notify::{Notice, Notifier};

use super::error::CONNECTIVITY_MESSAGE;
use super::ApiError;

/// Shown after a 401 has cleared the session.
pub const LOGGED_OUT_MESSAGE: &str = "Logged out successfully.";

/// Whether a request carries the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Bearer,
    None,
}

/// The backend's response wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Acknowledgement of an action request. Any 2xx counts; the body is read
/// leniently for its message. `status` is `None` when the body carries none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ack {
    pub status: Option<bool>,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl Ack {
    fn from_body(body: &str) -> Self {
        let Ok(Value::Object(mut fields)) = serde_json::from_str::<Value>(body) else {
            return Self::default();
        };
        Self {
            status: fields.get("status").and_then(Value::as_bool),
            message: fields
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string),
            data: fields.remove("data").filter(|d| !d.is_null()),
        }
    }

    /// The backend answered 2xx but reported failure in the body.
    pub fn is_rejected(&self) -> bool {
        self.status == Some(false)
    }
}

/// API client for the marketplace backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    /// Create a client from configuration. Fails if no base URL is set.
    pub fn new(
        config: &Config,
        session: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let base_url = config
            .base_url()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Self::with_base_url(base_url, config.request_timeout(), session, notifier)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
        session: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            notifier,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// The persisted token at this moment. A storage failure sends the
    /// request without one.
    fn bearer_token(&self) -> Option<String> {
        match self.session.persisted_token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read token, sending request without it");
                None
            }
        }
    }

    fn request(&self, method: Method, path: &str, auth: Auth) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");
        if auth == Auth::Bearer {
            if let Some(token) = self.bearer_token() {
                request = request.bearer_auth(token);
            }
        }
        request
    }

    /// Send a request and return the body of a 2xx response.
    async fn execute(&self, request: RequestBuilder, path: &str) -> Result<String, ApiError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(path, error = %e, "Request failed without a response");
                self.notifier.notify(Notice::error(CONNECTIVITY_MESSAGE));
                return Err(ApiError::Network(e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(ApiError::InvalidResponse(format!("{}: {}", path, e)));
            }
            Err(_) => String::new(),
        };

        if status.is_success() {
            debug!(path, status = status.as_u16(), bytes = body.len(), "Request succeeded");
            return Ok(body);
        }

        let err = ApiError::from_status(status, &body);
        warn!(
            path,
            status = status.as_u16(),
            body = %ApiError::truncate_body(&body),
            "Request failed"
        );
        self.handle_failure(&err);
        Err(err)
    }

    fn handle_failure(&self, err: &ApiError) {
        if err.is_unauthorized() {
            info!("Received 401, tearing down session");
            self.session.teardown();
            self.notifier.notify(Notice::info(LOGGED_OUT_MESSAGE));
        } else {
            self.notifier.notify(Notice::error(err.user_message()));
        }
    }

    /// Unwrap `data` from a successful envelope.
    fn decode_data<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
        let envelope: Envelope<Value> = serde_json::from_str(body)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))?;

        if !envelope.status {
            return Err(ApiError::Rejected(envelope.message.unwrap_or_default()));
        }

        match envelope.data {
            Some(data) if !data.is_null() => serde_json::from_value(data)
                .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e))),
            _ => Err(ApiError::InvalidResponse(format!("{}: response has no data", path))),
        }
    }

    // ===== Data Requests =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.execute(self.request(Method::GET, path, Auth::Bearer), path).await?;
        Self::decode_data(path, &body)
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.post_with(path, body, Auth::Bearer).await
    }

    pub async fn post_with<T, B>(&self, path: &str, body: &B, auth: Auth) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.request(Method::POST, path, auth).json(body);
        let body = self.execute(request, path).await?;
        Self::decode_data(path, &body)
    }

    // ===== Actions =====

    pub async fn post_action<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Result<Ack, ApiError> {
        let mut request = self.request(Method::POST, path, Auth::Bearer);
        if let Some(body) = body {
            request = request.json(body);
        }
        let body = self.execute(request, path).await?;
        Ok(Ack::from_body(&body))
    }

    pub async fn put_action<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Ack, ApiError> {
        let request = self.request(Method::PUT, path, Auth::Bearer).json(body);
        let body = self.execute(request, path).await?;
        Ok(Ack::from_body(&body))
    }

    pub async fn delete_action(&self, path: &str) -> Result<Ack, ApiError> {
        let body = self
            .execute(self.request(Method::DELETE, path, Auth::Bearer), path)
            .await?;
        Ok(Ack::from_body(&body))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Role, SESSION_KEYS};
    use crate::models::UserData;
    use crate::notify::{ChannelNotifier, NoticeKind};
    use crate::store::{KeyValueStore, MemoryStore};
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        kv: Arc<MemoryStore>,
        session: Arc<SessionStore>,
        client: ApiClient,
        notices: UnboundedReceiver<Notice>,
    }

    fn harness(base_url: &str) -> Harness {
        let kv = Arc::new(MemoryStore::new());
        let session = Arc::new(SessionStore::new(kv.clone()));
        let (notifier, notices) = ChannelNotifier::new();
        let client = ApiClient::with_base_url(
            base_url,
            Duration::from_secs(5),
            session.clone(),
            Arc::new(notifier),
        )
        .unwrap();
        Harness { kv, session, client, notices }
    }

    fn log_in(h: &Harness, token: &str) {
        h.session.persist(&UserData::default(), token, Role::Vendor).unwrap();
    }

    #[tokio::test]
    async fn test_get_attaches_current_token_and_unwraps_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vendor/show"))
            .and(header("Authorization", "Bearer tok123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "data": {"answer": 42}
            })))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        log_in(&h, "tok123");

        let data: Value = h.client.get("/vendor/show").await.unwrap();
        assert_eq!(data, json!({"answer": 42}));
    }

    #[tokio::test]
    async fn test_token_is_read_per_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vendor/orders"))
            .and(header("Authorization", "Bearer second"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": true, "data": []})))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        log_in(&h, "first");
        // Token rotated behind the client's back
        h.kv.set("token", "second").unwrap();

        let orders: Vec<Value> = h.client.get("/vendor/orders").await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_status_false_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vendor/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": false,
                "message": "Vendor suspended"
            })))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        let err = h.client.get::<Value>("/vendor/dashboard").await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "Vendor suspended"));
    }

    #[tokio::test]
    async fn test_401_tears_down_session_and_notifies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dispatch/orders"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})))
            .mount(&server)
            .await;

        let mut h = harness(&server.uri());
        log_in(&h, "tok123");
        h.kv.set("fcm_token_sent", "true").unwrap();

        let err = h.client.get::<Value>("/dispatch/orders").await.unwrap_err();
        assert!(err.is_unauthorized());
        for key in SESSION_KEYS {
            assert_eq!(h.kv.get(key).unwrap(), None, "{} should be cleared", key);
        }
        assert_eq!(h.kv.get("fcm_token_sent").unwrap(), None);
        assert!(!h.session.snapshot().is_logged_in);

        let notice = h.notices.try_recv().unwrap();
        assert_eq!(notice.kind, NoticeKind::Info);
        assert_eq!(notice.message, LOGGED_OUT_MESSAGE);
    }

    #[tokio::test]
    async fn test_http_error_notifies_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vendor/sendMoney"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "status": false,
                "message": "Insufficient balance"
            })))
            .mount(&server)
            .await;

        let mut h = harness(&server.uri());
        log_in(&h, "tok");
        let err = h
            .client
            .post_action("/vendor/sendMoney", Some(&json!({"amount": "5000"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        // Session survives non-401 failures
        assert!(h.session.snapshot().is_logged_in);

        let notice = h.notices.try_recv().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Insufficient balance");
    }

    #[tokio::test]
    async fn test_unreachable_server_notifies_connectivity() {
        let mut h = harness("http://127.0.0.1:1");
        let err = h.client.get::<Value>("/vendor/orders").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert!(err.is_connectivity());
        assert_eq!(h.notices.try_recv().unwrap().message, CONNECTIVITY_MESSAGE);
    }

    #[tokio::test]
    async fn test_unauthenticated_post_omits_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vendor/login"))
            .and(body_json(json!({"username": "mama_put", "password": "secret1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "data": {"token": "fresh"}
            })))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        log_in(&h, "stale");
        let data: Value = h
            .client
            .post_with(
                "/vendor/login",
                &json!({"username": "mama_put", "password": "secret1"}),
                Auth::None,
            )
            .await
            .unwrap();
        assert_eq!(data["token"], "fresh");

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_action_accepts_any_2xx_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/vendor/7"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/vendor/vendoritem/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "message": "Item updated"
            })))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        assert_eq!(h.client.delete_action("/vendor/7").await.unwrap(), Ack::default());
        let ack = h.client.put_action("/vendor/vendoritem/7", &json!({"price": 100.0})).await.unwrap();
        assert_eq!(ack.status, Some(true));
        assert_eq!(ack.message.as_deref(), Some("Item updated"));
        assert!(!ack.is_rejected());
    }

    #[test]
    fn test_ack_reads_status_false() {
        let ack = Ack::from_body(r#"{"status": false, "message": "Insufficient balance", "data": null}"#);
        assert!(ack.is_rejected());
        assert_eq!(ack.message.as_deref(), Some("Insufficient balance"));
        assert_eq!(ack.data, None);
        assert_eq!(Ack::from_body("not json"), Ack::default());
    }
}
