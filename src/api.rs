use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::session::SessionStore;

/// `{success, message, error}` wrapper the backend puts around replies.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Envelope<T = serde_json::Value> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Envelope<T> {
    /// First validation detail, then the top-level message, then `fallback`.
    pub fn failure_message(&self, fallback: &str) -> String {
        if let Some(error) = &self.error {
            return error
                .pointer("/details/0/message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string());
        }
        self.message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Single entry point for backend calls.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: &Config, session: SessionStore) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self { client: builder.build()?, base: config.backend_base(), session })
    }

    #[cfg(test)]
    pub fn with_base(base: impl Into<String>, session: SessionStore) -> Self {
        let base: String = base.into();
        Self { client: Client::new(), base: base.trim_end_matches('/').to_string(), session }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    async fn prepare<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        authorized: bool,
    ) -> Result<RequestBuilder, ApiError> {
        let mut req = self.client.request(method, self.url(path));
        if authorized {
            // protected calls never go out without a token
            let token = self.session.token().await.ok_or(ApiError::Unauthenticated)?;
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        Ok(req)
    }

    /// Authorized call that expects a 2xx JSON body of type `T`.
    pub async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.prepare(method.clone(), path, body, true).await?;
        debug!(%method, path, "backend request");
        let resp = req.send().await.inspect_err(|e| warn!(path, "request failed: {e}"))?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Envelope>(&bytes)
                .ok()
                .map(|env| env.failure_message(&status_text(status)))
                .unwrap_or_else(|| status_text(status));
            warn!(path, status = status.as_u16(), %message, "backend rejected request");
            return Err(ApiError::status(status, message));
        }

        // an empty 2xx body reads as JSON null
        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) { b"null" } else { &bytes };
        serde_json::from_slice(body).map_err(|e| ApiError::malformed(path, e))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<(), T>(Method::DELETE, path, None).await
    }

    /// Unauthenticated POST whose envelope is read whatever the status.
    pub async fn send_envelope<B, T>(&self, path: &str, body: &B) -> Result<Envelope<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.prepare(Method::POST, path, Some(body), false).await?;
        debug!(path, "envelope request");
        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        match serde_json::from_slice::<Envelope<T>>(&bytes) {
            Ok(env) => Ok(env),
            Err(_) if !status.is_success() => Err(ApiError::status(status, status_text(status))),
            Err(e) => Err(ApiError::malformed(path, e)),
        }
    }
}

fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    async fn client_with_token(url: String, token: Option<&str>) -> ApiClient {
        let session = SessionStore::in_memory();
        if let Some(token) = token {
            session.set_session(token, "tester").await.unwrap();
        }
        ApiClient::with_base(url, session)
    }

    #[derive(Debug, Deserialize)]
    struct SuccessReply {
        success: bool,
    }

    #[tokio::test]
    async fn attaches_bearer_token() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("PUT", "/holdings/7")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::Json(json!({"quantity": 3.0})))
            .with_status(200)
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;
        let client = client_with_token(server.url(), Some("secret")).await;
        let resp: SuccessReply = client.put("/holdings/7", &json!({"quantity": 3.0})).await.unwrap();
        assert!(resp.success);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn missing_token_sends_nothing() {
        let mut server = Server::new_async().await;
        let m = server.mock("GET", "/holdings/get").expect(0).create_async().await;
        let client = client_with_token(server.url(), None).await;
        let err = client.get::<serde_json::Value>("/holdings/get").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn non_2xx_uses_envelope_message() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/holdings/1")
            .with_status(404)
            .with_body(r#"{"success":false,"message":"Holding not found"}"#)
            .create_async()
            .await;
        let client = client_with_token(server.url(), Some("t")).await;
        let err = client.delete::<SuccessReply>("/holdings/1").await.unwrap_err();
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Holding not found");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_falls_back_to_status_text() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/holdings/stats")
            .with_status(502)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;
        let client = client_with_token(server.url(), Some("t")).await;
        let err = client.get::<serde_json::Value>("/holdings/stats").await.unwrap_err();
        assert_eq!(err.to_string(), "502 Bad Gateway");
    }

    #[tokio::test]
    async fn wrong_shape_is_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/holdings/2")
            .with_status(200)
            .with_body(r#"{"ok":"yes"}"#)
            .create_async()
            .await;
        let client = client_with_token(server.url(), Some("t")).await;
        let err = client.put::<_, SuccessReply>("/holdings/2", &json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::Malformed { .. }));
    }

    #[tokio::test]
    async fn envelope_is_read_on_error_status() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .match_header("authorization", Matcher::Missing)
            .with_status(403)
            .with_body(r#"{"success":false,"message":"Auth failed"}"#)
            .create_async()
            .await;
        let client = client_with_token(server.url(), Some("stale")).await;
        let env: Envelope = client.send_envelope("/auth/login", &json!({})).await.unwrap();
        assert!(!env.success);
        assert_eq!(env.failure_message("Login failed"), "Auth failed");
    }

    #[test]
    fn failure_message_order() {
        let details: Envelope = serde_json::from_value(json!({
            "success": false,
            "message": "Bad request",
            "error": {"details": [{"message": "\"email\" must be a valid email"}]}
        }))
        .unwrap();
        assert_eq!(details.failure_message("Login failed"), "\"email\" must be a valid email");

        let bare_error: Envelope = serde_json::from_value(json!({"error": {}, "message": "x"})).unwrap();
        assert_eq!(bare_error.failure_message("Login failed"), "Login failed");

        let message_only: Envelope = serde_json::from_value(json!({"message": "User exists"})).unwrap();
        assert_eq!(message_only.failure_message("Signup failed."), "User exists");

        let empty: Envelope = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.failure_message("Signup failed."), "Signup failed.");
    }
}
