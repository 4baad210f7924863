// SPDX-License-Identifier: MIT

//! Authenticated request gateway for the companion client.
//!
//! Every outbound API call goes through [`ApiClient::call`], which attaches
//! the stored access token and recovers transparently from an expired one:
//! at most one refresh, then at most one retry. The pipeline is explicit --
//! attach, send, classify, refresh, retry, classify -- so the "exactly
//! once" bound is structural rather than an accident of control flow.
//!
//! Concurrent callers that all discover an expired token share a single
//! in-flight refresh: the first caller through the gate rotates the pair,
//! and everyone queued behind it re-reads the store and reuses the fresh
//! token instead of replaying the already-consumed refresh token.

use crate::client::token_store::{TokenSnapshot, TokenStore};
use crate::error::TOKEN_EXPIRED_CODE;
use crate::models::{Session, UserSummary};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Client-side error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Server unreachable, or reachable but answering with something that
    /// is not the JSON API (proxy error page, wrong port, ...).
    #[error("Cannot reach server: {0}")]
    Transport(String),

    /// The server rejected our credentials and local tokens were cleared.
    #[error("Authentication failed, please sign in again")]
    AuthenticationFailed,

    /// A well-formed API rejection other than an authentication failure.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The server has no capture modes configured; reconciliation cannot
    /// pick one and the operator has to seed the catalogue.
    #[error("No capture modes configured on the server")]
    NoModesConfigured,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: UserSummary,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    user: UserSummary,
}

/// One capture mode as seen by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct ModeInfo {
    pub id: uuid::Uuid,
    pub name: String,
    pub slug: String,
}

/// Result of the recorder-session endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSessionResult {
    pub session_id: uuid::Uuid,
    pub session: Session,
}

/// A page of the user's sessions.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsPage {
    pub sessions: Vec<Session>,
    pub total: usize,
}

/// API client wrapping every call with bearer attachment and the
/// refresh-and-retry recovery path.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    /// Serializes refreshes; see module docs.
    refresh_gate: Arc<Mutex<()>>,
    /// Publishes authentication-state changes (login, logout, forced
    /// sign-out) so the reconciler can resume without polling.
    auth_tx: Arc<watch::Sender<bool>>,
    /// Invoked once whenever authentication fails hard; the web shell
    /// uses it to navigate to the login page.
    login_redirect: Arc<dyn Fn() + Send + Sync>,
}

impl ApiClient {
    pub fn new(base_url: &str, store: Arc<dyn TokenStore>) -> Self {
        let authenticated = store.snapshot().is_authenticated();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
            refresh_gate: Arc::new(Mutex::new(())),
            auth_tx: Arc::new(watch::Sender::new(authenticated)),
            login_redirect: Arc::new(|| {
                tracing::info!("Redirecting to login");
            }),
        }
    }

    /// Replace the login-redirect hook (tests observe it with a counter).
    pub fn with_login_redirect(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.login_redirect = Arc::new(hook);
        self
    }

    /// Subscribe to authentication-state changes.
    pub fn auth_events(&self) -> watch::Receiver<bool> {
        self.auth_tx.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.snapshot().is_authenticated()
    }

    // ─── Auth Operations ─────────────────────────────────────────

    /// Create an account. Does not log in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<UserSummary, ClientError> {
        let body = json!({ "email": email, "password": password, "name": name });
        let response: RegisterResponse = self
            .call(Method::POST, "/auth/register", Some(&body))
            .await?;
        Ok(response.user)
    }

    /// Log in, store the token triple and cached user atomically, and
    /// publish the authentication-state change.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserSummary, ClientError> {
        let body = json!({ "email": email, "password": password });
        let response: LoginResponse = self.call(Method::POST, "/auth/login", Some(&body)).await?;

        self.store.replace(TokenSnapshot {
            access_token: Some(response.access_token),
            refresh_token: Some(response.refresh_token),
            cached_user: Some(response.user.clone()),
        });
        self.auth_tx.send_replace(true);

        Ok(response.user)
    }

    /// Log out. The server call is best-effort; local state is always
    /// cleared.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.store.snapshot().refresh_token {
            let body = json!({ "refreshToken": refresh_token });
            let result: Result<Value, ClientError> =
                self.call(Method::POST, "/auth/logout", Some(&body)).await;
            if let Err(e) = result {
                tracing::debug!(error = %e, "Server logout failed, clearing locally anyway");
            }
        }
        self.store.clear();
        self.auth_tx.send_replace(false);
    }

    // ─── API Operations ──────────────────────────────────────────

    pub async fn me(&self) -> Result<UserSummary, ClientError> {
        self.call(Method::GET, "/users/me", None).await
    }

    pub async fn modes(&self) -> Result<Vec<ModeInfo>, ClientError> {
        self.call(Method::GET, "/modes", None).await
    }

    pub async fn sessions(&self) -> Result<SessionsPage, ClientError> {
        self.call(Method::GET, "/sessions", None).await
    }

    pub async fn create_recorder_session(
        &self,
        file_id: &str,
        mode_slug: Option<&str>,
        duration: u32,
    ) -> Result<RecorderSessionResult, ClientError> {
        let body = json!({
            "fileId": file_id,
            "modeSlug": mode_slug,
            "duration": duration,
        });
        self.call(Method::POST, "/recorder/session", Some(&body))
            .await
    }

    pub async fn transcribe_session(&self, session_id: uuid::Uuid) -> Result<Value, ClientError> {
        self.call(
            Method::POST,
            &format!("/sessions/{}/transcribe", session_id),
            None,
        )
        .await
    }

    // ─── Request Pipeline ────────────────────────────────────────

    /// Make an authenticated API call.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        // 1. Attach the current access token, if any.
        let used_token = self.store.snapshot().access_token;
        let response = self
            .send(method.clone(), endpoint, body, used_token.as_deref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::handle_response(response).await;
        }

        // 2. Classify the 401: only the explicit token-expired signal
        //    earns a refresh; everything else is a hard failure.
        if !Self::is_token_expired_body(response).await {
            return Err(self.fail_authentication());
        }

        // 3. At most one refresh, then at most one retry.
        let fresh_token = match self.refresh_once(used_token.as_deref()).await {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(error = %e, "Token refresh failed");
                return Err(self.fail_authentication());
            }
        };

        let retry = self
            .send(method, endpoint, body, Some(&fresh_token))
            .await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(self.fail_authentication());
        }
        Self::handle_response(retry).await
    }

    /// Refresh the token pair, serialized across concurrent callers.
    ///
    /// `stale_token` is the access token the caller just failed with.
    /// After acquiring the gate the store is re-read: if the token changed
    /// while we waited, another caller already rotated the pair and we
    /// reuse its result instead of spending our (now consumed) refresh
    /// token on a second exchange that would come back not-found.
    async fn refresh_once(&self, stale_token: Option<&str>) -> Result<String, ClientError> {
        let _guard = self.refresh_gate.lock().await;

        let current = self.store.snapshot();
        if let Some(access_token) = &current.access_token {
            if Some(access_token.as_str()) != stale_token {
                return Ok(access_token.clone());
            }
        }

        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or(ClientError::AuthenticationFailed)?;

        let url = format!("{}/auth/refresh", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::AuthenticationFailed);
        }

        let pair: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        // Full-triple replace: the new access token is never visible
        // without its companion refresh token.
        let access_token = pair.access_token.clone();
        self.store.replace(TokenSnapshot {
            access_token: Some(pair.access_token),
            refresh_token: Some(pair.refresh_token),
            cached_user: current.cached_user,
        });

        tracing::debug!("Token pair rotated");
        Ok(access_token)
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.http.request(method, &url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    /// True when a 401 body carries the explicit token-expired code.
    async fn is_token_expired_body(response: reqwest::Response) -> bool {
        match response.json::<Value>().await {
            Ok(body) => body.get("code").and_then(Value::as_str) == Some(TOKEN_EXPIRED_CODE),
            Err(_) => false,
        }
    }

    /// Parse a non-401 response: JSON success, JSON API error, or
    /// transport-level garbage.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        if !is_json {
            return Err(ClientError::Transport(
                "Invalid response from server".to_string(),
            ));
        }

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ClientError::Transport(e.to_string()));
        }

        let body: Value = response.json().await.unwrap_or_default();
        let message = body
            .get("details")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Hard authentication failure: clear everything, tell the world,
    /// hand the shell a reason to show the login page.
    fn fail_authentication(&self) -> ClientError {
        self.store.clear();
        self.auth_tx.send_replace(false);
        (self.login_redirect)();
        ClientError::AuthenticationFailed
    }
}
