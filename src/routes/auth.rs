// SPDX-License-Identifier: MIT

//! Authentication routes: register, login, refresh, logout.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::ValidateEmail;

use crate::error::{AppError, Result};
use crate::models::UserSummary;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

/// Fields are optional so a missing field maps to a 400 validation error
/// rather than a deserialization rejection.
#[derive(Deserialize)]
pub struct RegisterPayload {
    email: Option<String>,
    password: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserSummary,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let (email, password) = require_credentials(payload.email, payload.password)?;

    if !email.validate_email() {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }

    let user = state.auth.register(&email, &password, payload.name)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Account created successfully".to_string(),
            user,
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginPayload {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>> {
    let (email, password) = require_credentials(payload.email, payload.password)?;

    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let outcome = state.auth.login(&email, &password, client_ip)?;

    Ok(Json(LoginResponse {
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
        user: outcome.user,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshPayload>,
) -> Result<Json<RefreshResponse>> {
    let token = payload
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Refresh token required".to_string()))?;

    let pair = state.auth.refresh(&token)?;

    Ok(Json(RefreshResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Logout never fails: revoking an unknown or already-revoked token is a
/// no-op so the client can always clear its local state.
async fn logout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshPayload>,
) -> Json<LogoutResponse> {
    if let Some(token) = payload.refresh_token {
        state.auth.logout(&token);
    }

    Json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    })
}

fn require_credentials(
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String)> {
    match (email, password) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => Ok((e, p)),
        _ => Err(AppError::Validation(
            "Email and password are required".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_credentials_rejects_missing_or_empty() {
        assert!(require_credentials(None, Some("pw".into())).is_err());
        assert!(require_credentials(Some("a@b.co".into()), None).is_err());
        assert!(require_credentials(Some("".into()), Some("pw".into())).is_err());
        assert!(require_credentials(Some("a@b.co".into()), Some("pw".into())).is_ok());
    }
}
