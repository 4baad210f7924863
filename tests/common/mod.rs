// SPDX-License-Identifier: MIT

use sonara::config::Config;
use sonara::db::Db;
use sonara::models::mode::default_modes;
use sonara::routes::create_router;
use sonara::services::{AuthService, TranscriberClient};
use sonara::AppState;
use std::sync::Arc;
use uuid::Uuid;

/// Build app state with the given config, optionally seeding the default
/// mode catalogue.
#[allow(dead_code)]
pub fn test_state(config: Config, seed_modes: bool) -> Arc<AppState> {
    let db = Db::new();
    if seed_modes {
        db.seed_modes(default_modes());
    }
    let auth = AuthService::new(db.clone(), &config);
    let transcriber = TranscriberClient::new(&config.ai_server_url);

    Arc::new(AppState {
        config,
        db,
        auth,
        transcriber,
    })
}

/// Create a test app with the default test config and seeded modes.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state(Config::test_default(), true);
    (create_router(state.clone()), state)
}

/// Serve an app on an ephemeral local port, returning its base URL.
#[allow(dead_code)]
pub async fn spawn_server(state: Arc<AppState>) -> String {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server died");
    });

    format!("http://{}", addr)
}

/// Spawn a stand-in for the AI transcription service.
#[allow(dead_code)]
pub async fn spawn_fake_ai_server() -> String {
    use axum::{extract::Path, routing::post, Json, Router};

    let app = Router::new().route(
        "/api/transcribe/{file_id}",
        post(|Path(file_id): Path<String>| async move {
            Json(serde_json::json!({
                "transcript": format!("transcript for {}", file_id)
            }))
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake AI listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Fake AI server died");
    });

    format!("http://{}", addr)
}

/// Craft an access token that expired an hour ago, signed with the test
/// access secret (mirrors the service's claims shape).
#[allow(dead_code)]
pub fn expired_access_token(user_id: Uuid, config: &Config) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use sonara::services::auth::AccessClaims;

    let now = chrono::Utc::now().timestamp();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        iat: (now - 7200) as usize,
        exp: (now - 3600) as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&config.jwt_access_secret),
    )
    .expect("Failed to create expired token")
}
