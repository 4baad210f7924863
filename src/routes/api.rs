// SPDX-License-Identifier: MIT

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Mode, Session, UserSummary};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// API routes (require authentication via the bearer-token middleware,
/// applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/modes", get(list_modes))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/transcribe", post(transcribe_session))
        .route("/recorder/session", post(create_recorder_session))
}

// ─── User Profile ────────────────────────────────────────────

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserSummary>> {
    let profile = state
        .db
        .get_user(user.user_id)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(profile.summary()))
}

// ─── Modes ───────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeResponse {
    #[serde(flatten)]
    pub mode: Mode,
    pub session_count: usize,
}

/// List the capture-mode catalogue with per-mode session counts.
async fn list_modes(State(state): State<Arc<AppState>>) -> Json<Vec<ModeResponse>> {
    let modes = state
        .db
        .list_modes()
        .into_iter()
        .map(|mode| {
            let session_count = state.db.session_count_for_mode(mode.id);
            ModeResponse {
                mode,
                session_count,
            }
        })
        .collect();

    Json(modes)
}

// ─── Sessions ────────────────────────────────────────────────

#[derive(Deserialize)]
struct SessionsQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<Session>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// List the authenticated user's sessions, newest first.
async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SessionsQuery>,
) -> Json<SessionsResponse> {
    let all = state.db.list_sessions_for_user(user.user_id);
    let total = all.len();
    let sessions = all
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();

    Json(SessionsResponse {
        sessions,
        total,
        limit: query.limit,
        offset: query.offset,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionPayload {
    title: Option<String>,
    mode_id: Option<Uuid>,
    #[serde(default)]
    duration: u32,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    external_file_id: Option<String>,
}

/// Create a session explicitly (dashboard flow).
async fn create_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<(StatusCode, Json<Session>)> {
    let (title, mode_id) = match (payload.title, payload.mode_id) {
        (Some(t), Some(m)) if !t.is_empty() => (t, m),
        _ => {
            return Err(AppError::Validation(
                "Title and mode are required".to_string(),
            ))
        }
    };

    let mode = state
        .db
        .get_mode(mode_id)
        .ok_or_else(|| AppError::BadRequest("Invalid mode".to_string()))?;

    let session = Session {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        title,
        mode_id: mode.id,
        duration_secs: payload.duration,
        external_file_id: payload.external_file_id,
        transcript: None,
        notes: payload.notes,
        created_at: Utc::now(),
    };
    state.db.insert_session(session.clone());

    Ok((StatusCode::CREATED, Json(session)))
}

/// Get a single session owned by the authenticated user.
async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>> {
    let session = state
        .db
        .get_session_for_user(id, user.user_id)
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    Ok(Json(session))
}

// ─── Recorder Hand-off ───────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSessionPayload {
    file_id: Option<String>,
    #[serde(default)]
    mode_slug: Option<String>,
    #[serde(default)]
    duration: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSessionResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub session: Session,
}

/// Create a session for a recording captured by the external recorder.
///
/// Falls back from the requested mode slug to the first catalogue entry;
/// an empty catalogue is a configuration error the client cannot recover
/// from, reported as `no_modes`.
async fn create_recorder_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<RecorderSessionPayload>,
) -> Result<(StatusCode, Json<RecorderSessionResponse>)> {
    let file_id = payload
        .file_id
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::Validation("File ID is required".to_string()))?;

    let mode = match payload.mode_slug.as_deref() {
        Some(slug) => state.db.find_mode_by_slug(slug),
        None => None,
    }
    .or_else(|| state.db.list_modes().into_iter().next())
    .ok_or_else(|| AppError::BadRequest("No modes available".to_string()))?;

    let session = Session {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        title: "Untitled".to_string(),
        mode_id: mode.id,
        duration_secs: payload.duration,
        external_file_id: Some(file_id),
        transcript: None,
        notes: Some("Captured via mobile recorder".to_string()),
        created_at: Utc::now(),
    };
    state.db.insert_session(session.clone());

    tracing::info!(
        session_id = %session.id,
        user_id = %user.user_id,
        mode = %mode.slug,
        "Recorder session created"
    );

    Ok((
        StatusCode::CREATED,
        Json(RecorderSessionResponse {
            success: true,
            session_id: session.id,
            session,
        }),
    ))
}

// ─── Transcription ───────────────────────────────────────────

#[derive(Serialize)]
pub struct TranscribeResponse {
    pub message: String,
    pub transcript: String,
    pub session: Session,
}

/// Transcribe the audio behind a session via the AI service and persist
/// the transcript.
async fn transcribe_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TranscribeResponse>> {
    let session = state
        .db
        .get_session_for_user(id, user.user_id)
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let file_id = session.external_file_id.as_deref().ok_or_else(|| {
        AppError::BadRequest("No audio file associated with this session".to_string())
    })?;

    tracing::info!(session_id = %id, file_id = %file_id, "Starting transcription");

    let result = state.transcriber.transcribe(file_id).await?;

    let session = state
        .db
        .set_session_transcript(id, result.transcript.clone())
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    Ok(Json(TranscribeResponse {
        message: "Transcription complete".to_string(),
        transcript: result.transcript,
        session,
    }))
}
