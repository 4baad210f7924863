// SPDX-License-Identifier: MIT

//! Recording session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A captured recording session owned by a user.
///
/// `external_file_id` points at the audio file held by the recorder /
/// AI service. It is a first-class field so the transcription route can
/// find the file without scraping free-text notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub mode_id: Uuid,
    pub duration_secs: u32,
    pub external_file_id: Option<String>,
    pub transcript: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
