// SPDX-License-Identifier: MIT

//! In-memory store with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts keyed by id, with an email index)
//! - Refresh tokens (keyed by opaque token value, individually revocable)
//! - Modes (seeded capture-mode catalogue)
//! - Sessions (recordings owned by users)
//!
//! Relational persistence is out of scope for this service; the store is
//! process-local and all operations are single-key reads/writes.

use crate::error::AppError;
use crate::models::{Mode, RefreshTokenRecord, Role, Session, User};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Shared store handle. Cloning is cheap and all clones see the same data.
#[derive(Clone, Default)]
pub struct Db {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    users: DashMap<Uuid, User>,
    /// Email -> user id index. Insertion through `entry` doubles as the
    /// duplicate-email check.
    emails: DashMap<String, Uuid>,
    refresh_tokens: DashMap<String, RefreshTokenRecord>,
    modes: DashMap<Uuid, Mode>,
    sessions: DashMap<Uuid, Session>,
}

impl Db {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Create a user account. Fails with `DuplicateEmail` if the email is
    /// already registered; the email index entry is the atomicity point.
    pub fn create_user(
        &self,
        email: &str,
        password_hash: String,
        name: Option<String>,
    ) -> Result<User, AppError> {
        let id = Uuid::new_v4();

        match self.inner.emails.entry(email.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(AppError::DuplicateEmail),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let user = User {
            id,
            email: email.to_string(),
            password_hash,
            name,
            role: Role::User,
            created_at: Utc::now(),
            last_login_at: None,
            last_login_ip: None,
        };
        self.inner.users.insert(id, user.clone());
        Ok(user)
    }

    /// Get a user by id.
    pub fn get_user(&self, id: Uuid) -> Option<User> {
        self.inner.users.get(&id).map(|u| u.clone())
    }

    /// Get a user by email address.
    pub fn get_user_by_email(&self, email: &str) -> Option<User> {
        let id = *self.inner.emails.get(email)?;
        self.get_user(id)
    }

    /// Record last-login metadata as a side effect of a successful login.
    pub fn record_login(&self, id: Uuid, ip: Option<String>) {
        if let Some(mut user) = self.inner.users.get_mut(&id) {
            user.last_login_at = Some(Utc::now());
            user.last_login_ip = ip;
        }
    }

    // ─── Refresh Token Operations ────────────────────────────────

    /// Store a refresh-token record keyed by the opaque token value.
    pub fn insert_refresh_token(&self, token: &str, record: RefreshTokenRecord) {
        self.inner.refresh_tokens.insert(token.to_string(), record);
    }

    /// Atomically remove and return the record for a token value.
    ///
    /// This is the single-use rotation point: of any number of concurrent
    /// exchanges for the same value, exactly one observes the record.
    pub fn consume_refresh_token(&self, token: &str) -> Option<RefreshTokenRecord> {
        self.inner
            .refresh_tokens
            .remove(token)
            .map(|(_, record)| record)
    }

    /// Delete a record if present. Used by logout; missing tokens are fine.
    pub fn delete_refresh_token(&self, token: &str) {
        self.inner.refresh_tokens.remove(token);
    }

    /// Number of live refresh-token records (test observability).
    pub fn refresh_token_count(&self) -> usize {
        self.inner.refresh_tokens.len()
    }

    // ─── Mode Operations ─────────────────────────────────────────

    /// Install the given modes if the catalogue is empty.
    pub fn seed_modes(&self, modes: Vec<Mode>) {
        if !self.inner.modes.is_empty() {
            return;
        }
        for mode in modes {
            self.inner.modes.insert(mode.id, mode);
        }
    }

    /// All modes, sorted by name.
    pub fn list_modes(&self) -> Vec<Mode> {
        let mut modes: Vec<Mode> = self.inner.modes.iter().map(|m| m.clone()).collect();
        modes.sort_by(|a, b| a.name.cmp(&b.name));
        modes
    }

    pub fn get_mode(&self, id: Uuid) -> Option<Mode> {
        self.inner.modes.get(&id).map(|m| m.clone())
    }

    pub fn find_mode_by_slug(&self, slug: &str) -> Option<Mode> {
        self.inner
            .modes
            .iter()
            .find(|m| m.slug == slug)
            .map(|m| m.clone())
    }

    // ─── Session Operations ──────────────────────────────────────

    pub fn insert_session(&self, session: Session) {
        self.inner.sessions.insert(session.id, session);
    }

    /// Sessions owned by a user, newest first.
    pub fn list_sessions_for_user(&self, user_id: Uuid) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .inner
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    /// A session by id, only if owned by the given user.
    pub fn get_session_for_user(&self, id: Uuid, user_id: Uuid) -> Option<Session> {
        self.inner
            .sessions
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .map(|s| s.clone())
    }

    /// Attach a transcript to a session, returning the updated record.
    pub fn set_session_transcript(&self, id: Uuid, transcript: String) -> Option<Session> {
        self.inner.sessions.get_mut(&id).map(|mut s| {
            s.transcript = Some(transcript);
            s.clone()
        })
    }

    /// Number of sessions referencing a mode.
    pub fn session_count_for_mode(&self, mode_id: Uuid) -> usize {
        self.inner
            .sessions
            .iter()
            .filter(|s| s.mode_id == mode_id)
            .count()
    }
}
