// SPDX-License-Identifier: MIT

//! Reconciliation of recordings captured outside an authenticated session.
//!
//! The external recorder hands a finished recording to the web client via
//! `file_id` / `mode` URL parameters. The reconciler claims that hand-off
//! into durable storage once, waits for authentication if necessary, and
//! converts the marker into exactly one session record. Marker deletion is
//! the commit point: it happens before the best-effort transcription
//! trigger, and a second concurrent attempt re-checks the marker behind a
//! gate so it can never double-create.

use crate::client::gateway::{ApiClient, ClientError, ModeInfo};
use crate::client::token_store::{PendingRecording, TokenStore};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Reconciliation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    /// No pending recording.
    Idle,
    /// A marker exists in durable storage.
    PendingDetected,
    /// Marker present but no authenticated user; waiting on a login.
    AwaitingAuth,
    /// Converting the marker into a session.
    Reconciling,
    /// Session created and marker cleared.
    Done,
}

/// What a completed reconciliation produced.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub session_id: Uuid,
    pub mode_slug: String,
    /// False when the auto-transcription request failed; the session
    /// still exists and the user can retry transcription manually.
    pub transcription_triggered: bool,
}

pub struct SessionReconciler {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    state: RwLock<ReconcilerState>,
    /// Serializes entry into the reconciling step.
    gate: Mutex<()>,
}

impl SessionReconciler {
    pub fn new(api: ApiClient, store: Arc<dyn TokenStore>) -> Self {
        let state = if store.pending_recording().is_some() {
            ReconcilerState::PendingDetected
        } else {
            ReconcilerState::Idle
        };
        Self {
            api,
            store,
            state: RwLock::new(state),
            gate: Mutex::new(()),
        }
    }

    pub fn state(&self) -> ReconcilerState {
        *self.state.read().unwrap()
    }

    fn set_state(&self, state: ReconcilerState) {
        *self.state.write().unwrap() = state;
    }

    /// Claim a recorder hand-off out of a page URL.
    ///
    /// If the URL carries a `file_id` parameter, the marker is persisted
    /// to durable storage and the cleaned URL (hand-off parameters
    /// removed) is returned so the shell can rewrite history; a refresh
    /// of the cleaned URL neither loses nor duplicates the marker.
    /// Storage is the sole source of truth from here on.
    pub fn claim_from_url(&self, raw_url: &str) -> Option<String> {
        let mut url = match reqwest::Url::parse(raw_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(url = raw_url, error = %e, "Unparseable page URL");
                return None;
            }
        };

        let mut file_id = None;
        let mut mode_hint = None;
        let mut remaining: Vec<(String, String)> = Vec::new();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "file_id" => file_id = Some(value.into_owned()),
                "mode" => mode_hint = Some(value.into_owned()),
                _ => remaining.push((key.into_owned(), value.into_owned())),
            }
        }

        let file_id = file_id?;

        self.store.set_pending_recording(PendingRecording {
            external_file_id: file_id,
            mode_hint,
        });
        self.set_state(ReconcilerState::PendingDetected);

        url.set_query(None);
        if !remaining.is_empty() {
            url.query_pairs_mut().extend_pairs(remaining);
        }
        Some(url.to_string())
    }

    /// Drive the marker to completion.
    ///
    /// Returns `Ok(None)` when there is nothing to do (no marker, or a
    /// concurrent attempt already committed). If the user is not
    /// authenticated this suspends on the gateway's auth channel and
    /// resumes on login. Errors leave the marker in place so a later
    /// invocation can retry.
    pub async fn run(&self) -> Result<Option<ReconcileOutcome>, ClientError> {
        if self.store.pending_recording().is_none() {
            self.set_state(ReconcilerState::Idle);
            return Ok(None);
        }
        self.set_state(ReconcilerState::PendingDetected);

        if !self.api.is_authenticated() {
            self.set_state(ReconcilerState::AwaitingAuth);
            tracing::info!("Pending recording detected, waiting for login");

            let mut auth_events = self.api.auth_events();
            while !*auth_events.borrow_and_update() {
                if auth_events.changed().await.is_err() {
                    return Err(ClientError::AuthenticationFailed);
                }
            }
        }

        let _guard = self.gate.lock().await;

        // Re-check after the gate: a concurrent attempt may have already
        // consumed the marker.
        let marker = match self.store.pending_recording() {
            Some(marker) => marker,
            None => return Ok(None),
        };

        self.set_state(ReconcilerState::Reconciling);
        match self.reconcile(&marker).await {
            Ok(outcome) => {
                self.set_state(ReconcilerState::Done);
                Ok(Some(outcome))
            }
            Err(e) => {
                // Marker untouched; the next page load can try again.
                self.set_state(ReconcilerState::PendingDetected);
                Err(e)
            }
        }
    }

    async fn reconcile(&self, marker: &PendingRecording) -> Result<ReconcileOutcome, ClientError> {
        let modes = self.api.modes().await?;
        if modes.is_empty() {
            return Err(ClientError::NoModesConfigured);
        }
        let mode = select_mode(&modes, marker.mode_hint.as_deref());

        let created = self
            .api
            .create_recorder_session(&marker.external_file_id, Some(&mode.slug), 0)
            .await?;

        tracing::info!(
            session_id = %created.session_id,
            file_id = %marker.external_file_id,
            mode = %mode.slug,
            "Pending recording attached to account"
        );

        // Commit point: from here the recording can never be attached twice.
        self.store.clear_pending_recording();

        // Best-effort auto-transcription; failure must not undo the commit.
        let transcription_triggered = match self.api.transcribe_session(created.session_id).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    session_id = %created.session_id,
                    error = %e,
                    "Auto-transcription failed, user can retry manually"
                );
                false
            }
        };

        Ok(ReconcileOutcome {
            session_id: created.session_id,
            mode_slug: mode.slug.clone(),
            transcription_triggered,
        })
    }
}

/// Pick the mode matching the hint, or the first available one.
fn select_mode<'a>(modes: &'a [ModeInfo], hint: Option<&str>) -> &'a ModeInfo {
    hint.and_then(|slug| modes.iter().find(|m| m.slug == slug))
        .unwrap_or(&modes[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(slug: &str) -> ModeInfo {
        ModeInfo {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            slug: slug.to_string(),
        }
    }

    #[test]
    fn test_select_mode_prefers_hint() {
        let modes = vec![mode("sync"), mode("scholar")];
        assert_eq!(select_mode(&modes, Some("scholar")).slug, "scholar");
    }

    #[test]
    fn test_select_mode_falls_back_to_first() {
        let modes = vec![mode("sync"), mode("scholar")];
        assert_eq!(select_mode(&modes, Some("unknown")).slug, "sync");
        assert_eq!(select_mode(&modes, None).slug, "sync");
    }
}
