// SPDX-License-Identifier: MIT

//! Durable client-side storage for the token triple and the
//! pending-recording marker.
//!
//! The store is pure storage: no network calls, no TTL of its own.
//! Mutations replace the whole snapshot so a reader can never observe a
//! new access token paired with a stale refresh token.

use crate::models::UserSummary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;

/// The client's stored authentication state, replaced atomically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSnapshot {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub cached_user: Option<UserSummary>,
}

impl TokenSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Marker for a recording produced by the external recorder before the
/// user was authenticated. Created by the hand-off, consumed exactly once
/// by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRecording {
    pub external_file_id: String,
    pub mode_hint: Option<String>,
}

/// Client storage interface, injected into the gateway and reconciler so
/// tests can substitute an in-memory store.
pub trait TokenStore: Send + Sync {
    /// Current token triple.
    fn snapshot(&self) -> TokenSnapshot;
    /// Replace the whole triple in one operation.
    fn replace(&self, snapshot: TokenSnapshot);
    /// Drop all tokens and the cached user. Leaves the marker alone.
    fn clear(&self);

    fn pending_recording(&self) -> Option<PendingRecording>;
    fn set_pending_recording(&self, marker: PendingRecording);
    fn clear_pending_recording(&self);
}

// ─── In-memory store ─────────────────────────────────────────

/// Volatile store for tests and short-lived tooling.
#[derive(Default)]
pub struct MemoryTokenStore {
    state: RwLock<StoredState>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredState {
    tokens: TokenSnapshot,
    pending_recording: Option<PendingRecording>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn snapshot(&self) -> TokenSnapshot {
        self.state.read().unwrap().tokens.clone()
    }

    fn replace(&self, snapshot: TokenSnapshot) {
        self.state.write().unwrap().tokens = snapshot;
    }

    fn clear(&self) {
        self.state.write().unwrap().tokens = TokenSnapshot::default();
    }

    fn pending_recording(&self) -> Option<PendingRecording> {
        self.state.read().unwrap().pending_recording.clone()
    }

    fn set_pending_recording(&self, marker: PendingRecording) {
        self.state.write().unwrap().pending_recording = Some(marker);
    }

    fn clear_pending_recording(&self) {
        self.state.write().unwrap().pending_recording = None;
    }
}

// ─── File-backed store ───────────────────────────────────────

/// Durable store backed by a JSON file. Writes go to a temporary file
/// followed by a rename, so the on-disk state is always a complete
/// snapshot even if the process dies mid-write.
pub struct FileTokenStore {
    path: PathBuf,
    state: RwLock<StoredState>,
}

impl FileTokenStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Token store unreadable, starting empty");
                StoredState::default()
            }),
            Err(_) => StoredState::default(),
        };

        Self {
            path,
            state: RwLock::new(state),
        }
    }

    fn persist(&self, state: &StoredState) {
        let tmp = self.path.with_extension("tmp");
        let result = serde_json::to_vec_pretty(state)
            .map_err(std::io::Error::other)
            .and_then(|bytes| std::fs::write(&tmp, bytes))
            .and_then(|_| std::fs::rename(&tmp, &self.path));

        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist token store");
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut StoredState)) {
        let mut state = self.state.write().unwrap();
        f(&mut state);
        self.persist(&state);
    }
}

impl TokenStore for FileTokenStore {
    fn snapshot(&self) -> TokenSnapshot {
        self.state.read().unwrap().tokens.clone()
    }

    fn replace(&self, snapshot: TokenSnapshot) {
        self.mutate(|s| s.tokens = snapshot);
    }

    fn clear(&self) {
        self.mutate(|s| s.tokens = TokenSnapshot::default());
    }

    fn pending_recording(&self) -> Option<PendingRecording> {
        self.state.read().unwrap().pending_recording.clone()
    }

    fn set_pending_recording(&self, marker: PendingRecording) {
        self.mutate(|s| s.pending_recording = Some(marker));
    }

    fn clear_pending_recording(&self) {
        self.mutate(|s| s.pending_recording = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> TokenSnapshot {
        TokenSnapshot {
            access_token: Some("access".to_string()),
            refresh_token: Some("refresh".to_string()),
            cached_user: None,
        }
    }

    #[test]
    fn test_memory_store_replace_and_clear() {
        let store = MemoryTokenStore::new();
        assert!(!store.snapshot().is_authenticated());

        store.replace(sample_snapshot());
        assert!(store.snapshot().is_authenticated());

        store.clear();
        assert_eq!(store.snapshot(), TokenSnapshot::default());
    }

    #[test]
    fn test_clear_does_not_touch_pending_marker() {
        let store = MemoryTokenStore::new();
        store.set_pending_recording(PendingRecording {
            external_file_id: "abc123".to_string(),
            mode_hint: None,
        });

        store.replace(sample_snapshot());
        store.clear();

        assert!(store.pending_recording().is_some());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        {
            let store = FileTokenStore::open(&path);
            store.replace(sample_snapshot());
            store.set_pending_recording(PendingRecording {
                external_file_id: "abc123".to_string(),
                mode_hint: Some("scholar".to_string()),
            });
        }

        let reopened = FileTokenStore::open(&path);
        assert_eq!(reopened.snapshot(), sample_snapshot());
        assert_eq!(
            reopened.pending_recording().unwrap().external_file_id,
            "abc123"
        );
    }

    #[test]
    fn test_file_store_tolerates_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = FileTokenStore::open(&path);
        assert_eq!(store.snapshot(), TokenSnapshot::default());
    }
}
