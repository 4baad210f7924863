// SPDX-License-Identifier: MIT

//! Companion client: token storage, authenticated request gateway, and
//! cross-device recording reconciliation.

pub mod gateway;
pub mod reconciler;
pub mod token_store;

pub use gateway::{ApiClient, ClientError};
pub use reconciler::{ReconcileOutcome, ReconcilerState, SessionReconciler};
pub use token_store::{FileTokenStore, MemoryTokenStore, PendingRecording, TokenSnapshot, TokenStore};
