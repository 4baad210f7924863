// SPDX-License-Identifier: MIT

//! Sonara: privacy-first voice capture, web API and companion client.
//!
//! This crate provides the backend API for accounts, capture modes and
//! recording sessions, plus the client-side gateway that handles token
//! refresh and cross-device recording hand-off.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Db;
use services::{AuthService, TranscriberClient};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub auth: AuthService,
    pub transcriber: TranscriberClient,
}
