// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod auth;
pub mod transcriber;

pub use auth::{AuthService, LoginOutcome, TokenPair};
pub use transcriber::TranscriberClient;
