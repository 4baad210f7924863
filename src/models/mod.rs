// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod mode;
pub mod session;
pub mod user;

pub use mode::Mode;
pub use session::Session;
pub use user::{RefreshTokenRecord, Role, User, UserSummary};
