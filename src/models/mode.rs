// SPDX-License-Identifier: MIT

//! Capture mode model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A capture mode (lecture, meeting, interview, ...). Modes are seeded at
/// startup and referenced by sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mode {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub icon: String,
    pub color: String,
}

impl Mode {
    pub fn new(name: &str, slug: &str, description: &str, icon: &str, color: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
        }
    }
}

/// The built-in mode catalogue, installed when the store is empty.
pub fn default_modes() -> Vec<Mode> {
    vec![
        Mode::new("Sync", "sync", "Team meetings and standups", "users", "#5DD62C"),
        Mode::new("Scholar", "scholar", "Lectures and study sessions", "book", "#7BE94D"),
        Mode::new("Probe", "probe", "Interviews and user research", "mic", "#5DD62C"),
        Mode::new("Reflect", "reflect", "Personal journaling", "feather", "#7BE94D"),
        Mode::new("Care", "care", "Healthcare consultations", "heart", "#5DD62C"),
        Mode::new("Verdict", "verdict", "Legal proceedings", "scale", "#7BE94D"),
        Mode::new("Spark", "spark", "Brainstorming sessions", "zap", "#5DD62C"),
    ]
}
