//! Game settings and preferences
//!
//! Only the values the simulation reads. Persisting them is the host's job.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "facil",
            Difficulty::Medium => "medio",
            Difficulty::Hard => "dificil",
        }
    }

    /// Unknown tier names fall back to medium
    pub fn from_str_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// Cycle easy → medium → hard → easy (settings screen toggle)
    pub fn next(&self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }
}

/// Accepts both the stored tier names and their English aliases
impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "facil" | "fácil" | "easy" => Ok(Difficulty::Easy),
            "medio" | "medium" | "med" => Ok(Difficulty::Medium),
            "dificil" | "difícil" | "hard" => Ok(Difficulty::Hard),
            _ => Err(UnknownDifficulty(s.to_string())),
        }
    }
}

/// Tier name that matches no difficulty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDifficulty(pub String);

impl std::fmt::Display for UnknownDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown difficulty `{}`", self.0)
    }
}

impl std::error::Error for UnknownDifficulty {}

/// Something that can tell a level which difficulty the player picked
pub trait SettingsProvider {
    fn difficulty(&self) -> Difficulty;

    /// Whether on-screen touch buttons are shown
    fn touch_controls(&self) -> bool {
        true
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub difficulty: Difficulty,

    // === Audio ===
    pub sound_effects: bool,
    pub music: bool,
    /// Effects volume (0.0 - 1.0)
    pub effects_volume: f32,

    // === HUD ===
    /// Show the on-screen touch buttons
    pub touch_controls: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            sound_effects: true,
            music: true,
            effects_volume: 0.3,
            touch_controls: true,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn set_effects_volume(&mut self, vol: f32) {
        self.effects_volume = vol.clamp(0.0, 1.0);
    }
}

impl SettingsProvider for Settings {
    fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    fn touch_controls(&self) -> bool {
        self.touch_controls
    }
}
