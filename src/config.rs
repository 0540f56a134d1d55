//! Player preferences and session settings.
//!
//! Preferences are validated once when loaded; anything that fails
//! validation falls back to its default so the game always starts with a
//! usable configuration.
use std::fmt;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::board::BoardSize;
use crate::services::images::ImageSourceKind;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
const PREFERENCES_FILE_NAME: &str = "preferences.json";
const LEADERBOARD_FILE_NAME: &str = "leaderboard.json";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("`{0}` is not a #rrggbb color")]
pub struct InvalidColor(pub String);

/// `#rrggbb`, stored lowercase.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub fn parse(raw: &str) -> Result<Self, InvalidColor> {
        let value = raw.trim();
        let valid = value.len() == 7
            && value.starts_with('#')
            && value[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(InvalidColor(raw.to_string()));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{r:02x}{g:02x}{b:02x}"))
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        let channel = |at: usize| u8::from_str_radix(&self.0[at..at + 2], 16).unwrap_or(0);
        (channel(1), channel(3), channel(5))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn default_matched() -> Self {
        Self("#2ecc71".to_string())
    }

    pub fn default_closed() -> Self {
        Self("#3498db".to_string())
    }
}

impl TryFrom<String> for Color {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorRole {
    Matched,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub matched: Color,
    pub closed: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            matched: Color::default_matched(),
            closed: Color::default_closed(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    #[serde(rename = "api")]
    pub image_source: ImageSourceKind,
    #[serde(rename = "color_found")]
    pub matched_color: Color,
    #[serde(rename = "color_closed")]
    pub closed_color: Color,
    pub board_size: BoardSize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            image_source: ImageSourceKind::default(),
            matched_color: Color::default_matched(),
            closed_color: Color::default_closed(),
            board_size: BoardSize::default(),
        }
    }
}

impl Preferences {
    /// Parses stored preferences field by field; an invalid field keeps its
    /// default instead of discarding the whole record.
    pub fn from_json(raw: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("preferences are not valid JSON, using defaults: {err}");
                return Self::default();
            }
        };
        let mut prefs = Self::default();
        if let Some(kind) = field::<ImageSourceKind>(&value, "api") {
            prefs.image_source = kind;
        }
        if let Some(color) = field::<Color>(&value, "color_found") {
            prefs.matched_color = color;
        }
        if let Some(color) = field::<Color>(&value, "color_closed") {
            prefs.closed_color = color;
        }
        if let Some(size) = field::<BoardSize>(&value, "board_size") {
            prefs.board_size = size;
        }
        prefs
    }

    pub fn palette(&self) -> Palette {
        Palette {
            matched: self.matched_color.clone(),
            closed: self.closed_color.clone(),
        }
    }
}

fn field<T: serde::de::DeserializeOwned>(value: &serde_json::Value, key: &str) -> Option<T> {
    let raw = value.get(key)?;
    match serde_json::from_value(raw.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!("ignoring preference `{key}`: {err}");
            None
        }
    }
}

/// Credentials and endpoint for the leaderboard backend, passed explicitly
/// to the collaborators that need them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    pub api_url: String,
    pub token: Option<String>,
    pub player_id: Option<String>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            player_id: None,
        }
    }
}

impl SessionContext {
    /// Reads `PAIRS_API_URL`, `PAIRS_TOKEN` and `PAIRS_PLAYER_ID`, after
    /// loading a `.env` file if one exists.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            api_url: non_empty("PAIRS_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: non_empty("PAIRS_TOKEN"),
            player_id: non_empty("PAIRS_PLAYER_ID"),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    /// Token and player id, both needed to save a score to the backend.
    pub fn score_identity(&self) -> Option<(&str, &str)> {
        Some((self.token.as_deref()?, self.player_id.as_deref()?))
    }

    pub fn can_save_scores(&self) -> bool {
        self.score_identity().is_some()
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "pairs", "Pairs")
}

pub fn preferences_path() -> Option<PathBuf> {
    Some(project_dirs()?.config_dir().join(PREFERENCES_FILE_NAME))
}

pub fn leaderboard_path() -> Option<PathBuf> {
    Some(project_dirs()?.data_dir().join(LEADERBOARD_FILE_NAME))
}
