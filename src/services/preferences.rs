//! Where player preferences live between sessions.
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::http;
use super::images::ImageSourceKind;
use crate::config::{Color, Preferences, SessionContext};

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("preferences could not be encoded")]
    Json(#[from] serde_json::Error),

    #[error("preferences request failed")]
    Http(#[from] reqwest::Error),

    #[error("no session token configured")]
    NotSignedIn,
}

pub trait PreferencesStore: Send + Sync {
    fn load(&self) -> Result<Preferences, PreferencesError>;
    fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError>;
}

#[derive(Clone, Debug)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PreferencesError {
        PreferencesError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PreferencesStore for FilePreferences {
    /// A missing file yields the defaults.
    fn load(&self) -> Result<Preferences, PreferencesError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Preferences::from_json(&raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored preferences");
                Ok(Preferences::default())
            }
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }
}

#[derive(Serialize)]
struct RemoteUpdate<'a> {
    api: ImageSourceKind,
    color_found: &'a Color,
    color_closed: &'a Color,
}

/// Account preferences on the game backend. Only the image source and the
/// two colors are stored remotely; the board size is always the default.
#[derive(Clone, Debug)]
pub struct RemotePreferences {
    client: Client,
    session: SessionContext,
}

impl RemotePreferences {
    pub fn new(client: Client, session: SessionContext) -> Self {
        Self { client, session }
    }

    fn url(&self) -> String {
        http::endpoint(&self.session.api_url, "player/preferences")
    }

    fn token(&self) -> Result<&str, PreferencesError> {
        self.session
            .token
            .as_deref()
            .ok_or(PreferencesError::NotSignedIn)
    }
}

/// The backend answers with `preferred_api` but accepts `api` on save.
fn from_remote_body(body: &serde_json::Value) -> Preferences {
    let mut normalized = body.clone();
    if let Some(object) = normalized.as_object_mut()
        && !object.contains_key("api")
        && let Some(api) = object.remove("preferred_api")
    {
        object.insert("api".to_string(), api);
    }
    Preferences::from_json(&normalized.to_string())
}

impl PreferencesStore for RemotePreferences {
    fn load(&self) -> Result<Preferences, PreferencesError> {
        let response = self
            .client
            .get(self.url())
            .bearer_auth(self.token()?)
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            info!("no preferences stored for this account");
            return Ok(Preferences::default());
        }
        let body: serde_json::Value = response.error_for_status()?.json()?;
        Ok(from_remote_body(&body))
    }

    fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError> {
        let body = RemoteUpdate {
            api: prefs.image_source,
            color_found: &prefs.matched_color,
            color_closed: &prefs.closed_color,
        };
        self.client
            .post(self.url())
            .bearer_auth(self.token()?)
            .json(&body)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::game::board::BoardSize;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferences::new(dir.path().join("prefs.json"));
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferences::new(dir.path().join("config").join("prefs.json"));
        let prefs = Preferences {
            image_source: ImageSourceKind::Picsum,
            matched_color: Color::parse("#ff0000").unwrap(),
            closed_color: Color::default_closed(),
            board_size: BoardSize::Six,
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), prefs);
    }

    #[test]
    fn file_store_repairs_bad_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{"api": "dogs", "color_closed": "blue", "board_size": 9}"#).unwrap();
        let prefs = FilePreferences::new(&path).load().unwrap();
        assert_eq!(prefs.image_source, ImageSourceKind::Dogs);
        assert_eq!(prefs.closed_color, Color::default_closed());
        assert_eq!(prefs.board_size, BoardSize::Four);
    }

    #[test]
    fn remote_body_accepts_preferred_api() {
        let prefs = from_remote_body(&json!({
            "email": "someone@example.com",
            "preferred_api": "picsum",
            "color_found": "#000000",
            "color_closed": "#FFFFFF"
        }));
        assert_eq!(prefs.image_source, ImageSourceKind::Picsum);
        assert_eq!(prefs.matched_color.as_str(), "#000000");
        assert_eq!(prefs.closed_color.as_str(), "#ffffff");
    }

    #[test]
    fn remote_store_requires_token() {
        let store = RemotePreferences::new(Client::new(), SessionContext::default());
        assert!(matches!(store.load(), Err(PreferencesError::NotSignedIn)));
    }

    #[test]
    fn remote_update_omits_board_size() {
        let prefs = Preferences::default();
        let body = serde_json::to_value(RemoteUpdate {
            api: prefs.image_source,
            color_found: &prefs.matched_color,
            color_closed: &prefs.closed_color,
        })
        .unwrap();
        assert_eq!(body, json!({"api": "cats", "color_found": "#2ecc71", "color_closed": "#3498db"}));
    }
}
