//! Collaborators of the game core: image providers, score recording and
//! preference storage.
pub mod http;
pub mod images;
pub mod leaderboard;
pub mod preferences;

pub use images::{ImageLibrary, ImageSource, ImageSourceKind, SourceError, WithFallback};
pub use leaderboard::{
    LeaderboardEntry, LocalLeaderboard, RecorderError, RecorderSet, RemoteLeaderboard,
    ScoreRecorder,
};
pub use preferences::{FilePreferences, PreferencesError, PreferencesStore, RemotePreferences};
