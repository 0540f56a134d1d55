//! Score recording and the top-scores list.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::http;
use super::images::ImageSourceKind;
use crate::config::{Color, SessionContext};
use crate::game::board::BoardSize;
use crate::game::score::RoundSummary;

/// Entries shown on the leaderboard.
pub const SHOWN_ENTRIES: usize = 5;
/// Entries kept in the local file.
pub const LOCAL_CAPACITY: usize = 10;
pub const LOCAL_LABEL: &str = "Local";

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("leaderboard data is malformed")]
    Json(#[from] serde_json::Error),

    #[error("leaderboard request failed")]
    Http(#[from] reqwest::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub label: String,
    pub score: f64,
    pub moves: Option<u32>,
    pub time_secs: Option<u64>,
    pub board_size: Option<u8>,
}

/// Receives finished rounds. `record` never fails from the caller's point
/// of view; implementations log their own problems.
pub trait ScoreRecorder: Send + Sync {
    fn record(&self, summary: &RoundSummary);

    /// Blocks until work started by earlier `record` calls has finished.
    fn flush(&self) {}

    /// Best scores first, ranked from 1, at most [`SHOWN_ENTRIES`].
    fn top_scores(&self) -> Result<Vec<LeaderboardEntry>, RecorderError>;
}

fn ranked(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    entries.truncate(SHOWN_ENTRIES);
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct StoredScore {
    score: f64,
    moves: u32,
    time: u64,
    board_size: BoardSize,
    recorded_at: u64,
}

/// Best scores on this machine, kept in a JSON file.
#[derive(Debug)]
pub struct LocalLeaderboard {
    path: PathBuf,
    scores: Arc<Mutex<Vec<StoredScore>>>,
    file: Arc<Mutex<()>>,
    saves: Mutex<Vec<JoinHandle<()>>>,
}

impl LocalLeaderboard {
    /// Opens the file at `path`. A missing or unreadable file starts an
    /// empty board.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let scores = match load_scores(&path) {
            Ok(scores) => scores,
            Err(err) => {
                warn!(path = %path.display(), "starting with an empty local leaderboard: {err}");
                Vec::new()
            }
        };
        Self {
            path,
            scores: Arc::new(Mutex::new(scores)),
            file: Arc::new(Mutex::new(())),
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the scores on a background thread. Writers take the file lock
    /// before reading the list, so the last save holds the newest scores.
    fn save_in_background(&self) {
        let path = self.path.clone();
        let scores = Arc::clone(&self.scores);
        let file = Arc::clone(&self.file);
        let spawned = std::thread::Builder::new()
            .name("score-save".into())
            .spawn(move || write_scores(&path, &scores, &file));

        let mut saves = self.saves.lock().unwrap_or_else(PoisonError::into_inner);
        saves.retain(|handle| !handle.is_finished());
        match spawned {
            Ok(handle) => saves.push(handle),
            Err(err) => {
                warn!("could not start leaderboard save, writing inline: {err}");
                write_scores(&self.path, &self.scores, &self.file);
            }
        }
    }
}

fn write_scores(path: &Path, scores: &Mutex<Vec<StoredScore>>, file: &Mutex<()>) {
    let _file = file.lock().unwrap_or_else(PoisonError::into_inner);
    let snapshot = scores.lock().unwrap_or_else(PoisonError::into_inner).clone();
    if let Err(err) = save_scores(path, &snapshot) {
        warn!(path = %path.display(), "could not save local leaderboard: {err}");
    }
}

fn save_scores(path: &Path, scores: &[StoredScore]) -> Result<(), RecorderError> {
    let io_err = |source| RecorderError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(scores)?;
    fs::write(path, json).map_err(io_err)
}

fn load_scores(path: &Path) -> Result<Vec<StoredScore>, RecorderError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(RecorderError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    Ok(serde_json::from_str(&raw)?)
}

impl ScoreRecorder for LocalLeaderboard {
    fn record(&self, summary: &RoundSummary) {
        let mut scores = self.scores.lock().unwrap_or_else(PoisonError::into_inner);
        scores.push(StoredScore {
            score: summary.score,
            moves: summary.moves,
            time: summary.elapsed_secs(),
            board_size: summary.board_size,
            recorded_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        });
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        scores.truncate(LOCAL_CAPACITY);
        drop(scores);
        self.save_in_background();
    }

    fn flush(&self) {
        let pending = std::mem::take(&mut *self.saves.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in pending {
            if handle.join().is_err() {
                warn!(path = %self.path.display(), "leaderboard save thread panicked");
            }
        }
    }

    fn top_scores(&self) -> Result<Vec<LeaderboardEntry>, RecorderError> {
        let scores = self.scores.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(ranked(
            scores
                .iter()
                .map(|s| LeaderboardEntry {
                    rank: 0,
                    label: LOCAL_LABEL.to_string(),
                    score: s.score,
                    moves: Some(s.moves),
                    time_secs: Some(s.time),
                    board_size: Some(s.board_size.dimension()),
                })
                .collect(),
        ))
    }
}

/// Body of `POST /game/save`.
#[derive(Clone, Debug, Serialize)]
struct SavedGame {
    id: String,
    score: f64,
    moves: u32,
    time: u64,
    #[serde(rename = "boardSize")]
    board_size: u8,
    api: ImageSourceKind,
    color_found: Color,
    color_closed: Color,
}

impl SavedGame {
    fn new(player_id: &str, summary: &RoundSummary) -> Self {
        Self {
            id: player_id.to_string(),
            score: summary.score,
            moves: summary.moves,
            time: summary.elapsed_secs(),
            board_size: summary.board_size.dimension(),
            api: summary.image_source,
            color_found: summary.palette.matched.clone(),
            color_closed: summary.palette.closed.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteScore {
    username: Option<String>,
    score: f64,
    moves: Option<u32>,
    time: Option<u64>,
    #[serde(rename = "boardSize")]
    board_size: Option<u8>,
}

impl From<RemoteScore> for LeaderboardEntry {
    fn from(remote: RemoteScore) -> Self {
        Self {
            rank: 0,
            label: remote.username.unwrap_or_else(|| "Anonymous".to_string()),
            score: remote.score,
            moves: remote.moves,
            time_secs: remote.time,
            board_size: remote.board_size,
        }
    }
}

/// Shared leaderboard on the game backend.
#[derive(Clone, Debug)]
pub struct RemoteLeaderboard {
    client: Client,
    session: SessionContext,
}

impl RemoteLeaderboard {
    pub fn new(client: Client, session: SessionContext) -> Self {
        Self { client, session }
    }

    fn upload(client: &Client, url: &str, token: &str, body: &SavedGame) -> Result<(), RecorderError> {
        client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

impl ScoreRecorder for RemoteLeaderboard {
    fn record(&self, summary: &RoundSummary) {
        let Some((token, player_id)) = self.session.score_identity() else {
            info!("no token or player id, skipping remote score save");
            return;
        };
        let body = SavedGame::new(player_id, summary);
        let url = http::endpoint(&self.session.api_url, "game/save");
        let client = self.client.clone();
        let token = token.to_string();

        let spawned = std::thread::Builder::new()
            .name("score-upload".into())
            .spawn(move || match Self::upload(&client, &url, &token, &body) {
                Ok(()) => debug!(score = body.score, "score saved to backend"),
                Err(err) => warn!(%url, "failed to save score: {err}"),
            });
        if let Err(err) = spawned {
            warn!("could not start score upload: {err}");
        }
    }

    fn top_scores(&self) -> Result<Vec<LeaderboardEntry>, RecorderError> {
        let url = http::endpoint(&self.session.api_url, "memory/top-scores");
        let request = http::with_bearer(self.client.get(&url), self.session.token.as_deref());
        let scores: Vec<RemoteScore> = request.send()?.error_for_status()?.json()?;
        Ok(ranked(scores.into_iter().map(LeaderboardEntry::from).collect()))
    }
}

/// Fans every summary out to all recorders. `top_scores` answers from the
/// first recorder that succeeds, in insertion order.
#[derive(Clone, Default)]
pub struct RecorderSet {
    recorders: Vec<Arc<dyn ScoreRecorder>>,
}

impl RecorderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, recorder: Arc<dyn ScoreRecorder>) -> Self {
        self.recorders.push(recorder);
        self
    }
}

impl ScoreRecorder for RecorderSet {
    fn record(&self, summary: &RoundSummary) {
        for recorder in &self.recorders {
            recorder.record(summary);
        }
    }

    fn flush(&self) {
        for recorder in &self.recorders {
            recorder.flush();
        }
    }

    fn top_scores(&self) -> Result<Vec<LeaderboardEntry>, RecorderError> {
        let mut last_error = None;
        for recorder in &self.recorders {
            match recorder.top_scores() {
                Ok(entries) => return Ok(entries),
                Err(err) => {
                    warn!("top scores unavailable, trying next recorder: {err}");
                    last_error = Some(err);
                }
            }
        }
        match last_error {
            Some(err) => Err(err),
            None => Ok(Vec::new()),
        }
    }
}
