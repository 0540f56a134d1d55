use std::time::Duration;

use super::board::BoardSize;
use super::score::RoundSummary;
use super::tile::{ImageId, TileId, TileStatus};
use super::timer::TimerToken;
use crate::config::Palette;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    NotStarted,
    /// Waiting on the image source; clicks are ignored.
    Loading,
    InProgress,
    Complete,
}

/// Notifications for the presentation layer, in emission order.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PhaseChanged(RoundPhase),
    BoardReady {
        size: BoardSize,
        tiles: Vec<(TileId, ImageId)>,
    },
    BoardCleared,
    TileChanged {
        tile: TileId,
        status: TileStatus,
    },
    SelectionChanged(Vec<TileId>),
    /// First tile of a pair is up; the countdown is armed but idle.
    FlipCountdownShown,
    FlipCountdown {
        remaining: Duration,
        duration: Duration,
        running: bool,
    },
    SessionTick {
        elapsed: Duration,
    },
    CountersChanged {
        moves: u32,
        matches: u32,
    },
    PaletteChanged(Palette),
    RoundComplete(RoundSummary),
    RoundFailed {
        reason: String,
    },
}

/// A deferred step the host loop must hand back through `GameController::wake`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wakeup {
    FlipTick(TimerToken),
    SessionTick(TimerToken),
    MatchSettled { round: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scheduled {
    pub after: Duration,
    pub wakeup: Wakeup,
}
