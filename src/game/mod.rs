//! Headless game core: board, timers, scoring and the round state machine.
pub mod board;
pub mod clock;
pub mod controller;
pub mod error;
pub mod events;
pub mod score;
pub mod tile;
pub mod timer;

pub use board::{Board, BoardSize};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{GameController, RoundRequest, RoundTicket};
pub use error::{BoardError, GameError, TimingError};
pub use events::{GameEvent, RoundPhase, Scheduled, Wakeup};
pub use score::{BonusScore, InverseScore, RoundSummary, ScorePolicy};
pub use tile::{ImageId, Tile, TileId, TileStatus};
pub use timer::{RoundTimer, SessionTimer, TimerTick, TimerToken, Timing};
