//! Error types raised by the core when a round cannot be set up.
//!
//! Ignored input (clicks while locked, stale timer wakeups) is not an error
//! and never surfaces here.
use std::time::Duration;

use thiserror::Error;

use super::tile::ImageId;
use crate::services::images::SourceError;

pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("unsupported board size {0}; expected one of 4, 6")]
    UnsupportedBoardSize(u8),

    #[error("a {dimension}x{dimension} board needs {expected} distinct images, got {actual}")]
    ImageCount {
        dimension: u8,
        expected: usize,
        actual: usize,
    },

    #[error("image `{0}` was supplied more than once")]
    DuplicateImage(ImageId),
}

/// Rejected [`Timing`](super::timer::Timing) values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimingError {
    #[error("the {0} tick interval must be non-zero")]
    ZeroTick(&'static str),

    #[error("match delay {match_delay:?} must be shorter than the flip countdown {flip_duration:?}")]
    MatchDelayTooLong {
        match_delay: Duration,
        flip_duration: Duration,
    },
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid round configuration")]
    InvalidConfiguration(#[from] BoardError),

    #[error("invalid timing")]
    InvalidTiming(#[from] TimingError),

    #[error("image source failed")]
    ImageSource(#[from] SourceError),
}
