use std::time::Duration;

use super::board::BoardSize;
use crate::config::Palette;
use crate::services::images::ImageSourceKind;

/// Everything a score recorder needs to know about a finished round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundSummary {
    pub board_size: BoardSize,
    pub moves: u32,
    pub elapsed: Duration,
    pub score: f64,
    pub image_source: ImageSourceKind,
    pub palette: Palette,
}

impl RoundSummary {
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed.as_secs()
    }
}

/// Maps a finished round to a score. Fewer moves and less time must never
/// score lower.
pub trait ScorePolicy {
    fn score(&self, board_size: BoardSize, moves: u32, elapsed: Duration) -> f64;
}

/// `10000 / (moves * seconds)`, with a 1.2x bonus on the 6x6 board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InverseScore;

impl ScorePolicy for InverseScore {
    fn score(&self, board_size: BoardSize, moves: u32, elapsed: Duration) -> f64 {
        let moves = moves.max(1) as f64;
        let secs = elapsed.as_secs().max(1) as f64;
        let mut base = 10_000.0 / (moves * secs);
        if board_size == BoardSize::Six {
            base *= 1.2;
        }
        (base * 100.0).round() / 100.0
    }
}

/// Time bonus plus move bonus, each floored at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BonusScore;

impl ScorePolicy for BonusScore {
    fn score(&self, _board_size: BoardSize, moves: u32, elapsed: Duration) -> f64 {
        let time_bonus = 10_000u64.saturating_sub(elapsed.as_secs().saturating_mul(10));
        let move_bonus = 5_000u64.saturating_sub(u64::from(moves) * 5);
        (time_bonus + move_bonus) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_increasing(policy: &dyn ScorePolicy, size: BoardSize) {
        let mut by_moves = f64::INFINITY;
        for moves in 1..200 {
            let score = policy.score(size, moves, Duration::from_secs(90));
            assert!(score <= by_moves, "score rose with more moves at {moves}");
            by_moves = score;
        }
        let mut by_time = f64::INFINITY;
        for secs in 0..2_000 {
            let score = policy.score(size, 20, Duration::from_secs(secs));
            assert!(score <= by_time, "score rose with more time at {secs}s");
            by_time = score;
        }
    }

    #[test]
    fn inverse_score_is_monotonic() {
        for size in BoardSize::ALL {
            non_increasing(&InverseScore, size);
        }
    }

    #[test]
    fn bonus_score_is_monotonic() {
        for size in BoardSize::ALL {
            non_increasing(&BonusScore, size);
        }
    }

    #[test]
    fn inverse_score_rewards_large_board() {
        let four = InverseScore.score(BoardSize::Four, 10, Duration::from_secs(40));
        let six = InverseScore.score(BoardSize::Six, 10, Duration::from_secs(40));
        assert_eq!(four, 25.0);
        assert_eq!(six, 30.0);
    }

    #[test]
    fn inverse_score_strictly_prefers_faster_rounds() {
        let fast = InverseScore.score(BoardSize::Four, 8, Duration::from_secs(20));
        let slow = InverseScore.score(BoardSize::Four, 8, Duration::from_secs(21));
        let sloppy = InverseScore.score(BoardSize::Four, 9, Duration::from_secs(20));
        assert!(fast > slow);
        assert!(fast > sloppy);
    }
}
