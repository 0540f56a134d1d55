mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::Harness;
use pairs::config::Preferences;
use pairs::game::{
    BoardSize, BonusScore, GameController, GameError, GameEvent, ImageId, RoundPhase, ScorePolicy,
    TileId, TileStatus, Timing, TimingError, Wakeup,
};

const MATCH_DELAY: Duration = Duration::from_millis(500);
const FLIP_DURATION: Duration = Duration::from_millis(3000);

fn status(h: &Harness, tile: TileId) -> TileStatus {
    h.game.board().tile(tile).map(|t| t.status()).unwrap()
}

fn play_perfect_round(h: &mut Harness) {
    for (a, b) in h.pairs() {
        h.click(a);
        h.click(b);
        h.advance(MATCH_DELAY);
    }
}

#[test]
fn fresh_boards_hold_every_image_twice() {
    for size in BoardSize::ALL {
        let mut h = Harness::new(size);
        h.start();

        let tiles = h.game.board().tiles();
        assert_eq!(tiles.len(), size.tile_count());
        let mut counts: HashMap<&ImageId, usize> = HashMap::new();
        for tile in tiles {
            *counts.entry(tile.image()).or_default() += 1;
            assert_eq!(tile.status(), TileStatus::Hidden);
        }
        assert_eq!(counts.len(), size.pair_count());
        assert!(counts.values().all(|&n| n == 2));
    }
}

#[test]
fn seeds_change_the_layout() {
    let layout = |seed: u64| {
        let mut h = Harness::with_controller(BoardSize::Six, |g| g.with_seed(seed));
        h.start();
        h.game
            .board()
            .tiles()
            .iter()
            .map(|t| t.image().clone())
            .collect::<Vec<_>>()
    };
    let first = layout(1);
    let second = layout(2);
    assert_ne!(first, second);

    let mut a = first.clone();
    let mut b = second.clone();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn matching_pair_counts_one_move_then_settles() {
    let mut h = Harness::new(BoardSize::Four);
    h.start();
    let (a, b) = h.pairs()[0];

    h.click(a);
    h.click(b);
    assert_eq!(h.game.moves(), 1);
    assert_eq!(h.game.matches(), 0);
    assert!(h.game.is_processing());

    h.advance(MATCH_DELAY - Duration::from_millis(1));
    assert_eq!(status(&h, a), TileStatus::Flipped);

    h.advance(Duration::from_millis(1));
    assert_eq!(status(&h, a), TileStatus::Matched);
    assert_eq!(status(&h, b), TileStatus::Matched);
    assert_eq!(h.game.matches(), 1);
    assert!(h.game.selection().is_empty());
    assert!(!h.game.is_processing());
}

#[test]
fn mismatch_hides_after_the_full_countdown() {
    let mut h = Harness::new(BoardSize::Four);
    h.start();
    let (a, b) = h.mismatch();

    h.click(a);
    h.click(b);
    assert_eq!(h.game.moves(), 1);
    assert!(h.game.flip_timer().is_running());

    h.advance(FLIP_DURATION - Duration::from_millis(100));
    assert_eq!(status(&h, a), TileStatus::Flipped);
    assert_eq!(status(&h, b), TileStatus::Flipped);

    h.advance(Duration::from_millis(100));
    assert_eq!(status(&h, a), TileStatus::Hidden);
    assert_eq!(status(&h, b), TileStatus::Hidden);
    assert!(h.game.selection().is_empty());
    assert!(!h.game.is_processing());
    assert_eq!(h.game.moves(), 1);
}

#[test]
fn third_click_while_resolving_changes_nothing() {
    let mut h = Harness::new(BoardSize::Four);
    h.start();
    let (a, b) = h.mismatch();
    let third = h.pairs()[2].0;

    h.click(a);
    h.click(b);
    let before: Vec<TileStatus> = h.game.board().tiles().iter().map(|t| t.status()).collect();
    h.click(third);
    let after: Vec<TileStatus> = h.game.board().tiles().iter().map(|t| t.status()).collect();

    assert_eq!(before, after);
    assert_eq!(h.game.selection(), &[a, b]);
}

#[test]
fn reclicking_a_single_flip_cancels_it() {
    let mut h = Harness::new(BoardSize::Four);
    h.start();
    let (a, _) = h.pairs()[0];

    h.click(a);
    assert_eq!(status(&h, a), TileStatus::Flipped);
    h.click(a);

    assert_eq!(status(&h, a), TileStatus::Hidden);
    assert!(h.game.selection().is_empty());
    assert_eq!(h.game.moves(), 0);
}

#[test]
fn clicking_elsewhere_drops_only_an_unresolved_flip() {
    let mut h = Harness::new(BoardSize::Four);
    h.start();
    let (a, b) = h.mismatch();

    h.click(a);
    h.click_elsewhere();
    assert_eq!(status(&h, a), TileStatus::Hidden);
    assert_eq!(h.game.moves(), 0);

    h.click(a);
    h.click(b);
    h.click_elsewhere();
    assert_eq!(status(&h, a), TileStatus::Flipped);
    assert_eq!(status(&h, b), TileStatus::Flipped);
}

#[test]
fn at_most_two_tiles_are_ever_face_up() {
    let mut h = Harness::new(BoardSize::Four);
    h.start();
    let count = BoardSize::Four.tile_count();

    for step in 0..400 {
        h.click(TileId((step * 7) % count));
        h.advance(Duration::from_millis(150));
        let flipped = h.game.board().flipped_count();
        assert!(flipped <= 2, "step {step}: {flipped} tiles face up");
        assert_eq!(flipped, h.game.selection().len());
        if h.game.phase() == RoundPhase::Complete {
            break;
        }
    }
}

#[test]
fn full_round_completes_and_records_once() {
    let mut h = Harness::new(BoardSize::Four);
    h.start();
    play_perfect_round(&mut h);

    assert!(h.game.board().all_matched());
    assert_eq!(h.game.phase(), RoundPhase::Complete);
    assert_eq!(h.game.moves(), 8);
    assert_eq!(h.round_completions(), 1);

    h.advance(Duration::from_secs(10));
    h.click(TileId(0));
    assert_eq!(h.round_completions(), 1);

    let recorded = h.recorder.recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].moves, 8);
    assert_eq!(recorded[0].elapsed, MATCH_DELAY * 8);
    assert_eq!(recorded[0].board_size, BoardSize::Four);
}

#[test]
fn session_clock_ticks_while_playing() {
    let mut h = Harness::new(BoardSize::Four);
    h.start();
    h.drain_events();

    h.advance(Duration::from_millis(2500));
    let ticks: Vec<Duration> = h
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::SessionTick { elapsed } => Some(elapsed),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![Duration::from_secs(1), Duration::from_secs(2)]);
}

#[test]
fn reset_discards_a_running_countdown() {
    let mut h = Harness::new(BoardSize::Four);
    h.start();
    let (a, b) = h.mismatch();
    h.click(a);
    h.click(b);
    h.advance(Duration::from_secs(1));
    assert!(h.pending_wakeups().any(|w| matches!(w, Wakeup::FlipTick(_))));

    h.reset();
    h.start();
    let fresh = h.pairs()[0].0;
    h.click(fresh);

    h.advance(FLIP_DURATION);
    assert_eq!(status(&h, fresh), TileStatus::Flipped);
    assert_eq!(h.game.selection(), &[fresh]);
    assert_eq!(h.game.moves(), 0);
}

#[test]
fn reset_discards_a_pending_match() {
    let mut h = Harness::new(BoardSize::Four);
    h.start();
    let (a, b) = h.pairs()[0];
    h.click(a);
    h.click(b);

    h.reset();
    h.start();
    let (x, y) = h.mismatch();
    h.click(x);
    h.click(y);

    h.advance(MATCH_DELAY);
    assert_eq!(h.game.matches(), 0);
    assert_eq!(status(&h, x), TileStatus::Flipped);
    assert_eq!(status(&h, y), TileStatus::Flipped);
    assert_eq!(h.game.board().matched_count(), 0);
}

#[test]
fn slower_rounds_with_more_moves_score_lower() {
    let mut quick = Harness::new(BoardSize::Four);
    quick.start();
    play_perfect_round(&mut quick);

    let mut slow = Harness::new(BoardSize::Four);
    slow.start();
    for _ in 0..2 {
        let (a, b) = slow.mismatch();
        slow.click(a);
        slow.click(b);
        slow.advance(FLIP_DURATION);
    }
    play_perfect_round(&mut slow);

    let quick = quick.recorder.recorded();
    let slow = slow.recorder.recorded();
    assert_eq!(slow[0].moves, 10);
    assert!(slow[0].elapsed > quick[0].elapsed);
    assert!(slow[0].score < quick[0].score);
}

#[test]
fn score_policy_is_replaceable() {
    let mut h = Harness::with_controller(BoardSize::Four, |g| g.with_score_policy(BonusScore));
    h.start();
    play_perfect_round(&mut h);

    let summary = &h.recorder.recorded()[0];
    let expected = BonusScore.score(BoardSize::Four, summary.moves, summary.elapsed);
    assert_eq!(summary.score, expected);
}

#[test]
fn shorter_countdown_resolves_sooner() {
    let timing = Timing {
        flip_duration: Duration::from_millis(1000),
        match_delay: Duration::from_millis(200),
        ..Timing::default()
    };
    let mut h = Harness::with_controller(BoardSize::Four, |g| g.with_timing(timing).unwrap());
    h.start();
    let (a, b) = h.mismatch();
    h.click(a);
    h.click(b);

    h.advance(Duration::from_millis(900));
    assert_eq!(status(&h, a), TileStatus::Flipped);
    h.advance(Duration::from_millis(100));
    assert_eq!(status(&h, a), TileStatus::Hidden);
    assert!(!h.game.is_processing());
}

#[test]
fn stalled_countdowns_are_refused() {
    let recorder = std::sync::Arc::new(common::MemoryRecorder::default());
    let game = GameController::new(Preferences::default(), recorder);
    let timing = Timing {
        flip_tick: Duration::ZERO,
        ..Timing::default()
    };
    assert!(matches!(
        game.with_timing(timing),
        Err(GameError::InvalidTiming(TimingError::ZeroTick("flip")))
    ));
}
