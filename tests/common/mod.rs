#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pairs::config::Preferences;
use pairs::game::{
    BoardSize, GameController, GameEvent, ImageId, ManualClock, RoundSummary, TileId, Wakeup,
};
use pairs::services::images::FixedImages;
use pairs::services::leaderboard::{LeaderboardEntry, RecorderError, ScoreRecorder};

/// Recorder that keeps every summary it is handed.
#[derive(Default)]
pub struct MemoryRecorder {
    pub rounds: Mutex<Vec<RoundSummary>>,
}

impl MemoryRecorder {
    pub fn recorded(&self) -> Vec<RoundSummary> {
        self.rounds.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ScoreRecorder for MemoryRecorder {
    fn record(&self, summary: &RoundSummary) {
        if let Ok(mut rounds) = self.rounds.lock() {
            rounds.push(summary.clone());
        }
    }

    fn top_scores(&self) -> Result<Vec<LeaderboardEntry>, RecorderError> {
        Ok(Vec::new())
    }
}

/// Drives a controller in virtual time. Scheduled wakeups fire in due order
/// as the clock is advanced, the way the GTK main loop would run them.
pub struct Harness {
    pub game: GameController,
    pub clock: ManualClock,
    pub recorder: Arc<MemoryRecorder>,
    pub events: Vec<GameEvent>,
    now: Duration,
    seq: u64,
    pending: Vec<(Duration, u64, Wakeup)>,
}

impl Harness {
    pub fn new(size: BoardSize) -> Self {
        Self::with_controller(size, |game| game)
    }

    pub fn with_controller(
        size: BoardSize,
        configure: impl FnOnce(GameController) -> GameController,
    ) -> Self {
        let clock = ManualClock::new();
        let recorder = Arc::new(MemoryRecorder::default());
        let prefs = Preferences {
            board_size: size,
            ..Preferences::default()
        };
        let game = GameController::new(prefs, recorder.clone())
            .with_clock(clock.clone())
            .with_seed(11);
        Self {
            game: configure(game),
            clock,
            recorder,
            events: Vec::new(),
            now: Duration::ZERO,
            seq: 0,
            pending: Vec::new(),
        }
    }

    fn collect(&mut self) {
        for scheduled in self.game.take_scheduled() {
            self.seq += 1;
            self.pending.push((self.now + scheduled.after, self.seq, scheduled.wakeup));
        }
        self.events.extend(self.game.take_events());
    }

    pub fn start(&mut self) {
        let pairs = self.game.preferences().board_size.pair_count();
        let source = FixedImages::numbered("img", pairs);
        self.game
            .start_round_with(&source)
            .expect("round should start from fixed images");
        self.collect();
    }

    pub fn click(&mut self, tile: TileId) {
        self.game.click_tile(tile);
        self.collect();
    }

    pub fn click_elsewhere(&mut self) {
        self.game.click_elsewhere();
        self.collect();
    }

    pub fn reset(&mut self) {
        self.game.reset();
        self.collect();
    }

    /// Moves virtual time forward, firing every wakeup that falls due.
    pub fn advance(&mut self, by: Duration) {
        let target = self.now + by;
        loop {
            let next = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, (due, _, _))| *due <= target)
                .min_by_key(|(_, (due, seq, _))| (*due, *seq))
                .map(|(i, _)| i);
            let Some(index) = next else {
                break;
            };
            let (due, _, wakeup) = self.pending.remove(index);
            self.clock.advance(due - self.now);
            self.now = due;
            self.game.wake(wakeup);
            self.collect();
        }
        self.clock.advance(target - self.now);
        self.now = target;
    }

    pub fn pending_wakeups(&self) -> impl Iterator<Item = &Wakeup> {
        self.pending.iter().map(|(_, _, w)| w)
    }

    /// Tile ids grouped by image, in board order.
    pub fn pairs(&self) -> Vec<(TileId, TileId)> {
        let mut by_image: HashMap<ImageId, Vec<TileId>> = HashMap::new();
        for tile in self.game.board().tiles() {
            by_image.entry(tile.image().clone()).or_default().push(tile.id());
        }
        let mut pairs: Vec<(TileId, TileId)> = by_image
            .into_values()
            .map(|ids| (ids[0], ids[1]))
            .collect();
        pairs.sort_by_key(|(a, _)| a.index());
        pairs
    }

    /// Two tiles that do not share an image.
    pub fn mismatch(&self) -> (TileId, TileId) {
        let pairs = self.pairs();
        (pairs[0].0, pairs[1].0)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn round_completions(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, GameEvent::RoundComplete(_)))
            .count()
    }
}
