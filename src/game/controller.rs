//! Round state machine.
//!
//! The controller is driven entirely by method calls from a single host
//! thread: player intents (`click_tile`, `click_elsewhere`, `begin_round`,
//! ...) and wakeups it previously asked the host to schedule. It never
//! blocks; outputs accumulate in two queues the host drains after every
//! call:
//!
//! - [`GameController::take_events`] for rendering,
//! - [`GameController::take_scheduled`] for deferred [`Wakeup`]s.
//!
//! A two-tile selection is resolved by exactly one of: the match delay
//! settling, the flip countdown expiring, or the player cancelling it.
//! The `processing` flag blocks new flips while a pair is unresolved, and
//! generation checks discard wakeups that belong to an earlier timer run
//! or an earlier round.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, trace, warn};

use super::board::{Board, BoardSize};
use super::clock::{Clock, SystemClock};
use super::error::Result;
use super::events::{GameEvent, RoundPhase, Scheduled, Wakeup};
use super::score::{InverseScore, RoundSummary, ScorePolicy};
use super::tile::{ImageId, TileId, TileStatus};
use super::timer::{RoundTimer, SessionTimer, TimerTick, TimerToken, Timing};
use crate::config::{Color, ColorRole, Preferences};
use crate::services::images::{ImageSource, ImageSourceKind, SourceError};
use crate::services::leaderboard::ScoreRecorder;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RoundTicket(u64);

/// Image fetch the host has to perform before the round becomes playable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundRequest {
    pub ticket: RoundTicket,
    pub board_size: BoardSize,
    pub count: usize,
    pub source: ImageSourceKind,
}

pub struct GameController {
    prefs: Preferences,
    timing: Timing,
    phase: RoundPhase,
    board: Board,
    selection: Vec<TileId>,
    processing: bool,
    moves: u32,
    matches: u32,
    /// Bumped on every new round and every reset.
    round: u64,
    flip_timer: RoundTimer,
    session: SessionTimer,
    clock: Box<dyn Clock>,
    rng: StdRng,
    recorder: Arc<dyn ScoreRecorder>,
    policy: Box<dyn ScorePolicy>,
    events: Vec<GameEvent>,
    scheduled: Vec<Scheduled>,
}

impl fmt::Debug for GameController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameController")
            .field("phase", &self.phase)
            .field("round", &self.round)
            .field("selection", &self.selection)
            .field("processing", &self.processing)
            .field("moves", &self.moves)
            .field("matches", &self.matches)
            .finish_non_exhaustive()
    }
}

impl GameController {
    pub fn new(prefs: Preferences, recorder: Arc<dyn ScoreRecorder>) -> Self {
        let timing = Timing::default();
        Self {
            board: Board::new(prefs.board_size),
            prefs,
            timing,
            phase: RoundPhase::NotStarted,
            selection: Vec::with_capacity(2),
            processing: false,
            moves: 0,
            matches: 0,
            round: 0,
            flip_timer: RoundTimer::new(timing.flip_duration, timing.flip_tick),
            session: SessionTimer::new(timing.session_tick),
            clock: Box::new(SystemClock),
            rng: StdRng::from_os_rng(),
            recorder,
            policy: Box::new(InverseScore),
            events: Vec::new(),
            scheduled: Vec::new(),
        }
    }

    /// Replaces the default timing. Fails if `timing` does not validate.
    pub fn with_timing(mut self, timing: Timing) -> Result<Self> {
        let timing = timing.validate()?;
        self.timing = timing;
        self.flip_timer = RoundTimer::new(timing.flip_duration, timing.flip_tick);
        self.session = SessionTimer::new(timing.session_tick);
        Ok(self)
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_score_policy(mut self, policy: impl ScorePolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        self.phase != RoundPhase::NotStarted
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn matches(&self) -> u32 {
        self.matches
    }

    pub fn selection(&self) -> &[TileId] {
        &self.selection
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn flip_timer(&self) -> &RoundTimer {
        &self.flip_timer
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn take_scheduled(&mut self) -> Vec<Scheduled> {
        std::mem::take(&mut self.scheduled)
    }

    /// Moves from `NotStarted` to `Loading`. Returns `None` if a round is
    /// already underway.
    pub fn begin_round(&mut self) -> Option<RoundRequest> {
        if self.phase != RoundPhase::NotStarted {
            return None;
        }
        self.round += 1;
        self.set_phase(RoundPhase::Loading);
        let request = RoundRequest {
            ticket: RoundTicket(self.round),
            board_size: self.prefs.board_size,
            count: self.prefs.board_size.pair_count(),
            source: self.prefs.image_source,
        };
        info!(
            round = self.round,
            size = %request.board_size,
            source = %request.source,
            "requesting images for new round"
        );
        Some(request)
    }

    /// Hands the fetched images to a round waiting in `Loading`. Results for
    /// a round that has since been reset are dropped.
    pub fn finish_loading(
        &mut self,
        ticket: RoundTicket,
        fetched: std::result::Result<Vec<ImageId>, SourceError>,
    ) -> Result<()> {
        if ticket.0 != self.round || self.phase != RoundPhase::Loading {
            debug!(ticket = ticket.0, round = self.round, "dropping images for stale round");
            return Ok(());
        }
        let images = match fetched {
            Ok(images) => images,
            Err(err) => {
                self.fail_loading(&err);
                return Err(err.into());
            }
        };

        let mut board = Board::new(self.prefs.board_size);
        if let Err(err) = board.initialize(&images, self.prefs.matched_color.clone(), &mut self.rng) {
            self.fail_loading(&err);
            return Err(err.into());
        }
        self.board = board;
        self.selection.clear();
        self.processing = false;
        self.moves = 0;
        self.matches = 0;
        self.flip_timer.reset();
        self.session.reset();

        let now = self.clock.now();
        if let Some(token) = self.session.start(now) {
            self.schedule(self.timing.session_tick, Wakeup::SessionTick(token));
        }

        self.events.push(GameEvent::BoardReady {
            size: self.board.size(),
            tiles: self
                .board
                .tiles()
                .iter()
                .map(|t| (t.id(), t.image().clone()))
                .collect(),
        });
        self.emit_counters();
        self.events.push(GameEvent::SessionTick {
            elapsed: Duration::ZERO,
        });
        self.emit_countdown();
        self.set_phase(RoundPhase::InProgress);
        info!(round = self.round, tiles = self.board.tiles().len(), "round in progress");
        Ok(())
    }

    /// Fetches synchronously from `source` and starts the round.
    pub fn start_round_with(&mut self, source: &dyn ImageSource) -> Result<()> {
        let Some(request) = self.begin_round() else {
            return Ok(());
        };
        let fetched = source.fetch(request.count);
        self.finish_loading(request.ticket, fetched)
    }

    pub fn reset(&mut self) {
        self.round += 1;
        self.board = Board::new(self.prefs.board_size);
        self.selection.clear();
        self.processing = false;
        self.moves = 0;
        self.matches = 0;
        self.flip_timer.reset();
        self.session.reset();

        self.events.push(GameEvent::BoardCleared);
        self.emit_selection();
        self.emit_counters();
        self.events.push(GameEvent::SessionTick {
            elapsed: Duration::ZERO,
        });
        self.emit_countdown();
        self.set_phase(RoundPhase::NotStarted);
        debug!(round = self.round, "round reset");
    }

    /// Switches board size. A round in progress is replaced by a fresh one.
    pub fn set_board_size(&mut self, dimension: u8) -> Result<Option<RoundRequest>> {
        let size = BoardSize::try_from(dimension)?;
        let restart = self.is_started();
        self.prefs.board_size = size;
        self.reset();
        Ok(if restart { self.begin_round() } else { None })
    }

    pub fn set_image_source(&mut self, kind: ImageSourceKind) -> Option<RoundRequest> {
        let restart = self.is_started();
        self.prefs.image_source = kind;
        self.reset();
        if restart { self.begin_round() } else { None }
    }

    /// Display-only; gameplay state is untouched.
    pub fn set_color(&mut self, role: ColorRole, color: Color) {
        match role {
            ColorRole::Matched => {
                self.board.set_matched_color(color.clone());
                self.prefs.matched_color = color;
            }
            ColorRole::Closed => self.prefs.closed_color = color,
        }
        self.events.push(GameEvent::PaletteChanged(self.prefs.palette()));
    }

    pub fn click_tile(&mut self, id: TileId) {
        if self.phase != RoundPhase::InProgress || self.processing {
            trace!(tile = %id, phase = ?self.phase, processing = self.processing, "click ignored");
            return;
        }
        let Some(status) = self.board.tile(id).map(|t| t.status()) else {
            return;
        };

        if let Some(pos) = self.selection.iter().position(|&t| t == id) {
            self.selection.remove(pos);
            self.hide_tile(id);
            match self.selection.len() {
                1 => {
                    self.flip_timer.stop();
                    self.processing = false;
                }
                0 => {
                    self.flip_timer.reset();
                    self.emit_countdown();
                }
                _ => {}
            }
            self.emit_selection();
            return;
        }

        if self.selection.len() >= 2 || status != TileStatus::Hidden {
            return;
        }

        self.flip_tile(id);
        self.selection.push(id);
        self.emit_selection();
        match self.selection.len() {
            1 => {
                self.flip_timer.reset();
                self.events.push(GameEvent::FlipCountdownShown);
                self.emit_countdown();
            }
            2 => self.evaluate_pair(),
            _ => {}
        }
    }

    /// Pointer went down away from the board. Drops an unresolved single
    /// flip without counting a move.
    pub fn click_elsewhere(&mut self) {
        if self.selection.is_empty() || self.processing {
            return;
        }
        for id in std::mem::take(&mut self.selection) {
            self.hide_tile(id);
        }
        self.flip_timer.stop();
        self.flip_timer.reset();
        self.emit_selection();
        self.emit_countdown();
    }

    pub fn wake(&mut self, wakeup: Wakeup) {
        match wakeup {
            Wakeup::FlipTick(token) => self.on_flip_tick(token),
            Wakeup::SessionTick(token) => self.on_session_tick(token),
            Wakeup::MatchSettled { round } => self.on_match_settled(round),
        }
    }

    fn evaluate_pair(&mut self) {
        self.moves += 1;
        self.processing = true;
        self.emit_counters();

        let (first, second) = (self.selection[0], self.selection[1]);
        let paired = match (self.board.tile(first), self.board.tile(second)) {
            (Some(a), Some(b)) => a.pairs_with(b),
            _ => false,
        };
        if paired {
            debug!(%first, %second, "pair found");
            self.schedule(self.timing.match_delay, Wakeup::MatchSettled { round: self.round });
        } else if let Some(token) = self.flip_timer.start() {
            debug!(%first, %second, "mismatch, countdown started");
            self.schedule(self.flip_timer.tick_interval(), Wakeup::FlipTick(token));
            self.emit_countdown();
        }
    }

    fn on_flip_tick(&mut self, token: TimerToken) {
        match self.flip_timer.tick(token) {
            TimerTick::Stale => trace!(generation = token.generation(), "stale flip tick"),
            TimerTick::Running { .. } => {
                self.emit_countdown();
                self.schedule(self.flip_timer.tick_interval(), Wakeup::FlipTick(token));
            }
            TimerTick::Expired => {
                if self.selection.len() == 2 {
                    for id in std::mem::take(&mut self.selection) {
                        self.hide_tile(id);
                    }
                    self.processing = false;
                    self.emit_selection();
                }
                self.flip_timer.reset();
                self.emit_countdown();
            }
        }
    }

    fn on_session_tick(&mut self, token: TimerToken) {
        let Some(elapsed) = self.session.tick(token, self.clock.now()) else {
            trace!(generation = token.generation(), "stale session tick");
            return;
        };
        self.events.push(GameEvent::SessionTick { elapsed });
        self.schedule(self.session.tick_interval(), Wakeup::SessionTick(token));
    }

    fn on_match_settled(&mut self, round: u64) {
        if round != self.round || self.phase != RoundPhase::InProgress || self.selection.len() != 2 {
            debug!(round, current = self.round, "dropping stale match settle");
            return;
        }
        for id in std::mem::take(&mut self.selection) {
            if let Some(tile) = self.board.tile_mut(id)
                && tile.mark_matched()
            {
                self.events.push(GameEvent::TileChanged {
                    tile: id,
                    status: TileStatus::Matched,
                });
            }
        }
        self.matches += 1;
        self.processing = false;
        self.flip_timer.reset();
        self.emit_selection();
        self.emit_counters();
        self.emit_countdown();

        if self.board.all_matched() {
            self.complete_round();
        }
    }

    fn complete_round(&mut self) {
        let now = self.clock.now();
        self.session.stop(now);
        let elapsed = self.session.elapsed(now);
        let board_size = self.board.size();
        let summary = RoundSummary {
            board_size,
            moves: self.moves,
            elapsed,
            score: self.policy.score(board_size, self.moves, elapsed),
            image_source: self.prefs.image_source,
            palette: self.prefs.palette(),
        };
        info!(
            round = self.round,
            moves = summary.moves,
            secs = summary.elapsed_secs(),
            score = summary.score,
            "round complete"
        );
        self.set_phase(RoundPhase::Complete);
        self.recorder.record(&summary);
        self.events.push(GameEvent::RoundComplete(summary));
    }

    fn fail_loading(&mut self, err: &dyn std::error::Error) {
        warn!(round = self.round, "round could not start: {err}");
        self.set_phase(RoundPhase::NotStarted);
        self.events.push(GameEvent::RoundFailed {
            reason: err.to_string(),
        });
    }

    fn flip_tile(&mut self, id: TileId) {
        if let Some(tile) = self.board.tile_mut(id)
            && tile.flip()
        {
            self.events.push(GameEvent::TileChanged {
                tile: id,
                status: TileStatus::Flipped,
            });
        }
    }

    fn hide_tile(&mut self, id: TileId) {
        if let Some(tile) = self.board.tile_mut(id)
            && tile.hide()
        {
            self.events.push(GameEvent::TileChanged {
                tile: id,
                status: TileStatus::Hidden,
            });
        }
    }

    fn schedule(&mut self, after: Duration, wakeup: Wakeup) {
        self.scheduled.push(Scheduled { after, wakeup });
    }

    fn set_phase(&mut self, phase: RoundPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.events.push(GameEvent::PhaseChanged(phase));
        }
    }

    fn emit_selection(&mut self) {
        self.events.push(GameEvent::SelectionChanged(self.selection.clone()));
    }

    fn emit_counters(&mut self) {
        self.events.push(GameEvent::CountersChanged {
            moves: self.moves,
            matches: self.matches,
        });
    }

    fn emit_countdown(&mut self) {
        self.events.push(GameEvent::FlipCountdown {
            remaining: self.flip_timer.remaining(),
            duration: self.flip_timer.duration(),
            running: self.flip_timer.is_running(),
        });
    }
}
