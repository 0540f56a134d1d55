//! Flip countdown and session clock.
//!
//! Neither timer owns a thread or an event source. The host loop delivers
//! ticks back through [`TimerToken`]s; a token minted before the latest
//! `start`, `stop` or `reset` no longer matches the timer's generation and
//! its tick is reported as stale.
use std::time::{Duration, Instant};

use super::error::TimingError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerToken {
    generation: u64,
}

impl TimerToken {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Timing constants for a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// How long a mismatched pair stays face up.
    pub flip_duration: Duration,
    pub flip_tick: Duration,
    /// Pause before a found pair is marked matched.
    pub match_delay: Duration,
    pub session_tick: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            flip_duration: Duration::from_millis(3000),
            flip_tick: Duration::from_millis(100),
            match_delay: Duration::from_millis(500),
            session_tick: Duration::from_millis(1000),
        }
    }
}

impl Timing {
    /// Rejects zero tick intervals, which would never advance a timer, and a
    /// match delay that does not finish before the flip countdown.
    pub fn validate(self) -> Result<Self, TimingError> {
        if self.flip_tick.is_zero() {
            return Err(TimingError::ZeroTick("flip"));
        }
        if self.session_tick.is_zero() {
            return Err(TimingError::ZeroTick("session"));
        }
        if self.match_delay >= self.flip_duration {
            return Err(TimingError::MatchDelayTooLong {
                match_delay: self.match_delay,
                flip_duration: self.flip_duration,
            });
        }
        Ok(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Expired,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerTick {
    Stale,
    Running { remaining: Duration },
    Expired,
}

/// Countdown started when a mismatched pair is shown.
#[derive(Clone, Debug)]
pub struct RoundTimer {
    duration: Duration,
    tick: Duration,
    remaining: Duration,
    phase: TimerPhase,
    generation: u64,
}

impl RoundTimer {
    pub fn new(duration: Duration, tick: Duration) -> Self {
        Self {
            duration,
            tick,
            remaining: duration,
            phase: TimerPhase::Idle,
            generation: 0,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Returns `None` when already running; the live countdown keeps its token.
    pub fn start(&mut self) -> Option<TimerToken> {
        if self.is_running() {
            return None;
        }
        self.generation += 1;
        self.remaining = self.duration;
        self.phase = TimerPhase::Running;
        Some(TimerToken {
            generation: self.generation,
        })
    }

    pub fn tick(&mut self, token: TimerToken) -> TimerTick {
        if !self.is_running() || token.generation != self.generation {
            return TimerTick::Stale;
        }
        self.remaining = self.remaining.saturating_sub(self.tick);
        if self.remaining.is_zero() {
            self.phase = TimerPhase::Expired;
            TimerTick::Expired
        } else {
            TimerTick::Running {
                remaining: self.remaining,
            }
        }
    }

    /// Cancels a running countdown without expiring it.
    pub fn stop(&mut self) {
        self.generation += 1;
        if self.is_running() {
            self.phase = TimerPhase::Stopped;
        }
    }

    pub fn reset(&mut self) {
        self.stop();
        self.phase = TimerPhase::Idle;
        self.remaining = self.duration;
    }
}

/// Free-running clock from the first playable moment to completion.
#[derive(Clone, Debug)]
pub struct SessionTimer {
    tick: Duration,
    started_at: Option<Instant>,
    frozen: Duration,
    generation: u64,
}

impl SessionTimer {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            started_at: None,
            frozen: Duration::ZERO,
            generation: 0,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn start(&mut self, now: Instant) -> Option<TimerToken> {
        if self.is_running() {
            return None;
        }
        self.generation += 1;
        self.started_at = Some(now);
        self.frozen = Duration::ZERO;
        Some(TimerToken {
            generation: self.generation,
        })
    }

    pub fn stop(&mut self, now: Instant) {
        if let Some(started) = self.started_at.take() {
            self.frozen = now.saturating_duration_since(started);
        }
        self.generation += 1;
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.frozen = Duration::ZERO;
        self.generation += 1;
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started) => now.saturating_duration_since(started),
            None => self.frozen,
        }
    }

    /// Elapsed time for a display tick, or `None` if the token is stale.
    pub fn tick(&self, token: TimerToken, now: Instant) -> Option<Duration> {
        if !self.is_running() || token.generation != self.generation {
            return None;
        }
        Some(self.elapsed(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flip_timer() -> RoundTimer {
        RoundTimer::new(Duration::from_millis(300), Duration::from_millis(100))
    }

    #[test]
    fn default_timing_is_valid() {
        assert_eq!(Timing::default().validate(), Ok(Timing::default()));
    }

    #[test]
    fn zero_flip_tick_is_rejected() {
        let timing = Timing {
            flip_tick: Duration::ZERO,
            ..Timing::default()
        };
        assert_eq!(timing.validate(), Err(TimingError::ZeroTick("flip")));
    }

    #[test]
    fn zero_session_tick_is_rejected() {
        let timing = Timing {
            session_tick: Duration::ZERO,
            ..Timing::default()
        };
        assert_eq!(timing.validate(), Err(TimingError::ZeroTick("session")));
    }

    #[test]
    fn match_delay_must_beat_the_countdown() {
        let timing = Timing {
            match_delay: Duration::from_millis(3000),
            ..Timing::default()
        };
        assert_eq!(
            timing.validate(),
            Err(TimingError::MatchDelayTooLong {
                match_delay: Duration::from_millis(3000),
                flip_duration: Duration::from_millis(3000),
            })
        );

        let zero_countdown = Timing {
            flip_duration: Duration::ZERO,
            match_delay: Duration::ZERO,
            ..Timing::default()
        };
        assert!(zero_countdown.validate().is_err());
    }

    #[test]
    fn countdown_expires_exactly_once() {
        let mut timer = flip_timer();
        let token = timer.start().expect("idle timer starts");
        assert_eq!(
            timer.tick(token),
            TimerTick::Running {
                remaining: Duration::from_millis(200)
            }
        );
        assert_eq!(
            timer.tick(token),
            TimerTick::Running {
                remaining: Duration::from_millis(100)
            }
        );
        assert_eq!(timer.tick(token), TimerTick::Expired);
        assert_eq!(timer.phase(), TimerPhase::Expired);
        assert_eq!(timer.tick(token), TimerTick::Stale);
    }

    #[test]
    fn start_while_running_keeps_countdown() {
        let mut timer = flip_timer();
        let token = timer.start().unwrap();
        timer.tick(token);
        assert!(timer.start().is_none());
        assert_eq!(timer.remaining(), Duration::from_millis(200));
    }

    #[test]
    fn stop_suppresses_expiry() {
        let mut timer = flip_timer();
        let token = timer.start().unwrap();
        timer.tick(token);
        timer.stop();
        assert_eq!(timer.phase(), TimerPhase::Stopped);
        assert_eq!(timer.tick(token), TimerTick::Stale);
        assert_eq!(timer.tick(token), TimerTick::Stale);
    }

    #[test]
    fn reset_restores_duration_without_running() {
        let mut timer = flip_timer();
        let token = timer.start().unwrap();
        timer.tick(token);
        timer.reset();
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.remaining(), timer.duration());
        assert!(!timer.is_running());
    }

    #[test]
    fn old_token_is_stale_after_restart() {
        let mut timer = flip_timer();
        let old = timer.start().unwrap();
        timer.reset();
        let fresh = timer.start().unwrap();
        assert_ne!(old, fresh);
        assert_eq!(timer.tick(old), TimerTick::Stale);
        assert!(matches!(timer.tick(fresh), TimerTick::Running { .. }));
    }

    #[test]
    fn session_elapsed_freezes_on_stop() {
        let mut session = SessionTimer::new(Duration::from_secs(1));
        let t0 = Instant::now();
        let token = session.start(t0).unwrap();
        assert_eq!(session.tick(token, t0 + Duration::from_secs(3)), Some(Duration::from_secs(3)));

        session.stop(t0 + Duration::from_secs(5));
        assert_eq!(session.elapsed(t0 + Duration::from_secs(60)), Duration::from_secs(5));
        assert_eq!(session.tick(token, t0 + Duration::from_secs(6)), None);

        session.reset();
        assert_eq!(session.elapsed(t0 + Duration::from_secs(60)), Duration::ZERO);
    }

    #[test]
    fn session_start_is_idempotent_while_running() {
        let mut session = SessionTimer::new(Duration::from_secs(1));
        let t0 = Instant::now();
        session.start(t0).unwrap();
        assert!(session.start(t0 + Duration::from_secs(2)).is_none());
        assert_eq!(session.elapsed(t0 + Duration::from_secs(4)), Duration::from_secs(4));
    }
}
