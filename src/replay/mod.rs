//! Bar-by-bar replay of a candle series.
//!
//! The controller never reads a clock: the host feeds elapsed time through
//! [`ReplayController::advance`] and the controller turns it into ticks.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Candle, CandleSeries, UnixSeconds};
use crate::error::{ReplayError, ReplayResult};

pub const DEFAULT_REPLAY_SPEED: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayPhase {
    /// Replay disabled; the full series is shown.
    Off,
    /// Cut point chosen, not playing.
    Armed,
    Playing,
    Paused,
}

/// Playback state over one candle series.
///
/// Invariant: the playback position is `Some` exactly when the phase is not
/// `Off`, and always indexes an existing candle.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayController {
    data: CandleSeries,
    phase: ReplayPhase,
    position: Option<usize>,
    speed: Duration,
    countdown: Duration,
}

impl Default for ReplayController {
    fn default() -> Self {
        Self::new(CandleSeries::new())
    }
}

impl ReplayController {
    #[must_use]
    pub fn new(data: CandleSeries) -> Self {
        Self {
            data,
            phase: ReplayPhase::Off,
            position: None,
            speed: DEFAULT_REPLAY_SPEED,
            countdown: DEFAULT_REPLAY_SPEED,
        }
    }

    pub fn with_speed(mut self, speed: Duration) -> ReplayResult<Self> {
        self.set_speed(speed)?;
        self.countdown = speed;
        Ok(self)
    }

    #[must_use]
    pub fn data(&self) -> &CandleSeries {
        &self.data
    }

    #[must_use]
    pub fn phase(&self) -> ReplayPhase {
        self.phase
    }

    /// Returns `true` in every phase except `Off`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != ReplayPhase::Off
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.phase == ReplayPhase::Playing
    }

    #[must_use]
    pub fn playback_index(&self) -> Option<usize> {
        self.position
    }

    #[must_use]
    pub fn playback_time(&self) -> Option<UnixSeconds> {
        self.position
            .and_then(|index| self.data.get(index))
            .map(|candle| candle.time)
    }

    #[must_use]
    pub fn speed(&self) -> Duration {
        self.speed
    }

    /// Time left until the next tick while playing.
    #[must_use]
    pub fn countdown(&self) -> Duration {
        self.countdown
    }

    /// Candles the panes may show: everything when off, else the prefix up to
    /// and including the playback candle.
    #[must_use]
    pub fn visible_candles(&self) -> &[Candle] {
        match self.position {
            Some(index) => &self.data.as_slice()[..=index],
            None => self.data.as_slice(),
        }
    }

    /// Swaps in a new series (back-fill, timeframe change).
    ///
    /// An active playback position is re-snapped to the latest candle at or
    /// before the previous playback time.
    pub fn set_data(&mut self, data: CandleSeries) {
        let previous_time = self.playback_time();
        self.data = data;
        let Some(time) = previous_time else {
            return;
        };
        match self
            .data
            .index_at_or_before(time)
            .or_else(|| (!self.data.is_empty()).then_some(0))
        {
            Some(index) => {
                self.position = Some(index);
                if self.is_playing() && self.is_at_end() {
                    self.phase = ReplayPhase::Paused;
                }
            }
            None => self.turn_off(),
        }
    }

    fn is_at_end(&self) -> bool {
        self.position
            .is_some_and(|index| index + 1 >= self.data.len())
    }

    /// Freezes history at the latest candle with `time <= at`.
    ///
    /// Legal from any phase and always lands in `Armed`. Returns `None`, with
    /// state unchanged, when no candle is old enough.
    pub fn cut(&mut self, at: UnixSeconds) -> Option<UnixSeconds> {
        let index = self.data.index_at_or_before(at)?;
        self.position = Some(index);
        self.phase = ReplayPhase::Armed;
        self.countdown = self.speed;
        let time = self.playback_time();
        debug!(requested = at, playback_time = ?time, "replay cut");
        time
    }

    /// Starts playback; returns whether the controller is now playing.
    ///
    /// At the last candle there is nothing to play and the controller parks
    /// in `Paused`.
    pub fn play(&mut self) -> bool {
        match self.phase {
            ReplayPhase::Off => false,
            ReplayPhase::Playing => true,
            ReplayPhase::Armed | ReplayPhase::Paused => {
                if self.is_at_end() {
                    self.phase = ReplayPhase::Paused;
                    return false;
                }
                self.phase = ReplayPhase::Playing;
                self.countdown = self.speed;
                true
            }
        }
    }

    pub fn pause(&mut self) -> bool {
        if self.phase != ReplayPhase::Playing {
            return false;
        }
        self.phase = ReplayPhase::Paused;
        true
    }

    pub fn toggle_playback(&mut self) -> bool {
        if self.is_playing() {
            self.pause();
            false
        } else {
            self.play()
        }
    }

    /// Feeds elapsed wall time; returns the number of ticks that fired.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        if self.phase != ReplayPhase::Playing {
            return 0;
        }
        let mut remaining = elapsed;
        let mut ticks = 0;
        while remaining >= self.countdown {
            remaining -= self.countdown;
            self.countdown = self.speed;
            if let Some(index) = self.position {
                self.position = Some(index + 1);
                ticks += 1;
            }
            if self.is_at_end() {
                self.phase = ReplayPhase::Paused;
                debug!(playback_time = ?self.playback_time(), "replay reached series end");
                return ticks;
            }
        }
        self.countdown -= remaining;
        ticks
    }

    fn after_step(&mut self) {
        match self.phase {
            ReplayPhase::Paused => self.phase = ReplayPhase::Armed,
            ReplayPhase::Playing if self.is_at_end() => self.phase = ReplayPhase::Paused,
            _ => {}
        }
    }

    /// Moves one candle later; a no-op at the last candle.
    ///
    /// From `Off` this arms replay at the first candle.
    pub fn step_forward(&mut self) -> Option<UnixSeconds> {
        match self.position {
            None => {
                if self.data.is_empty() {
                    return None;
                }
                self.position = Some(0);
                self.phase = ReplayPhase::Armed;
                self.countdown = self.speed;
            }
            Some(index) => {
                if index + 1 >= self.data.len() {
                    return None;
                }
                self.position = Some(index + 1);
                self.after_step();
            }
        }
        self.playback_time()
    }

    /// Moves one candle earlier; a no-op at the first candle.
    ///
    /// From `Off` this arms replay at the last candle.
    pub fn step_backward(&mut self) -> Option<UnixSeconds> {
        match self.position {
            None => {
                let last = self.data.len().checked_sub(1)?;
                self.position = Some(last);
                self.phase = ReplayPhase::Armed;
                self.countdown = self.speed;
            }
            Some(index) => {
                if index == 0 {
                    return None;
                }
                self.position = Some(index - 1);
                self.after_step();
            }
        }
        self.playback_time()
    }

    /// Changes the tick period from the next tick on; the running countdown
    /// is left alone.
    pub fn set_speed(&mut self, speed: Duration) -> ReplayResult<()> {
        if speed.is_zero() {
            return Err(ReplayError::InvalidData(
                "replay speed must be > 0".to_owned(),
            ));
        }
        self.speed = speed;
        Ok(())
    }

    pub fn turn_off(&mut self) {
        self.phase = ReplayPhase::Off;
        self.position = None;
        self.countdown = self.speed;
    }
}
