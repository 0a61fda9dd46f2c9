use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::annotation::HitTolerance;
use crate::core::Timeframe;
use crate::error::{ReplayError, ReplayResult};
use crate::interaction::MagnetConfig;
use crate::panes::{DEFAULT_SECONDARY_WINDOW_SECONDS, Layout};

/// Bootstrap configuration of one replay session.
///
/// Serializable so hosts can persist a session setup next to the trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub trade_id: String,
    pub instrument: String,
    #[serde(default = "default_primary_timeframe")]
    pub primary_timeframe: Timeframe,
    #[serde(default = "default_secondary_timeframe")]
    pub secondary_timeframe: Timeframe,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default = "default_replay_speed_ms")]
    pub replay_speed_ms: u64,
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    #[serde(default)]
    pub magnet: MagnetConfig,
    #[serde(default)]
    pub hit_tolerance: HitTolerance,
    #[serde(default = "default_click_slop_px")]
    pub click_slop_px: f64,
    #[serde(default = "default_secondary_window_seconds")]
    pub secondary_window_seconds: i64,
    /// Back-fill starts when the visible range gets this many bars from the
    /// first loaded candle.
    #[serde(default = "default_backfill_trigger_bars")]
    pub backfill_trigger_bars: u32,
    /// Shift fetched prices so the candle at the trade entry closes at the
    /// journaled entry price. Only applies when a trade is attached.
    #[serde(default)]
    pub align_prices_to_trade: bool,
}

impl SessionConfig {
    #[must_use]
    pub fn new(trade_id: impl Into<String>, instrument: impl Into<String>) -> Self {
        Self {
            trade_id: trade_id.into(),
            instrument: instrument.into(),
            primary_timeframe: default_primary_timeframe(),
            secondary_timeframe: default_secondary_timeframe(),
            layout: Layout::Single,
            replay_speed_ms: default_replay_speed_ms(),
            save_debounce_ms: default_save_debounce_ms(),
            magnet: MagnetConfig::default(),
            hit_tolerance: HitTolerance::default(),
            click_slop_px: default_click_slop_px(),
            secondary_window_seconds: default_secondary_window_seconds(),
            backfill_trigger_bars: default_backfill_trigger_bars(),
            align_prices_to_trade: false,
        }
    }

    #[must_use]
    pub fn with_timeframes(mut self, primary: Timeframe, secondary: Timeframe) -> Self {
        self.primary_timeframe = primary;
        self.secondary_timeframe = secondary;
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_replay_speed_ms(mut self, replay_speed_ms: u64) -> Self {
        self.replay_speed_ms = replay_speed_ms;
        self
    }

    #[must_use]
    pub fn with_save_debounce_ms(mut self, save_debounce_ms: u64) -> Self {
        self.save_debounce_ms = save_debounce_ms;
        self
    }

    #[must_use]
    pub fn with_magnet(mut self, magnet: MagnetConfig) -> Self {
        self.magnet = magnet;
        self
    }

    #[must_use]
    pub fn with_hit_tolerance(mut self, hit_tolerance: HitTolerance) -> Self {
        self.hit_tolerance = hit_tolerance;
        self
    }

    #[must_use]
    pub fn with_click_slop_px(mut self, click_slop_px: f64) -> Self {
        self.click_slop_px = click_slop_px;
        self
    }

    #[must_use]
    pub fn with_secondary_window_seconds(mut self, secondary_window_seconds: i64) -> Self {
        self.secondary_window_seconds = secondary_window_seconds;
        self
    }

    #[must_use]
    pub fn with_backfill_trigger_bars(mut self, backfill_trigger_bars: u32) -> Self {
        self.backfill_trigger_bars = backfill_trigger_bars;
        self
    }

    #[must_use]
    pub fn with_price_alignment(mut self, align_prices_to_trade: bool) -> Self {
        self.align_prices_to_trade = align_prices_to_trade;
        self
    }

    #[must_use]
    pub fn replay_speed(&self) -> Duration {
        Duration::from_millis(self.replay_speed_ms)
    }

    #[must_use]
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn validate(&self) -> ReplayResult<()> {
        if self.trade_id.trim().is_empty() {
            return Err(ReplayError::InvalidData(
                "trade id must not be empty".to_owned(),
            ));
        }
        if self.instrument.trim().is_empty() {
            return Err(ReplayError::InvalidData(
                "instrument must not be empty".to_owned(),
            ));
        }
        if self.replay_speed_ms == 0 {
            return Err(ReplayError::InvalidData(
                "replay speed must be > 0 ms".to_owned(),
            ));
        }
        if !self.magnet.threshold_bars.is_finite() || self.magnet.threshold_bars < 0.0 {
            return Err(ReplayError::InvalidData(
                "magnet threshold must be finite and >= 0".to_owned(),
            ));
        }
        for (name, value) in [
            ("hit tolerance", self.hit_tolerance.tolerance_px),
            ("handle radius", self.hit_tolerance.handle_radius_px),
            ("text hit width", self.hit_tolerance.text_half_width_px),
            ("text hit height", self.hit_tolerance.text_half_height_px),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ReplayError::InvalidData(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        if !self.click_slop_px.is_finite() || self.click_slop_px < 0.0 {
            return Err(ReplayError::InvalidData(
                "click slop must be finite and >= 0".to_owned(),
            ));
        }
        if self.secondary_window_seconds <= 0 {
            return Err(ReplayError::InvalidData(
                "secondary window must be > 0 seconds".to_owned(),
            ));
        }
        Ok(())
    }

    /// Serializes config to pretty JSON.
    pub fn to_json_pretty(&self) -> ReplayResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ReplayError::InvalidData(format!("failed to serialize config: {e}")))
    }

    /// Deserializes config from JSON.
    pub fn from_json_str(input: &str) -> ReplayResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| ReplayError::InvalidData(format!("failed to parse config: {e}")))
    }
}

fn default_primary_timeframe() -> Timeframe {
    Timeframe::Min1
}

fn default_secondary_timeframe() -> Timeframe {
    Timeframe::Min15
}

fn default_replay_speed_ms() -> u64 {
    1000
}

fn default_save_debounce_ms() -> u64 {
    1000
}

fn default_click_slop_px() -> f64 {
    3.0
}

fn default_secondary_window_seconds() -> i64 {
    DEFAULT_SECONDARY_WINDOW_SECONDS
}

fn default_backfill_trigger_bars() -> u32 {
    20
}
