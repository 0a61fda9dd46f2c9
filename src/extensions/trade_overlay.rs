use serde::{Deserialize, Serialize};

use crate::annotation::LineStyle;
use crate::core::{Candle, CandleSeries, UnixSeconds};
use crate::error::{ReplayError, ReplayResult};
use crate::render::{Color, PriceLevel};

/// Bars shown before the entry candle when focusing a trade.
pub const FOCUS_LEAD_BARS: usize = 5;
/// Maximum distance between the entry time and its marker candle.
pub const ENTRY_MARKER_MAX_DISTANCE_SECONDS: i64 = 300;
/// Maximum distance between the entry time and the candle used for price alignment.
pub const PRICE_ALIGNMENT_MAX_DISTANCE_SECONDS: i64 = 4 * 60 * 60;

fn default_point_value() -> f64 {
    20.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    fn direction(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

/// The journaled trade a replay session revolves around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeContext {
    pub side: TradeSide,
    pub entry_time: UnixSeconds,
    pub entry_price: f64,
    #[serde(default)]
    pub exit_time: Option<UnixSeconds>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
    /// Currency value of a one-point move.
    #[serde(default = "default_point_value")]
    pub point_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    /// Replay has not reached the entry candle yet.
    Waiting,
    Open,
    ClosedAtExit,
    ClosedAtStop,
}

/// Trade state as of one replay position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeProgress {
    pub status: TradeStatus,
    pub pnl_points: f64,
    pub pnl_value: f64,
    pub elapsed_seconds: i64,
}

impl TradeProgress {
    fn waiting() -> Self {
        Self {
            status: TradeStatus::Waiting,
            pnl_points: 0.0,
            pnl_value: 0.0,
            elapsed_seconds: 0,
        }
    }
}

impl TradeContext {
    #[must_use]
    pub fn new(side: TradeSide, entry_time: UnixSeconds, entry_price: f64) -> Self {
        Self {
            side,
            entry_time,
            entry_price,
            exit_time: None,
            exit_price: None,
            stop_loss: None,
            take_profit: None,
            point_value: default_point_value(),
        }
    }

    #[must_use]
    pub fn with_exit_time(mut self, exit_time: UnixSeconds) -> Self {
        self.exit_time = Some(exit_time);
        self
    }

    #[must_use]
    pub fn with_exit_price(mut self, exit_price: f64) -> Self {
        self.exit_price = Some(exit_price);
        self
    }

    #[must_use]
    pub fn with_stop_loss(mut self, stop_loss: f64) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    #[must_use]
    pub fn with_take_profit(mut self, take_profit: f64) -> Self {
        self.take_profit = Some(take_profit);
        self
    }

    #[must_use]
    pub fn with_point_value(mut self, point_value: f64) -> Self {
        self.point_value = point_value;
        self
    }

    pub fn validate(&self) -> ReplayResult<()> {
        let prices = [Some(self.entry_price), self.exit_price, self.stop_loss, self.take_profit];
        if prices.into_iter().flatten().any(|price| !price.is_finite()) {
            return Err(ReplayError::InvalidData(
                "trade prices must be finite".to_owned(),
            ));
        }
        if self.exit_time.is_some_and(|exit_time| exit_time < self.entry_time) {
            return Err(ReplayError::InvalidData(
                "trade exit time must not precede the entry time".to_owned(),
            ));
        }
        if !self.point_value.is_finite() || self.point_value <= 0.0 {
            return Err(ReplayError::InvalidData(
                "trade point value must be finite and > 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Index of the first candle at or after the entry time.
    #[must_use]
    pub fn entry_index(&self, series: &CandleSeries) -> Option<usize> {
        let index = series
            .as_slice()
            .partition_point(|candle| candle.time < self.entry_time);
        (index < series.len()).then_some(index)
    }

    /// Replay position that shows a few bars of lead-in before the entry.
    #[must_use]
    pub fn focus_index(&self, series: &CandleSeries) -> Option<usize> {
        self.entry_index(series)
            .map(|index| index.saturating_sub(FOCUS_LEAD_BARS))
    }

    /// Candle that should carry the entry marker.
    #[must_use]
    pub fn entry_marker_time(&self, series: &CandleSeries) -> Option<UnixSeconds> {
        series
            .nearest(self.entry_time)
            .filter(|candle| {
                candle.time.abs_diff(self.entry_time) < ENTRY_MARKER_MAX_DISTANCE_SECONDS as u64
            })
            .map(|candle| candle.time)
    }

    /// Price shift that makes the feed agree with the journaled entry:
    /// `entry_price - close` of the candle nearest the entry, when that candle
    /// is less than four hours away. `candles` may arrive in any order.
    #[must_use]
    pub fn price_offset(&self, candles: &[Candle]) -> Option<f64> {
        candles
            .iter()
            .min_by_key(|candle| candle.time.abs_diff(self.entry_time))
            .filter(|candle| {
                candle.time.abs_diff(self.entry_time)
                    < PRICE_ALIGNMENT_MAX_DISTANCE_SECONDS as u64
            })
            .map(|candle| self.entry_price - candle.close)
    }

    fn closing_price(&self, candle: &Candle) -> Option<(TradeStatus, f64)> {
        let stop_hit = self.stop_loss.filter(|stop| match self.side {
            TradeSide::Long => candle.low <= *stop,
            TradeSide::Short => candle.high >= *stop,
        });
        if let Some(stop) = stop_hit {
            return Some((TradeStatus::ClosedAtStop, stop));
        }
        let exit_hit = self.exit_price.filter(|exit| match self.side {
            TradeSide::Long => candle.high >= *exit,
            TradeSide::Short => candle.low <= *exit,
        });
        if let Some(exit) = exit_hit {
            return Some((TradeStatus::ClosedAtExit, exit));
        }
        self.exit_time
            .filter(|exit_time| candle.time >= *exit_time)
            .map(|_| {
                (
                    TradeStatus::ClosedAtExit,
                    self.exit_price.unwrap_or(candle.close),
                )
            })
    }

    /// Evaluates the trade against `visible`, the replay-filtered candles.
    ///
    /// Within one candle a stop hit takes precedence over an exit hit. The
    /// trade also closes at the candle reached at `exit_time`.
    #[must_use]
    pub fn evaluate(&self, visible: &[Candle]) -> TradeProgress {
        let start = visible.partition_point(|candle| candle.time < self.entry_time);
        let Some(current) = visible.last().filter(|_| start < visible.len()) else {
            return TradeProgress::waiting();
        };

        let direction = self.side.direction();
        for candle in &visible[start..] {
            if let Some((status, price)) = self.closing_price(candle) {
                let pnl_points = (price - self.entry_price) * direction;
                return TradeProgress {
                    status,
                    pnl_points,
                    pnl_value: pnl_points * self.point_value,
                    elapsed_seconds: candle.time - self.entry_time,
                };
            }
        }

        let pnl_points = (current.close - self.entry_price) * direction;
        TradeProgress {
            status: TradeStatus::Open,
            pnl_points,
            pnl_value: pnl_points * self.point_value,
            elapsed_seconds: current.time - self.entry_time,
        }
    }

    /// Entry, exit, stop-loss and take-profit reference lines.
    #[must_use]
    pub fn price_levels(&self) -> Vec<PriceLevel> {
        let blue = Color::rgb(0.231, 0.510, 0.965);
        let green = Color::rgb(0.063, 0.725, 0.506);
        let red = Color::rgb(0.957, 0.247, 0.369);
        let mut levels = vec![PriceLevel {
            label: "Entry".to_owned(),
            price: self.entry_price,
            color: blue,
            line_style: LineStyle::Solid,
        }];
        let optional = [
            ("Exit", self.exit_price, green, LineStyle::Solid),
            ("SL", self.stop_loss, red, LineStyle::Dashed),
            ("TP", self.take_profit, green, LineStyle::Dashed),
        ];
        for (label, price, color, line_style) in optional {
            if let Some(price) = price {
                levels.push(PriceLevel {
                    label: label.to_owned(),
                    price,
                    color,
                    line_style,
                });
            }
        }
        levels
    }
}
