use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::UnixSeconds;
use crate::core::primitives::{datetime_to_unix_seconds, decimal_to_f64};
use crate::error::{ReplayError, ReplayResult};

/// One OHLC price bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: UnixSeconds,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    /// Builds a validated candle from raw floating values.
    ///
    /// Invariants:
    /// - all prices are finite
    /// - `low <= high`
    /// - `open` and `close` are within `[low, high]`
    pub fn new(
        time: UnixSeconds,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> ReplayResult<Self> {
        let candle = Self {
            time,
            open,
            high,
            low,
            close,
        };
        candle.validate()?;
        Ok(candle)
    }

    /// Converts strongly-typed temporal/decimal input into a validated candle.
    pub fn from_decimal_time(
        time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> ReplayResult<Self> {
        Self::new(
            datetime_to_unix_seconds(time),
            decimal_to_f64(open, "open")?,
            decimal_to_f64(high, "high")?,
            decimal_to_f64(low, "low")?,
            decimal_to_f64(close, "close")?,
        )
    }

    pub fn validate(&self) -> ReplayResult<()> {
        if !self.open.is_finite()
            || !self.high.is_finite()
            || !self.low.is_finite()
            || !self.close.is_finite()
        {
            return Err(ReplayError::InvalidData(
                "ohlc values must be finite".to_owned(),
            ));
        }

        if self.low > self.high {
            return Err(ReplayError::InvalidData(
                "ohlc low must be <= high".to_owned(),
            ));
        }

        if self.open < self.low
            || self.open > self.high
            || self.close < self.low
            || self.close > self.high
        {
            return Err(ReplayError::InvalidData(
                "ohlc open/close must be within low/high range".to_owned(),
            ));
        }

        Ok(())
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Returns `true` when close price is greater than or equal to open price.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// Same bar with every price moved by `offset`.
    #[must_use]
    pub fn shifted(self, offset: f64) -> Self {
        Self {
            open: self.open + offset,
            high: self.high + offset,
            low: self.low + offset,
            close: self.close + offset,
            ..self
        }
    }

    /// OHLC values in the fixed order used for magnet tie-breaking.
    #[must_use]
    pub fn ohlc(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }
}
