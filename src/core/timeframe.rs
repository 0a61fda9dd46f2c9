//! Timeframes and multi-timeframe candle aggregation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Candle, CandleSeries, UnixSeconds};
use crate::error::{ReplayError, ReplayResult};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Bar duration of a candle series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "D")]
    Day1,
    #[serde(rename = "W")]
    Week1,
}

impl Timeframe {
    /// Duration of one bar in seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Min1 => MINUTE,
            Self::Min5 => 5 * MINUTE,
            Self::Min15 => 15 * MINUTE,
            Self::Hour1 => HOUR,
            Self::Hour4 => 4 * HOUR,
            Self::Day1 => DAY,
            Self::Week1 => 7 * DAY,
        }
    }

    /// Short label, also used by drawing visibility filters.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Min1 => "1m",
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day1 => "D",
            Self::Week1 => "W",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tf| tf.label() == label)
    }

    #[must_use]
    pub fn from_seconds(seconds: i64) -> Option<Self> {
        Self::all().iter().copied().find(|tf| tf.seconds() == seconds)
    }

    /// How far back one back-fill request reaches.
    #[must_use]
    pub const fn backfill_chunk_seconds(self) -> i64 {
        match self {
            Self::Min1 | Self::Min5 => 2 * DAY,
            Self::Min15 | Self::Hour1 => 30 * DAY,
            Self::Hour4 | Self::Day1 | Self::Week1 => 180 * DAY,
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Timeframe] {
        &[
            Self::Min1,
            Self::Min5,
            Self::Min15,
            Self::Hour1,
            Self::Hour4,
            Self::Day1,
            Self::Week1,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Start of the bucket that contains `time`.
#[must_use]
pub fn bucket_start(time: UnixSeconds, interval_seconds: i64) -> UnixSeconds {
    time.div_euclid(interval_seconds) * interval_seconds
}

/// Aggregates a sorted candle series into `interval_seconds` buckets.
///
/// Buckets are keyed by `floor(time / interval) * interval`. Within a bucket
/// `open` comes from the first candle, `close` from the last, `high`/`low`
/// are the extremes. The trailing bucket is emitted even when incomplete.
pub fn aggregate(candles: &[Candle], interval_seconds: i64) -> ReplayResult<CandleSeries> {
    if interval_seconds <= 0 {
        return Err(ReplayError::InvalidData(
            "aggregation interval must be > 0".to_owned(),
        ));
    }

    let mut aggregated: Vec<Candle> = Vec::new();
    for candle in candles {
        let start = bucket_start(candle.time, interval_seconds);
        match aggregated.last_mut() {
            Some(bucket) if bucket.time == start => {
                bucket.high = bucket.high.max(candle.high);
                bucket.low = bucket.low.min(candle.low);
                bucket.close = candle.close;
            }
            _ => aggregated.push(Candle {
                time: start,
                ..*candle
            }),
        }
    }

    CandleSeries::from_sorted(aggregated)
}

/// Aggregates into a named timeframe.
pub fn aggregate_to(candles: &[Candle], timeframe: Timeframe) -> ReplayResult<CandleSeries> {
    aggregate(candles, timeframe.seconds())
}
