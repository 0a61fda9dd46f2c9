use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::core::UnixSeconds;
use crate::error::{ReplayError, ReplayResult};

pub fn decimal_to_f64(value: Decimal, field_name: &str) -> ReplayResult<f64> {
    value.to_f64().ok_or_else(|| {
        ReplayError::InvalidData(format!("{field_name} cannot be represented as f64"))
    })
}

/// Candle times are whole seconds; sub-second precision is truncated.
#[must_use]
pub fn datetime_to_unix_seconds(time: DateTime<Utc>) -> UnixSeconds {
    time.timestamp()
}

pub fn unix_seconds_to_datetime(time: UnixSeconds) -> ReplayResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(time, 0)
        .ok_or_else(|| ReplayError::InvalidData(format!("timestamp {time} is out of range")))
}
