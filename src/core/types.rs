use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, ReplayResult};

/// Unix timestamp in whole seconds.
pub type UnixSeconds = i64;

/// Pixel size of one chart pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneSize {
    pub width: u32,
    pub height: u32,
}

impl PaneSize {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A pane reports zero size until it has been laid out.
    #[must_use]
    pub fn is_laid_out(self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn validate(self) -> ReplayResult<Self> {
        if !self.is_laid_out() {
            return Err(ReplayError::InvalidViewport {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }
}

/// Visible time window of a pane, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub from: UnixSeconds,
    pub to: UnixSeconds,
}

impl Viewport {
    #[must_use]
    pub fn new(from: UnixSeconds, to: UnixSeconds) -> Self {
        Self { from, to }
    }

    /// Window of `length` seconds ending at `to`.
    #[must_use]
    pub fn ending_at(to: UnixSeconds, length: i64) -> Self {
        Self {
            from: to.saturating_sub(length),
            to,
        }
    }

    #[must_use]
    pub fn span(self) -> i64 {
        self.to - self.from
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.to > self.from
    }

    #[must_use]
    pub fn contains(self, time: UnixSeconds) -> bool {
        time >= self.from && time <= self.to
    }
}

/// Visible price window of a pane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.max > self.min
    }
}

/// Layout facts a pane needs to decode pointer positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartGeometry {
    pub size: PaneSize,
    pub price_range: PriceRange,
}

impl ChartGeometry {
    #[must_use]
    pub fn new(size: PaneSize, price_range: PriceRange) -> Self {
        Self { size, price_range }
    }
}

/// A point in the chart's (time, price) domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainPoint {
    pub time: UnixSeconds,
    pub price: f64,
}

impl DomainPoint {
    #[must_use]
    pub fn new(time: UnixSeconds, price: f64) -> Self {
        Self { time, price }
    }

    #[must_use]
    pub fn translated(self, delta_time: i64, delta_price: f64) -> Self {
        Self {
            time: self.time + delta_time,
            price: self.price + delta_price,
        }
    }
}

/// A point in pane pixel space, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance_to(self, other: PixelPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}
