use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::{
    Candle, ChartGeometry, DomainPoint, LinearScale, PixelPoint, UnixSeconds, Viewport,
    nearest_index,
};

/// Pixel <-> (time, price) transform for one laid-out pane.
///
/// Time maps linearly onto `[0, width]`; price maps onto `[0, height]` with
/// the axis inverted so higher prices sit closer to the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaneTransform {
    pub viewport: Viewport,
    pub geometry: ChartGeometry,
}

impl PaneTransform {
    #[must_use]
    pub fn new(viewport: Viewport, geometry: ChartGeometry) -> Self {
        Self { viewport, geometry }
    }

    fn time_scale(&self) -> Option<LinearScale> {
        if !self.geometry.size.is_laid_out() || !self.viewport.is_valid() {
            return None;
        }
        LinearScale::new(
            self.viewport.from as f64,
            self.viewport.to as f64,
            f64::from(self.geometry.size.width),
        )
        .ok()
    }

    fn price_scale(&self) -> Option<LinearScale> {
        let range = self.geometry.price_range;
        if !self.geometry.size.is_laid_out() || !range.is_valid() {
            return None;
        }
        LinearScale::new(range.min, range.max, f64::from(self.geometry.size.height))
            .ok()
            .map(LinearScale::inverted)
    }

    /// Returns `true` once the pane has a size and non-degenerate ranges.
    #[must_use]
    pub fn is_decodable(&self) -> bool {
        self.time_scale().is_some() && self.price_scale().is_some()
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        f64::from(self.geometry.size.width)
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        f64::from(self.geometry.size.height)
    }

    /// Decodes a pointer position; `None` outside the pane or before layout.
    #[must_use]
    pub fn pixel_to_domain(&self, pixel: PixelPoint) -> Option<DomainPoint> {
        if !pixel.x.is_finite() || !pixel.y.is_finite() {
            return None;
        }
        if pixel.x < 0.0 || pixel.y < 0.0 || pixel.x > self.width() || pixel.y > self.height() {
            return None;
        }
        let time = self.time_scale()?.pixel_to_domain(pixel.x).ok()?;
        let price = self.price_scale()?.pixel_to_domain(pixel.y).ok()?;
        Some(DomainPoint::new(time.round() as UnixSeconds, price))
    }

    /// Encodes a domain point; the result may lie outside the pane bounds.
    #[must_use]
    pub fn domain_to_pixel(&self, point: DomainPoint) -> Option<PixelPoint> {
        Some(PixelPoint::new(
            self.time_to_x(point.time)?,
            self.price_to_y(point.price)?,
        ))
    }

    #[must_use]
    pub fn time_to_x(&self, time: UnixSeconds) -> Option<f64> {
        self.time_scale()?.domain_to_pixel(time as f64).ok()
    }

    #[must_use]
    pub fn price_to_y(&self, price: f64) -> Option<f64> {
        self.price_scale()?.domain_to_pixel(price).ok()
    }

    #[must_use]
    pub fn y_to_price(&self, y: f64) -> Option<f64> {
        self.price_scale()?.pixel_to_domain(y).ok()
    }

    /// Seconds covered by one horizontal pixel.
    #[must_use]
    pub fn seconds_per_pixel(&self) -> Option<f64> {
        self.time_scale().map(LinearScale::units_per_pixel)
    }
}

/// Free-function form of [`PaneTransform::pixel_to_domain`].
#[must_use]
pub fn pixel_to_domain(
    x: f64,
    y: f64,
    viewport: Viewport,
    geometry: ChartGeometry,
) -> Option<DomainPoint> {
    PaneTransform::new(viewport, geometry).pixel_to_domain(PixelPoint::new(x, y))
}

/// Free-function form of [`PaneTransform::domain_to_pixel`].
#[must_use]
pub fn domain_to_pixel(
    point: DomainPoint,
    viewport: Viewport,
    geometry: ChartGeometry,
) -> Option<PixelPoint> {
    PaneTransform::new(viewport, geometry).domain_to_pixel(point)
}

fn default_threshold_bars() -> f64 {
    1.0
}

/// Magnet snapping configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnetConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Snap radius expressed in bars of the active timeframe.
    #[serde(default = "default_threshold_bars")]
    pub threshold_bars: f64,
}

impl Default for MagnetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_bars: default_threshold_bars(),
        }
    }
}

/// OHLC value closest to `price`; equidistant values resolve in
/// open, high, low, close order.
#[must_use]
pub fn closest_ohlc(candle: &Candle, price: f64) -> f64 {
    let ohlc = candle.ohlc();
    ohlc.into_iter()
        .min_by_key(|value| OrderedFloat((value - price).abs()))
        .unwrap_or(ohlc[0])
}

/// Snaps `raw` onto the nearest of `candles` (sorted ascending by time) when
/// it lies within `threshold_seconds`.
#[must_use]
pub fn snap_to_candle(
    raw: DomainPoint,
    candles: &[Candle],
    threshold_seconds: f64,
) -> Option<DomainPoint> {
    let candle = &candles[nearest_index(candles, raw.time)?];
    let distance = candle.time.abs_diff(raw.time) as f64;
    if distance > threshold_seconds {
        return None;
    }
    Some(DomainPoint::new(candle.time, closest_ohlc(candle, raw.price)))
}

/// Pointer decoding plus optional magnet snapping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoordinateMapper {
    magnet: MagnetConfig,
}

impl CoordinateMapper {
    #[must_use]
    pub fn new(magnet: MagnetConfig) -> Self {
        Self { magnet }
    }

    #[must_use]
    pub fn magnet(&self) -> MagnetConfig {
        self.magnet
    }

    pub fn set_magnet(&mut self, magnet: MagnetConfig) {
        self.magnet = magnet;
    }

    pub fn set_magnet_enabled(&mut self, enabled: bool) {
        self.magnet.enabled = enabled;
    }

    /// Applies magnet snapping to an already decoded point.
    ///
    /// The threshold scales with `bar_interval_seconds` so it behaves the
    /// same on minute and daily charts.
    #[must_use]
    pub fn snap(
        &self,
        raw: DomainPoint,
        candles: &[Candle],
        bar_interval_seconds: i64,
    ) -> DomainPoint {
        if !self.magnet.enabled {
            return raw;
        }
        let threshold = self.magnet.threshold_bars * bar_interval_seconds as f64;
        snap_to_candle(raw, candles, threshold).unwrap_or(raw)
    }

    /// Decodes a pointer position and snaps it.
    #[must_use]
    pub fn resolve(
        &self,
        pixel: PixelPoint,
        transform: &PaneTransform,
        candles: &[Candle],
        bar_interval_seconds: i64,
    ) -> Option<DomainPoint> {
        let raw = transform.pixel_to_domain(pixel)?;
        Some(self.snap(raw, candles, bar_interval_seconds))
    }
}
