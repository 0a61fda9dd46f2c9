use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::core::DomainPoint;
use crate::error::{ReplayError, ReplayResult};
use crate::render::Color;

/// Opaque, unique drawing identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawingId(String);

impl DrawingId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random (v4) identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrawingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingKind {
    Line,
    Rect,
    Text,
    Fib,
    Horizontal,
}

impl DrawingKind {
    /// Number of anchor points a committed drawing of this kind carries.
    #[must_use]
    pub const fn point_count(self) -> usize {
        match self {
            Self::Line | Self::Rect | Self::Fib => 2,
            Self::Text | Self::Horizontal => 1,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Rect => "rect",
            Self::Text => "text",
            Self::Fib => "fib",
            Self::Horizontal => "horizontal",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillStyle {
    pub color: String,
    pub opacity: f64,
}

fn default_color() -> String {
    "#2962ff".to_owned()
}

fn default_opacity() -> f64 {
    1.0
}

fn default_line_width() -> f64 {
    2.0
}

fn default_text_size() -> f64 {
    14.0
}

/// Visual attributes shared by every drawing kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingStyle {
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    #[serde(default)]
    pub line_style: LineStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<FillStyle>,
    #[serde(default = "default_text_size")]
    pub text_size: f64,
    /// Extends fib level lines to the right pane edge.
    #[serde(default)]
    pub extend_lines: bool,
    #[serde(default)]
    pub show_prices: bool,
}

impl Default for DrawingStyle {
    fn default() -> Self {
        Self {
            color: default_color(),
            opacity: default_opacity(),
            line_width: default_line_width(),
            line_style: LineStyle::Solid,
            fill: None,
            text_size: default_text_size(),
            extend_lines: false,
            show_prices: false,
        }
    }
}

impl DrawingStyle {
    pub fn validate(&self) -> ReplayResult<()> {
        Color::from_hex(&self.color)?;
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(ReplayError::InvalidData(
                "style opacity must be finite and in [0, 1]".to_owned(),
            ));
        }
        if !self.line_width.is_finite() || self.line_width <= 0.0 {
            return Err(ReplayError::InvalidData(
                "style line width must be finite and > 0".to_owned(),
            ));
        }
        if !self.text_size.is_finite() || self.text_size <= 0.0 {
            return Err(ReplayError::InvalidData(
                "style text size must be finite and > 0".to_owned(),
            ));
        }
        if let Some(fill) = &self.fill {
            Color::from_hex(&fill.color)?;
            if !fill.opacity.is_finite() || !(0.0..=1.0).contains(&fill.opacity) {
                return Err(ReplayError::InvalidData(
                    "fill opacity must be finite and in [0, 1]".to_owned(),
                ));
            }
        }
        Ok(())
    }

    /// Stroke color with the style opacity applied.
    #[must_use]
    pub fn stroke_color(&self) -> Option<Color> {
        Color::from_hex(&self.color)
            .ok()
            .map(|color| color.with_opacity(self.opacity))
    }

    #[must_use]
    pub fn fill_color(&self) -> Option<Color> {
        let fill = self.fill.as_ref()?;
        Color::from_hex(&fill.color)
            .ok()
            .map(|color| color.with_opacity(fill.opacity))
    }
}

/// Partial style update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePatch {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub line_width: Option<f64>,
    #[serde(default)]
    pub line_style: Option<LineStyle>,
    /// `Some(None)` removes the fill.
    #[serde(default)]
    pub fill: Option<Option<FillStyle>>,
    #[serde(default)]
    pub text_size: Option<f64>,
    #[serde(default)]
    pub extend_lines: Option<bool>,
    #[serde(default)]
    pub show_prices: Option<bool>,
}

impl StylePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn applied_to(&self, style: &DrawingStyle) -> DrawingStyle {
        let mut next = style.clone();
        if let Some(color) = &self.color {
            next.color.clone_from(color);
        }
        if let Some(opacity) = self.opacity {
            next.opacity = opacity;
        }
        if let Some(line_width) = self.line_width {
            next.line_width = line_width;
        }
        if let Some(line_style) = self.line_style {
            next.line_style = line_style;
        }
        if let Some(fill) = &self.fill {
            next.fill.clone_from(fill);
        }
        if let Some(text_size) = self.text_size {
            next.text_size = text_size;
        }
        if let Some(extend_lines) = self.extend_lines {
            next.extend_lines = extend_lines;
        }
        if let Some(show_prices) = self.show_prices {
            next.show_prices = show_prices;
        }
        next
    }
}

/// One Fibonacci retracement level.
///
/// Level `0` sits on the second anchor, level `1` on the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub value: f64,
    pub color: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl FibLevel {
    #[must_use]
    pub fn new(value: f64, color: impl Into<String>) -> Self {
        Self {
            value,
            color: color.into(),
            active: true,
        }
    }

    /// Price of this level for a fib anchored at `first` and `second`.
    #[must_use]
    pub fn price(&self, first: DomainPoint, second: DomainPoint) -> f64 {
        second.price - (second.price - first.price) * self.value
    }
}

#[must_use]
pub fn default_fib_levels() -> Vec<FibLevel> {
    vec![
        FibLevel::new(0.0, "#787b86"),
        FibLevel::new(0.236, "#f44336"),
        FibLevel::new(0.382, "#ff9800"),
        FibLevel::new(0.5, "#ffeb3b"),
        FibLevel::new(0.618, "#4caf50"),
        FibLevel::new(0.786, "#00bcd4"),
        FibLevel::new(1.0, "#2196f3"),
    ]
}

pub type DrawingPoints = SmallVec<[DomainPoint; 2]>;

/// A committed annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingObject {
    pub id: DrawingId,
    #[serde(rename = "type")]
    pub kind: DrawingKind,
    pub points: DrawingPoints,
    #[serde(default)]
    pub style: DrawingStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fib_levels: Option<Vec<FibLevel>>,
    /// Timeframe labels this drawing shows on; `None` means every timeframe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_timeframes: Option<BTreeSet<String>>,
}

impl DrawingObject {
    /// Builds a drawing with a fresh id and kind-specific defaults.
    pub fn new(
        kind: DrawingKind,
        points: impl IntoIterator<Item = DomainPoint>,
    ) -> ReplayResult<Self> {
        let drawing = Self {
            id: DrawingId::generate(),
            kind,
            points: points.into_iter().collect(),
            style: DrawingStyle::default(),
            text: (kind == DrawingKind::Text).then(String::new),
            fib_levels: (kind == DrawingKind::Fib).then(default_fib_levels),
            visible_timeframes: None,
        };
        drawing.validate()?;
        Ok(drawing)
    }

    #[must_use]
    pub fn with_id(mut self, id: DrawingId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: DrawingStyle) -> Self {
        self.style = style;
        self
    }

    pub fn validate(&self) -> ReplayResult<()> {
        if self.points.len() != self.kind.point_count() {
            return Err(ReplayError::InvalidData(format!(
                "{} drawing requires {} point(s), got {}",
                self.kind.label(),
                self.kind.point_count(),
                self.points.len()
            )));
        }
        if self.points.iter().any(|point| !point.price.is_finite()) {
            return Err(ReplayError::InvalidData(
                "drawing prices must be finite".to_owned(),
            ));
        }
        self.style.validate()
    }

    /// Timeframe filter applied at render time.
    #[must_use]
    pub fn is_visible_on(&self, timeframe_label: &str) -> bool {
        self.visible_timeframes
            .as_ref()
            .is_none_or(|labels| labels.contains(timeframe_label))
    }

    /// Copy with every point shifted by the same delta.
    #[must_use]
    pub fn translated(&self, delta_time: i64, delta_price: f64) -> Self {
        let mut moved = self.clone();
        for point in &mut moved.points {
            *point = point.translated(delta_time, delta_price);
        }
        moved
    }

    /// Copy with one anchor replaced; out-of-range indices return an unchanged copy.
    #[must_use]
    pub fn with_point(&self, index: usize, point: DomainPoint) -> Self {
        let mut resized = self.clone();
        if let Some(slot) = resized.points.get_mut(index) {
            *slot = point;
        }
        resized
    }

    #[must_use]
    pub fn fib_levels_or_default(&self) -> Vec<FibLevel> {
        self.fib_levels.clone().unwrap_or_else(default_fib_levels)
    }
}
