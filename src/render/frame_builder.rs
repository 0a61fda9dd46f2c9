use crate::annotation::{DrawingKind, DrawingObject, LineStyle};
use crate::core::{Candle, PixelPoint};
use crate::error::{ReplayError, ReplayResult};
use crate::interaction::PaneTransform;
use crate::render::{
    Color, LinePrimitive, RectPrimitive, RenderFrame, TextHAlign, TextPrimitive,
};

/// Colors and sizes used when materializing a pane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStyle {
    pub bullish: Color,
    pub bearish: Color,
    pub wick_width_px: f64,
    /// Body width as a share of the bar spacing.
    pub body_ratio: f64,
    pub label_font_size_px: f64,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            bullish: Color::rgb(0.149, 0.651, 0.604),
            bearish: Color::rgb(0.937, 0.325, 0.314),
            wick_width_px: 1.0,
            body_ratio: 0.7,
            label_font_size_px: 10.0,
        }
    }
}

/// Horizontal reference line spanning the whole pane.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLevel {
    pub label: String,
    pub price: f64,
    pub color: Color,
    pub line_style: LineStyle,
}

/// Accumulates primitives for one pane in paint order.
#[derive(Debug)]
pub struct PaneFrameBuilder<'a> {
    transform: &'a PaneTransform,
    style: FrameStyle,
    frame: RenderFrame,
}

impl<'a> PaneFrameBuilder<'a> {
    pub fn new(transform: &'a PaneTransform, style: FrameStyle) -> ReplayResult<Self> {
        let size = transform.geometry.size.validate()?;
        if !transform.is_decodable() {
            return Err(ReplayError::InvalidData(
                "pane viewport and price range must be non-degenerate".to_owned(),
            ));
        }
        Ok(Self {
            transform,
            style,
            frame: RenderFrame::new(size),
        })
    }

    /// Wick plus body per candle; candles left or right of the pane are skipped.
    #[must_use]
    pub fn candles(mut self, candles: &[Candle], bar_interval_seconds: i64) -> Self {
        let bar_spacing = self
            .transform
            .seconds_per_pixel()
            .filter(|spp| *spp > 0.0)
            .map_or(1.0, |spp| bar_interval_seconds as f64 / spp);
        let body_width = (bar_spacing * self.style.body_ratio).max(1.0);
        let width = self.transform.width();

        for candle in candles {
            let Some(x) = self.transform.time_to_x(candle.time) else {
                continue;
            };
            if x < -bar_spacing || x > width + bar_spacing {
                continue;
            }
            let (Some(high), Some(low), Some(open), Some(close)) = (
                self.transform.price_to_y(candle.high),
                self.transform.price_to_y(candle.low),
                self.transform.price_to_y(candle.open),
                self.transform.price_to_y(candle.close),
            ) else {
                continue;
            };
            let color = if candle.is_bullish() {
                self.style.bullish
            } else {
                self.style.bearish
            };
            self.frame.lines.push(LinePrimitive::new(
                x,
                high,
                x,
                low,
                self.style.wick_width_px,
                color,
            ));
            self.frame.rects.push(
                RectPrimitive::from_corners(
                    x - body_width / 2.0,
                    open,
                    x + body_width / 2.0,
                    close,
                    color,
                )
                .with_fill(color),
            );
        }
        self
    }

    /// Committed drawings with `preview` painted in place of the drawing it
    /// edits, or on top when it is a new draft.
    #[must_use]
    pub fn drawings<'d>(
        mut self,
        drawings: impl IntoIterator<Item = &'d DrawingObject>,
        preview: Option<&DrawingObject>,
    ) -> Self {
        let mut preview_painted = false;
        for drawing in drawings {
            match preview {
                Some(edited) if edited.id == drawing.id => {
                    self.push_drawing(edited);
                    preview_painted = true;
                }
                _ => self.push_drawing(drawing),
            }
        }
        if let Some(draft) = preview {
            if !preview_painted {
                self.push_drawing(draft);
            }
        }
        self
    }

    #[must_use]
    pub fn price_levels(mut self, levels: &[PriceLevel]) -> Self {
        let width = self.transform.width();
        for level in levels {
            let Some(y) = self.transform.price_to_y(level.price) else {
                continue;
            };
            self.frame.lines.push(
                LinePrimitive::new(0.0, y, width, y, 1.0, level.color)
                    .with_stroke_style(level.line_style),
            );
            if !level.label.is_empty() {
                self.frame.texts.push(TextPrimitive::new(
                    format!("{} {:.2}", level.label, level.price),
                    width - 4.0,
                    y - 4.0,
                    self.style.label_font_size_px,
                    level.color,
                    TextHAlign::Right,
                ));
            }
        }
        self
    }

    #[must_use]
    pub fn finish(self) -> RenderFrame {
        self.frame
    }

    fn push_drawing(&mut self, drawing: &DrawingObject) {
        let Some(color) = drawing.style.stroke_color() else {
            return;
        };
        let anchors: Option<Vec<PixelPoint>> = drawing
            .points
            .iter()
            .map(|point| self.transform.domain_to_pixel(*point))
            .collect();
        let Some(anchors) = anchors else {
            return;
        };
        let stroke = |a: PixelPoint, b: PixelPoint| {
            LinePrimitive::new(a.x, a.y, b.x, b.y, drawing.style.line_width, color)
                .with_stroke_style(drawing.style.line_style)
        };

        match (drawing.kind, anchors.as_slice()) {
            (DrawingKind::Line, [a, b]) => {
                self.frame.lines.push(stroke(*a, *b));
                if drawing.style.show_prices {
                    self.push_label(format!("{:.2}", drawing.points[1].price), *b, color);
                }
            }
            (DrawingKind::Rect, [a, b]) => {
                let mut rect = RectPrimitive::from_corners(a.x, a.y, b.x, b.y, color)
                    .with_border_width(drawing.style.line_width);
                if let Some(fill) = drawing.style.fill_color() {
                    rect = rect.with_fill(fill);
                }
                self.frame.rects.push(rect);
            }
            (DrawingKind::Horizontal, [a]) => {
                let width = self.transform.width();
                self.frame.lines.push(stroke(
                    PixelPoint::new(0.0, a.y),
                    PixelPoint::new(width, a.y),
                ));
                self.push_label(
                    format!("{:.2}", drawing.points[0].price),
                    PixelPoint::new(a.x.max(0.0), a.y),
                    color,
                );
            }
            (DrawingKind::Text, [a]) => {
                if let Some(text) = drawing.text.as_deref().filter(|text| !text.is_empty()) {
                    self.frame.texts.push(TextPrimitive::new(
                        text,
                        a.x,
                        a.y,
                        drawing.style.text_size,
                        color,
                        TextHAlign::Left,
                    ));
                }
            }
            (DrawingKind::Fib, [a, b]) => self.push_fib(drawing, *a, *b, color),
            _ => {}
        }
    }

    fn push_fib(&mut self, drawing: &DrawingObject, a: PixelPoint, b: PixelPoint, color: Color) {
        self.frame.lines.push(
            LinePrimitive::new(a.x, a.y, b.x, b.y, 1.0, color.with_opacity(0.5))
                .with_stroke_style(LineStyle::Dashed),
        );
        let x_start = a.x.min(b.x);
        let x_end = if drawing.style.extend_lines {
            self.transform.width()
        } else {
            a.x.max(b.x)
        };
        let (first, second) = (drawing.points[0], drawing.points[1]);
        for level in drawing.fib_levels_or_default().iter().filter(|l| l.active) {
            let price = level.price(first, second);
            let Some(y) = self.transform.price_to_y(price) else {
                continue;
            };
            let level_color = Color::from_hex(&level.color)
                .map(|c| c.with_opacity(drawing.style.opacity))
                .unwrap_or(color);
            self.frame.lines.push(
                LinePrimitive::new(x_start, y, x_end, y, drawing.style.line_width, level_color)
                    .with_stroke_style(drawing.style.line_style),
            );
            let label = if drawing.style.show_prices {
                format!("{} ({price:.2})", level.value)
            } else {
                level.value.to_string()
            };
            self.push_label(label, PixelPoint::new(x_start, y), level_color);
        }
    }

    fn push_label(&mut self, text: String, at: PixelPoint, color: Color) {
        self.frame.texts.push(TextPrimitive::new(
            text,
            at.x + 5.0,
            at.y - 5.0,
            self.style.label_font_size_px,
            color,
            TextHAlign::Left,
        ));
    }
}
