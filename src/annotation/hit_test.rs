use serde::{Deserialize, Serialize};

use crate::annotation::{DrawingKind, DrawingObject};
use crate::core::PixelPoint;
use crate::interaction::PaneTransform;

fn default_tolerance_px() -> f64 {
    8.0
}

fn default_handle_radius_px() -> f64 {
    10.0
}

fn default_text_half_width_px() -> f64 {
    30.0
}

fn default_text_half_height_px() -> f64 {
    15.0
}

/// Pixel tolerances used when resolving what sits under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitTolerance {
    #[serde(default = "default_tolerance_px")]
    pub tolerance_px: f64,
    #[serde(default = "default_handle_radius_px")]
    pub handle_radius_px: f64,
    #[serde(default = "default_text_half_width_px")]
    pub text_half_width_px: f64,
    #[serde(default = "default_text_half_height_px")]
    pub text_half_height_px: f64,
}

impl Default for HitTolerance {
    fn default() -> Self {
        Self {
            tolerance_px: default_tolerance_px(),
            handle_radius_px: default_handle_radius_px(),
            text_half_width_px: default_text_half_width_px(),
            text_half_height_px: default_text_half_height_px(),
        }
    }
}

/// Distance from `point` to the segment `a..b`.
#[must_use]
pub fn distance_to_segment(point: PixelPoint, a: PixelPoint, b: PixelPoint) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq <= f64::EPSILON {
        return point.distance_to(a);
    }
    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    point.distance_to(PixelPoint::new(a.x + t * dx, a.y + t * dy))
}

fn project(drawing: &DrawingObject, transform: &PaneTransform) -> Option<Vec<PixelPoint>> {
    drawing
        .points
        .iter()
        .map(|point| transform.domain_to_pixel(*point))
        .collect()
}

/// Index of the anchor handle under the pointer, if any.
#[must_use]
pub fn handle_at(
    drawing: &DrawingObject,
    pointer: PixelPoint,
    transform: &PaneTransform,
    tolerance: &HitTolerance,
) -> Option<usize> {
    let anchors = project(drawing, transform)?;
    anchors
        .iter()
        .position(|anchor| anchor.distance_to(pointer) <= tolerance.handle_radius_px)
}

/// Whether the pointer lies on the drawing's body.
#[must_use]
pub fn hits_body(
    drawing: &DrawingObject,
    pointer: PixelPoint,
    transform: &PaneTransform,
    tolerance: &HitTolerance,
) -> bool {
    let Some(anchors) = project(drawing, transform) else {
        return false;
    };
    let tol = tolerance.tolerance_px;
    match (drawing.kind, anchors.as_slice()) {
        (DrawingKind::Rect, [a, b]) => {
            pointer.x >= a.x.min(b.x) - tol
                && pointer.x <= a.x.max(b.x) + tol
                && pointer.y >= a.y.min(b.y) - tol
                && pointer.y <= a.y.max(b.y) + tol
        }
        (DrawingKind::Line, [a, b]) => distance_to_segment(pointer, *a, *b) < tol,
        (DrawingKind::Fib, [a, b]) => {
            if distance_to_segment(pointer, *a, *b) < tol {
                return true;
            }
            let x_min = a.x.min(b.x);
            let x_max = if drawing.style.extend_lines {
                transform.width()
            } else {
                a.x.max(b.x)
            };
            if pointer.x < x_min - tol || pointer.x > x_max + tol {
                return false;
            }
            drawing
                .fib_levels_or_default()
                .iter()
                .filter(|level| level.active)
                .filter_map(|level| {
                    transform.price_to_y(level.price(drawing.points[0], drawing.points[1]))
                })
                .any(|y| (pointer.y - y).abs() < tol)
        }
        (DrawingKind::Horizontal, [a]) => (pointer.y - a.y).abs() < tol,
        (DrawingKind::Text, [a]) => {
            (pointer.x - a.x).abs() < tolerance.text_half_width_px
                && (pointer.y - a.y).abs() < tolerance.text_half_height_px
        }
        _ => false,
    }
}

/// Index of the topmost drawing under the pointer.
///
/// Drawings later in the slice are painted on top, so they are tested first.
/// `timeframe` hides drawings filtered out of the active pane.
#[must_use]
pub fn hit_test(
    drawings: &[DrawingObject],
    pointer: PixelPoint,
    transform: &PaneTransform,
    tolerance: &HitTolerance,
    timeframe: &str,
) -> Option<usize> {
    drawings
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, drawing)| drawing.is_visible_on(timeframe))
        .find(|(_, drawing)| hits_body(drawing, pointer, transform, tolerance))
        .map(|(index, _)| index)
}
