mod frame;
mod frame_builder;
mod null_renderer;
mod primitives;

pub use frame::RenderFrame;
pub use frame_builder::{FrameStyle, PaneFrameBuilder, PriceLevel};
pub use null_renderer::NullRenderer;
pub use primitives::{Color, LinePrimitive, RectPrimitive, TextHAlign, TextPrimitive};

use crate::error::ReplayResult;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized `RenderFrame` in pane pixel space, so
/// drawing code stays isolated from replay and annotation logic.
pub trait Renderer {
    fn render(&mut self, frame: &RenderFrame) -> ReplayResult<()>;
}
