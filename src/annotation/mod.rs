//! Drawing objects, the tool state machine and undo/redo history.

mod drawing;
mod engine;
mod history;
pub mod hit_test;
mod template;

pub use drawing::{
    DrawingId, DrawingKind, DrawingObject, DrawingPoints, DrawingStyle, FibLevel, FillStyle,
    LineStyle, StylePatch, default_fib_levels,
};
pub use engine::{AnnotationEngine, CommitKind, HitContext, PointerSample, Tool};
pub use history::HistoryStacks;
pub use hit_test::HitTolerance;
pub use template::DrawingTemplate;
