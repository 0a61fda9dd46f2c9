use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::annotation::hit_test::{HitTolerance, handle_at, hit_test};
use crate::annotation::{
    DrawingId, DrawingKind, DrawingObject, DrawingStyle, DrawingTemplate, FibLevel,
    HistoryStacks, StylePatch,
};
use crate::core::{DomainPoint, PixelPoint};
use crate::error::{ReplayError, ReplayResult};
use crate::interaction::{Modifiers, PaneTransform};

/// Active drawing tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Cursor,
    Line,
    Rect,
    Text,
    Fib,
    Horizontal,
    Eraser,
}

impl Tool {
    /// Drawing kind produced by this tool, if it creates drawings.
    #[must_use]
    pub const fn drawing_kind(self) -> Option<DrawingKind> {
        match self {
            Self::Line => Some(DrawingKind::Line),
            Self::Rect => Some(DrawingKind::Rect),
            Self::Text => Some(DrawingKind::Text),
            Self::Fib => Some(DrawingKind::Fib),
            Self::Horizontal => Some(DrawingKind::Horizontal),
            Self::Cursor | Self::Eraser => None,
        }
    }
}

/// Kind of user-visible edit that produced one history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitKind {
    Create,
    Delete,
    Move,
    Resize,
    Style,
    Text,
    Visibility,
    ClearAll,
}

/// One decoded pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub pixel: PixelPoint,
    /// Domain position after magnet snapping.
    pub point: DomainPoint,
    pub modifiers: Modifiers,
}

impl PointerSample {
    #[must_use]
    pub fn new(pixel: PixelPoint, point: DomainPoint, modifiers: Modifiers) -> Self {
        Self {
            pixel,
            point,
            modifiers,
        }
    }
}

/// Pane facts needed to resolve hits.
#[derive(Debug, Clone, Copy)]
pub struct HitContext<'a> {
    pub transform: &'a PaneTransform,
    pub timeframe: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    Drafting {
        draft: DrawingObject,
        origin: PixelPoint,
        dragged: bool,
        awaiting_second_click: bool,
    },
    Moving {
        original: DrawingObject,
        preview: DrawingObject,
        anchor: DomainPoint,
    },
    Resizing {
        original: DrawingObject,
        preview: DrawingObject,
        handle: usize,
    },
}

fn default_click_slop_px() -> f64 {
    3.0
}

/// Owns the live drawing set, the tool state machine and undo/redo history.
///
/// In-progress drafts and drags are kept apart from the live set and only the
/// final state is committed, so one gesture yields at most one history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEngine {
    drawings: Vec<DrawingObject>,
    history: HistoryStacks,
    tool: Tool,
    selected: Option<DrawingId>,
    gesture: Gesture,
    tolerance: HitTolerance,
    click_slop_px: f64,
    revision: u64,
}

impl Default for AnnotationEngine {
    fn default() -> Self {
        Self::new(HitTolerance::default(), default_click_slop_px())
    }
}

impl AnnotationEngine {
    #[must_use]
    pub fn new(tolerance: HitTolerance, click_slop_px: f64) -> Self {
        Self {
            drawings: Vec::new(),
            history: HistoryStacks::new(),
            tool: Tool::Cursor,
            selected: None,
            gesture: Gesture::Idle,
            tolerance,
            click_slop_px,
            revision: 0,
        }
    }

    /// Replaces the live set with persisted drawings, without history.
    ///
    /// Returns the number of drawings rejected by validation.
    pub fn load(&mut self, drawings: Vec<DrawingObject>) -> usize {
        let original_count = drawings.len();
        let mut seen = BTreeSet::new();
        self.drawings = drawings
            .into_iter()
            .filter(|drawing| drawing.validate().is_ok() && seen.insert(drawing.id.clone()))
            .collect();
        let rejected = original_count - self.drawings.len();
        if rejected > 0 {
            warn!(rejected, kept = self.drawings.len(), "dropped invalid drawings on load");
        }
        self.history.clear();
        self.selected = None;
        self.gesture = Gesture::Idle;
        self.revision += 1;
        rejected
    }

    #[must_use]
    pub fn drawings(&self) -> &[DrawingObject] {
        &self.drawings
    }

    /// Owned copy of the live set for renderers and persistence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DrawingObject> {
        self.drawings.clone()
    }

    /// Drawings shown on a pane with the given timeframe label.
    pub fn visible_drawings<'a>(
        &'a self,
        timeframe: &'a str,
    ) -> impl Iterator<Item = &'a DrawingObject> + 'a {
        self.drawings
            .iter()
            .filter(move |drawing| drawing.is_visible_on(timeframe))
    }

    #[must_use]
    pub fn get(&self, id: &DrawingId) -> Option<&DrawingObject> {
        self.drawings.iter().find(|drawing| &drawing.id == id)
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Arms a tool; any in-progress gesture is discarded.
    pub fn set_tool(&mut self, tool: Tool) {
        self.gesture = Gesture::Idle;
        if tool != Tool::Cursor {
            self.selected = None;
        }
        self.tool = tool;
    }

    #[must_use]
    pub fn selected(&self) -> Option<&DrawingObject> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    #[must_use]
    pub fn selected_id(&self) -> Option<&DrawingId> {
        self.selected.as_ref()
    }

    pub fn select(&mut self, id: &DrawingId) -> ReplayResult<()> {
        if self.get(id).is_none() {
            return Err(ReplayError::UnknownDrawing(id.clone()));
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    #[must_use]
    pub fn history(&self) -> &HistoryStacks {
        &self.history
    }

    /// Counter bumped whenever the live set changes (commits, undo, redo, load).
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns `true` while a draft or drag is in progress.
    #[must_use]
    pub fn is_gesture_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    /// Uncommitted drawing to paint on top of the live set.
    ///
    /// During a move or resize the preview replaces the drawing with the same id.
    #[must_use]
    pub fn preview(&self) -> Option<&DrawingObject> {
        match &self.gesture {
            Gesture::Idle => None,
            Gesture::Drafting { draft, .. } => Some(draft),
            Gesture::Moving { preview, .. } | Gesture::Resizing { preview, .. } => Some(preview),
        }
    }

    fn commit(&mut self, next: Vec<DrawingObject>, kind: CommitKind) -> CommitKind {
        let before = std::mem::replace(&mut self.drawings, next);
        self.history.record(before);
        self.revision += 1;
        if let Some(id) = &self.selected {
            if !self.drawings.iter().any(|drawing| &drawing.id == id) {
                self.selected = None;
            }
        }
        debug!(?kind, count = self.drawings.len(), "committed drawing edit");
        kind
    }

    fn index_of(&self, id: &DrawingId) -> ReplayResult<usize> {
        self.drawings
            .iter()
            .position(|drawing| &drawing.id == id)
            .ok_or_else(|| ReplayError::UnknownDrawing(id.clone()))
    }

    fn replace_drawing(
        &mut self,
        updated: DrawingObject,
        kind: CommitKind,
    ) -> ReplayResult<Option<CommitKind>> {
        let index = self.index_of(&updated.id)?;
        if self.drawings[index] == updated {
            return Ok(None);
        }
        updated.validate()?;
        let mut next = self.drawings.clone();
        next[index] = updated;
        Ok(Some(self.commit(next, kind)))
    }

    fn finish_tool(&mut self, modifiers: Modifiers) {
        if !modifiers.keep_tool {
            self.tool = Tool::Cursor;
        }
    }

    fn commit_draft(&mut self, draft: DrawingObject, modifiers: Modifiers) -> Option<CommitKind> {
        if let Err(err) = draft.validate() {
            warn!(error = %err, kind = draft.kind.label(), "discarded invalid draft");
            return None;
        }
        let mut next = self.drawings.clone();
        next.push(draft);
        let kind = self.commit(next, CommitKind::Create);
        self.finish_tool(modifiers);
        Some(kind)
    }

    pub fn pointer_down(
        &mut self,
        sample: PointerSample,
        context: HitContext<'_>,
    ) -> Option<CommitKind> {
        if matches!(
            self.gesture,
            Gesture::Drafting {
                awaiting_second_click: true,
                ..
            }
        ) {
            let Gesture::Drafting { mut draft, .. } =
                std::mem::replace(&mut self.gesture, Gesture::Idle)
            else {
                return None;
            };
            if let Some(last) = draft.points.last_mut() {
                *last = sample.point;
            }
            return self.commit_draft(draft, sample.modifiers);
        }

        match self.tool {
            Tool::Cursor => {
                self.begin_cursor_gesture(sample, context);
                None
            }
            Tool::Eraser => {
                let index = hit_test(
                    &self.drawings,
                    sample.pixel,
                    context.transform,
                    &self.tolerance,
                    context.timeframe,
                )?;
                let mut next = self.drawings.clone();
                let removed = next.remove(index);
                trace!(id = %removed.id, "erased drawing");
                let kind = self.commit(next, CommitKind::Delete);
                self.finish_tool(sample.modifiers);
                Some(kind)
            }
            Tool::Text => {
                let drawing = DrawingObject::new(DrawingKind::Text, [sample.point]).ok()?;
                let id = drawing.id.clone();
                let kind = self.commit_draft(drawing, sample.modifiers)?;
                self.selected = Some(id);
                Some(kind)
            }
            Tool::Line | Tool::Rect | Tool::Fib | Tool::Horizontal => {
                let kind = self.tool.drawing_kind()?;
                let points = vec![sample.point; kind.point_count()];
                let draft = DrawingObject::new(kind, points).ok()?;
                self.gesture = Gesture::Drafting {
                    draft,
                    origin: sample.pixel,
                    dragged: false,
                    awaiting_second_click: false,
                };
                None
            }
        }
    }

    fn begin_cursor_gesture(&mut self, sample: PointerSample, context: HitContext<'_>) {
        if let Some(selected) = self.selected().cloned() {
            if selected.is_visible_on(context.timeframe) {
                if let Some(handle) =
                    handle_at(&selected, sample.pixel, context.transform, &self.tolerance)
                {
                    self.gesture = Gesture::Resizing {
                        preview: selected.clone(),
                        original: selected,
                        handle,
                    };
                    return;
                }
            }
        }

        match hit_test(
            &self.drawings,
            sample.pixel,
            context.transform,
            &self.tolerance,
            context.timeframe,
        ) {
            Some(index) => {
                let drawing = self.drawings[index].clone();
                self.selected = Some(drawing.id.clone());
                self.gesture = Gesture::Moving {
                    preview: drawing.clone(),
                    original: drawing,
                    anchor: sample.point,
                };
            }
            None => {
                self.selected = None;
                self.gesture = Gesture::Idle;
            }
        }
    }

    /// Updates the live preview; never touches the committed set.
    pub fn pointer_move(&mut self, sample: PointerSample) {
        let slop = self.click_slop_px;
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Drafting {
                draft,
                origin,
                dragged,
                ..
            } => {
                if let Some(last) = draft.points.last_mut() {
                    *last = sample.point;
                }
                if origin.distance_to(sample.pixel) > slop {
                    *dragged = true;
                }
            }
            Gesture::Moving {
                original,
                preview,
                anchor,
            } => {
                *preview = original.translated(
                    sample.point.time - anchor.time,
                    sample.point.price - anchor.price,
                );
            }
            Gesture::Resizing {
                original,
                preview,
                handle,
            } => {
                *preview = original.with_point(*handle, sample.point);
            }
        }
    }

    pub fn pointer_up(&mut self, modifiers: Modifiers) -> Option<CommitKind> {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => None,
            Gesture::Drafting {
                draft,
                origin,
                dragged,
                ..
            } => {
                if draft.kind.point_count() == 1 || dragged {
                    return self.commit_draft(draft, modifiers);
                }
                // Click without drag: the next pointer-down places the second point.
                self.gesture = Gesture::Drafting {
                    draft,
                    origin,
                    dragged,
                    awaiting_second_click: true,
                };
                None
            }
            Gesture::Moving {
                original, preview, ..
            } => {
                if preview == original {
                    return None;
                }
                self.replace_drawing(preview, CommitKind::Move).ok().flatten()
            }
            Gesture::Resizing {
                original, preview, ..
            } => {
                if preview == original {
                    return None;
                }
                self.replace_drawing(preview, CommitKind::Resize)
                    .ok()
                    .flatten()
            }
        }
    }

    /// Cancels a gesture, else clears the selection, else reverts to the cursor.
    pub fn escape(&mut self) {
        if self.gesture != Gesture::Idle {
            self.gesture = Gesture::Idle;
        } else if self.selected.is_some() {
            self.selected = None;
        } else {
            self.tool = Tool::Cursor;
        }
    }

    pub fn delete(&mut self, id: &DrawingId) -> ReplayResult<CommitKind> {
        let index = self.index_of(id)?;
        self.gesture = Gesture::Idle;
        let mut next = self.drawings.clone();
        next.remove(index);
        Ok(self.commit(next, CommitKind::Delete))
    }

    pub fn delete_selected(&mut self) -> Option<CommitKind> {
        let id = self.selected.clone()?;
        self.delete(&id).ok()
    }

    /// Removes every drawing as one undoable step; the active tool is kept.
    pub fn clear_all(&mut self) -> Option<CommitKind> {
        self.gesture = Gesture::Idle;
        if self.drawings.is_empty() {
            return None;
        }
        Some(self.commit(Vec::new(), CommitKind::ClearAll))
    }

    pub fn apply_style(
        &mut self,
        id: &DrawingId,
        patch: &StylePatch,
    ) -> ReplayResult<Option<CommitKind>> {
        let index = self.index_of(id)?;
        let mut updated = self.drawings[index].clone();
        updated.style = patch.applied_to(&updated.style);
        self.replace_drawing(updated, CommitKind::Style)
    }

    pub fn set_style(
        &mut self,
        id: &DrawingId,
        style: DrawingStyle,
    ) -> ReplayResult<Option<CommitKind>> {
        let index = self.index_of(id)?;
        let updated = self.drawings[index].clone().with_style(style);
        self.replace_drawing(updated, CommitKind::Style)
    }

    /// Applying a template is a style-only commit.
    pub fn apply_template(
        &mut self,
        id: &DrawingId,
        template: &DrawingTemplate,
    ) -> ReplayResult<Option<CommitKind>> {
        let index = self.index_of(id)?;
        let updated = template.applied_to(&self.drawings[index])?;
        self.replace_drawing(updated, CommitKind::Style)
    }

    pub fn set_fib_levels(
        &mut self,
        id: &DrawingId,
        levels: Vec<FibLevel>,
    ) -> ReplayResult<Option<CommitKind>> {
        let index = self.index_of(id)?;
        let mut updated = self.drawings[index].clone();
        if updated.kind != DrawingKind::Fib {
            return Err(ReplayError::InvalidData(
                "fib levels only apply to fib drawings".to_owned(),
            ));
        }
        updated.fib_levels = Some(levels);
        self.replace_drawing(updated, CommitKind::Style)
    }

    pub fn set_text(
        &mut self,
        id: &DrawingId,
        text: impl Into<String>,
    ) -> ReplayResult<Option<CommitKind>> {
        let index = self.index_of(id)?;
        let mut updated = self.drawings[index].clone();
        updated.text = Some(text.into());
        self.replace_drawing(updated, CommitKind::Text)
    }

    pub fn set_visible_timeframes(
        &mut self,
        id: &DrawingId,
        timeframes: Option<BTreeSet<String>>,
    ) -> ReplayResult<Option<CommitKind>> {
        let index = self.index_of(id)?;
        let mut updated = self.drawings[index].clone();
        updated.visible_timeframes = timeframes;
        self.replace_drawing(updated, CommitKind::Visibility)
    }

    /// Restores the state before the last commit; `false` when there is none.
    pub fn undo(&mut self) -> bool {
        self.gesture = Gesture::Idle;
        let Some(previous) = self.history.undo(&self.drawings) else {
            return false;
        };
        self.restore(previous);
        true
    }

    pub fn redo(&mut self) -> bool {
        self.gesture = Gesture::Idle;
        let Some(next) = self.history.redo(&self.drawings) else {
            return false;
        };
        self.restore(next);
        true
    }

    fn restore(&mut self, drawings: Vec<DrawingObject>) {
        self.drawings = drawings;
        self.revision += 1;
        if let Some(id) = &self.selected {
            if !self.drawings.iter().any(|drawing| &drawing.id == id) {
                self.selected = None;
            }
        }
    }
}
