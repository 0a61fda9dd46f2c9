use crate::annotation::DrawingObject;

/// Undo/redo stacks of full drawing-set snapshots.
///
/// `past` holds the state before each committed edit; `future` holds states
/// undone since the last commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStacks {
    past: Vec<Vec<DrawingObject>>,
    future: Vec<Vec<DrawingObject>>,
}

impl HistoryStacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the pre-edit state of one commit and invalidates redo.
    pub fn record(&mut self, before: Vec<DrawingObject>) {
        self.past.push(before);
        self.future.clear();
    }

    /// Returns the state to restore, parking `current` on the redo stack.
    pub fn undo(&mut self, current: &[DrawingObject]) -> Option<Vec<DrawingObject>> {
        let previous = self.past.pop()?;
        self.future.push(current.to_vec());
        Some(previous)
    }

    /// Returns the state to restore, parking `current` on the undo stack.
    pub fn redo(&mut self, current: &[DrawingObject]) -> Option<Vec<DrawingObject>> {
        let next = self.future.pop()?;
        self.past.push(current.to_vec());
        Some(next)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    #[must_use]
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    #[must_use]
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}
