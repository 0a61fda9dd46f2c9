use serde::{Deserialize, Serialize};

use crate::annotation::Tool;

/// Where a pointer event sits in a press/drag/release sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

/// Modifier state captured with an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    /// Keeps the drawing tool armed after a commit.
    pub keep_tool: bool,
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn keep_tool() -> Self {
        Self {
            keep_tool: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ctrl_shift() -> Self {
        Self {
            ctrl: true,
            shift: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Char(char),
    Space,
    ArrowLeft,
    ArrowRight,
    Delete,
    Backspace,
    Escape,
}

/// Session-level action bound to a keyboard shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyCommand {
    Undo,
    Redo,
    DeleteSelection,
    Escape,
    TogglePlayback,
    StepForward,
    StepBackward,
    SelectTool(Tool),
}

/// Maps a key press onto a command; unbound keys yield `None`.
#[must_use]
pub fn resolve_key_command(key: Key, modifiers: Modifiers) -> Option<KeyCommand> {
    match key {
        Key::Char(c) if modifiers.ctrl => match c.to_ascii_lowercase() {
            'z' if modifiers.shift => Some(KeyCommand::Redo),
            'z' => Some(KeyCommand::Undo),
            'y' => Some(KeyCommand::Redo),
            _ => None,
        },
        Key::Char(c) => match (c.to_ascii_lowercase(), modifiers.shift || c.is_ascii_uppercase()) {
            ('t', true) => Some(KeyCommand::SelectTool(Tool::Text)),
            ('t', false) => Some(KeyCommand::SelectTool(Tool::Line)),
            ('r', _) => Some(KeyCommand::SelectTool(Tool::Rect)),
            _ => None,
        },
        Key::Space => Some(KeyCommand::TogglePlayback),
        Key::ArrowRight => Some(KeyCommand::StepForward),
        Key::ArrowLeft => Some(KeyCommand::StepBackward),
        Key::Delete | Key::Backspace => Some(KeyCommand::DeleteSelection),
        Key::Escape => Some(KeyCommand::Escape),
    }
}
