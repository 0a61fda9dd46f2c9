use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotation::{DrawingKind, DrawingObject, DrawingStyle, FibLevel};
use crate::error::{ReplayError, ReplayResult};

/// Named, reusable style preset for one drawing kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingTemplate {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DrawingKind,
    pub style: DrawingStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fib_levels: Option<Vec<FibLevel>>,
}

impl DrawingTemplate {
    pub fn new(
        name: impl Into<String>,
        kind: DrawingKind,
        style: DrawingStyle,
    ) -> ReplayResult<Self> {
        let template = Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
            style,
            fib_levels: None,
        };
        template.validate()?;
        Ok(template)
    }

    /// Captures the style (and fib levels) of an existing drawing.
    pub fn from_drawing(name: impl Into<String>, drawing: &DrawingObject) -> ReplayResult<Self> {
        let mut template = Self::new(name, drawing.kind, drawing.style.clone())?;
        template.fib_levels.clone_from(&drawing.fib_levels);
        Ok(template)
    }

    pub fn validate(&self) -> ReplayResult<()> {
        if self.name.trim().is_empty() {
            return Err(ReplayError::InvalidData(
                "template name must not be empty".to_owned(),
            ));
        }
        self.style.validate()
    }

    /// Restyled copy of `drawing`; geometry and text are left untouched.
    pub fn applied_to(&self, drawing: &DrawingObject) -> ReplayResult<DrawingObject> {
        if drawing.kind != self.kind {
            return Err(ReplayError::InvalidData(format!(
                "{} template cannot style a {} drawing",
                self.kind.label(),
                drawing.kind.label()
            )));
        }
        let mut styled = drawing.clone();
        styled.style = self.style.clone();
        if self.fib_levels.is_some() {
            styled.fib_levels.clone_from(&self.fib_levels);
        }
        Ok(styled)
    }
}
