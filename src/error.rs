use thiserror::Error;

use crate::annotation::DrawingId;

pub type ReplayResult<T> = Result<T, ReplayError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("candle fetch failed: {reason}")]
    Fetch { reason: String },

    #[error("persistence failed: {reason}")]
    Persistence { reason: String },

    #[error("unknown drawing: {0}")]
    UnknownDrawing(DrawingId),

    #[error("unknown template: {0}")]
    UnknownTemplate(String),
}

impl ReplayError {
    pub(crate) fn fetch(reason: impl Into<String>) -> Self {
        Self::Fetch {
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(reason: impl Into<String>) -> Self {
        Self::Persistence {
            reason: reason.into(),
        }
    }
}
