//! Collaborator contracts and the debounced annotation save path.

mod debounce;
mod gateway;
pub mod json_contract;
pub mod memory;

pub use debounce::Debouncer;
pub use gateway::{PersistenceGateway, SaveOutcome};
pub use json_contract::{DRAWINGS_JSON_SCHEMA_V1, DrawingsJsonContractV1};
pub use memory::{InMemoryAnnotationStore, InMemoryCandleSource, InMemoryTemplateStore};

use crate::annotation::{DrawingKind, DrawingObject, DrawingTemplate};
use crate::core::{Candle, UnixSeconds};
use crate::error::ReplayResult;

/// Durable home of a trade's drawings.
pub trait AnnotationStore {
    fn save(&mut self, trade_id: &str, drawings: &[DrawingObject]) -> ReplayResult<()>;

    fn load(&mut self, trade_id: &str) -> ReplayResult<Vec<DrawingObject>>;
}

/// Saved style presets.
pub trait TemplateStore {
    fn list_templates(&self, kind: DrawingKind) -> ReplayResult<Vec<DrawingTemplate>>;

    fn save_template(&mut self, template: DrawingTemplate) -> ReplayResult<()>;

    fn delete_template(&mut self, id: &str) -> ReplayResult<()>;
}

/// Historical candle provider for `[from, to]`.
pub trait CandleSource {
    fn fetch(&mut self, instrument: &str, from: UnixSeconds, to: UnixSeconds)
    -> ReplayResult<Vec<Candle>>;
}
