//! In-memory collaborators for tests and hosts without a backend.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::annotation::{DrawingKind, DrawingObject, DrawingTemplate};
use crate::core::{Candle, CandleSeries, UnixSeconds};
use crate::error::{ReplayError, ReplayResult};
use crate::persistence::json_contract::{
    drawings_from_json_compat_str, drawings_to_json_contract_v1_pretty,
};
use crate::persistence::{AnnotationStore, CandleSource, TemplateStore};

/// Keeps each trade's drawings as a versioned JSON document.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAnnotationStore {
    documents: HashMap<String, String>,
    fail_saves: bool,
    save_calls: usize,
}

impl InMemoryAnnotationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent save fail.
    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    /// Number of save attempts, failed ones included.
    #[must_use]
    pub fn save_calls(&self) -> usize {
        self.save_calls
    }

    #[must_use]
    pub fn document(&self, trade_id: &str) -> Option<&str> {
        self.documents.get(trade_id).map(String::as_str)
    }

    pub fn insert_document(&mut self, trade_id: impl Into<String>, json: impl Into<String>) {
        self.documents.insert(trade_id.into(), json.into());
    }
}

impl AnnotationStore for InMemoryAnnotationStore {
    fn save(&mut self, trade_id: &str, drawings: &[DrawingObject]) -> ReplayResult<()> {
        self.save_calls += 1;
        if self.fail_saves {
            return Err(ReplayError::persistence(format!(
                "store rejected drawings for trade {trade_id}"
            )));
        }
        let json = drawings_to_json_contract_v1_pretty(drawings)?;
        self.documents.insert(trade_id.to_owned(), json);
        Ok(())
    }

    fn load(&mut self, trade_id: &str) -> ReplayResult<Vec<DrawingObject>> {
        match self.documents.get(trade_id) {
            Some(json) => drawings_from_json_compat_str(json),
            None => Ok(Vec::new()),
        }
    }
}

/// Insertion-ordered template store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateStore {
    templates: IndexMap<String, DrawingTemplate>,
    fail_writes: bool,
}

impl InMemoryTemplateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DrawingTemplate> {
        self.templates.get(id)
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn list_templates(&self, kind: DrawingKind) -> ReplayResult<Vec<DrawingTemplate>> {
        Ok(self
            .templates
            .values()
            .filter(|template| template.kind == kind)
            .cloned()
            .collect())
    }

    fn save_template(&mut self, template: DrawingTemplate) -> ReplayResult<()> {
        if self.fail_writes {
            return Err(ReplayError::persistence("template store is read-only"));
        }
        template.validate()?;
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    fn delete_template(&mut self, id: &str) -> ReplayResult<()> {
        if self.fail_writes {
            return Err(ReplayError::persistence("template store is read-only"));
        }
        self.templates
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| ReplayError::UnknownTemplate(id.to_owned()))
    }
}

/// Serves candles from a fixed series.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCandleSource {
    series: CandleSeries,
    fail_reason: Option<String>,
    requests: Vec<(UnixSeconds, UnixSeconds)>,
}

impl InMemoryCandleSource {
    #[must_use]
    pub fn new(series: CandleSeries) -> Self {
        Self {
            series,
            fail_reason: None,
            requests: Vec::new(),
        }
    }

    /// Fails subsequent fetches with `reason`; `None` restores normal service.
    pub fn set_failure(&mut self, reason: Option<String>) {
        self.fail_reason = reason;
    }

    /// Windows requested so far, in call order.
    #[must_use]
    pub fn requests(&self) -> &[(UnixSeconds, UnixSeconds)] {
        &self.requests
    }
}

impl CandleSource for InMemoryCandleSource {
    fn fetch(
        &mut self,
        _instrument: &str,
        from: UnixSeconds,
        to: UnixSeconds,
    ) -> ReplayResult<Vec<Candle>> {
        self.requests.push((from, to));
        if let Some(reason) = &self.fail_reason {
            return Err(ReplayError::fetch(reason.clone()));
        }
        Ok(self.series.range(from, to).to_vec())
    }
}
