use std::time::Duration;

use tracing::{debug, warn};

use crate::annotation::DrawingObject;
use crate::error::{ReplayError, ReplayResult};
use crate::persistence::{AnnotationStore, Debouncer};

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved,
    /// The latest snapshot already matches what was last persisted.
    Unchanged,
    Failed(ReplayError),
}

/// Debounced writer of drawing snapshots for one trade.
///
/// Holds owned snapshots only: the latest one reported and the last one the
/// store accepted. Failed saves are logged and recorded, never retried on
/// their own.
#[derive(Debug)]
pub struct PersistenceGateway<S> {
    store: S,
    trade_id: String,
    debouncer: Debouncer,
    latest: Vec<DrawingObject>,
    last_persisted: Vec<DrawingObject>,
    last_error: Option<ReplayError>,
    save_count: usize,
}

impl<S: AnnotationStore> PersistenceGateway<S> {
    #[must_use]
    pub fn new(store: S, trade_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            store,
            trade_id: trade_id.into(),
            debouncer: Debouncer::new(delay),
            latest: Vec::new(),
            last_persisted: Vec::new(),
            last_error: None,
            save_count: 0,
        }
    }

    #[must_use]
    pub fn trade_id(&self) -> &str {
        &self.trade_id
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Loads the persisted set and treats it as the clean baseline.
    pub fn load(&mut self) -> ReplayResult<Vec<DrawingObject>> {
        let drawings = self.store.load(&self.trade_id)?;
        self.latest.clone_from(&drawings);
        self.last_persisted.clone_from(&drawings);
        debug!(trade_id = %self.trade_id, count = drawings.len(), "loaded drawings");
        Ok(drawings)
    }

    /// Records a new snapshot and restarts the debounce period.
    pub fn notify_change(&mut self, snapshot: Vec<DrawingObject>) {
        self.latest = snapshot;
        self.debouncer.trigger();
    }

    #[must_use]
    pub fn is_save_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Returns `true` when the latest snapshot has not been persisted.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.latest != self.last_persisted
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&ReplayError> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub fn last_persisted(&self) -> &[DrawingObject] {
        &self.last_persisted
    }

    /// Number of successful store writes.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.save_count
    }

    /// Drives the debounce timer; saves when it expires.
    pub fn advance(&mut self, elapsed: Duration) -> Option<SaveOutcome> {
        if self.debouncer.advance(elapsed) {
            return Some(self.save_now());
        }
        None
    }

    /// Writes the latest snapshot immediately if it differs from the last
    /// persisted one.
    pub fn save_now(&mut self) -> SaveOutcome {
        if !self.is_dirty() {
            return SaveOutcome::Unchanged;
        }
        match self.store.save(&self.trade_id, &self.latest) {
            Ok(()) => {
                self.last_persisted.clone_from(&self.latest);
                self.last_error = None;
                self.save_count += 1;
                debug!(trade_id = %self.trade_id, count = self.latest.len(), "saved drawings");
                SaveOutcome::Saved
            }
            Err(err) => {
                warn!(trade_id = %self.trade_id, error = %err, "failed to save drawings");
                self.last_error = Some(err.clone());
                SaveOutcome::Failed(err)
            }
        }
    }

    /// Cancels the debounce and flushes unsaved changes synchronously.
    pub fn flush_on_teardown(&mut self) -> SaveOutcome {
        self.debouncer.cancel();
        self.save_now()
    }
}
