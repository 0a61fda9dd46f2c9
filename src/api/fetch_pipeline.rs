use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::UnixSeconds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchKind {
    Initial,
    Backfill,
}

/// One candle request handed to the host; answer it through
/// `ReplaySession::complete_fetch` with the same ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub ticket: u64,
    pub kind: FetchKind,
    pub instrument: String,
    pub from: UnixSeconds,
    pub to: UnixSeconds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    /// Initial load failed; nothing to show.
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingFetch {
    pub(crate) kind: FetchKind,
    pub(crate) from: UnixSeconds,
}

/// Ticket bookkeeping for the initial fetch and back-fill requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchPipeline {
    next_ticket: u64,
    pending: BTreeMap<u64, PendingFetch>,
    state: LoadState,
    /// Oldest time already requested by a back-fill.
    backfill_cursor: Option<UnixSeconds>,
    live: bool,
}

impl Default for FetchPipeline {
    fn default() -> Self {
        Self {
            next_ticket: 1,
            pending: BTreeMap::new(),
            state: LoadState::Idle,
            backfill_cursor: None,
            live: true,
        }
    }
}

impl FetchPipeline {
    pub(crate) fn state(&self) -> &LoadState {
        &self.state
    }

    fn is_backfill_in_flight(&self) -> bool {
        self.pending
            .values()
            .any(|pending| pending.kind == FetchKind::Backfill)
    }

    fn issue(
        &mut self,
        kind: FetchKind,
        instrument: &str,
        from: UnixSeconds,
        to: UnixSeconds,
    ) -> FetchRequest {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending.insert(ticket, PendingFetch { kind, from });
        trace!(ticket, ?kind, from, to, "issued candle fetch");
        FetchRequest {
            ticket,
            kind,
            instrument: instrument.to_owned(),
            from,
            to,
        }
    }

    pub(crate) fn begin_initial(
        &mut self,
        instrument: &str,
        from: UnixSeconds,
        to: UnixSeconds,
    ) -> FetchRequest {
        self.state = LoadState::Loading;
        self.backfill_cursor = None;
        self.issue(FetchKind::Initial, instrument, from, to)
    }

    /// Issues a back-fill when the visible start is within `trigger_seconds`
    /// of the first loaded candle. One back-fill is in flight at a time.
    ///
    /// Each request covers the chunk just before the oldest time requested so
    /// far, so empty chunks (market closures) are stepped over on the next
    /// trigger instead of being requested again.
    pub(crate) fn maybe_backfill(
        &mut self,
        instrument: &str,
        first_loaded: UnixSeconds,
        visible_from: UnixSeconds,
        trigger_seconds: i64,
        chunk_seconds: i64,
    ) -> Option<FetchRequest> {
        if !self.live || self.state != LoadState::Ready || self.is_backfill_in_flight() {
            return None;
        }
        if visible_from.saturating_sub(first_loaded) > trigger_seconds {
            return None;
        }
        let anchor = self
            .backfill_cursor
            .map_or(first_loaded, |cursor| cursor.min(first_loaded));
        Some(self.issue(
            FetchKind::Backfill,
            instrument,
            anchor.saturating_sub(chunk_seconds),
            anchor.saturating_sub(1),
        ))
    }

    /// Claims a response; `None` for unknown tickets or after shutdown.
    pub(crate) fn accept(&mut self, ticket: u64) -> Option<PendingFetch> {
        if !self.live {
            debug!(ticket, "ignored candle response after teardown");
            return None;
        }
        self.pending.remove(&ticket)
    }

    /// Records a completed back-fill window, empty or not.
    pub(crate) fn backfill_covered(&mut self, from: UnixSeconds) {
        let cursor = self.backfill_cursor.map_or(from, |cursor| cursor.min(from));
        self.backfill_cursor = Some(cursor);
    }

    pub(crate) fn mark_ready(&mut self) {
        self.state = LoadState::Ready;
    }

    pub(crate) fn mark_failed(&mut self, reason: String) {
        self.state = LoadState::Failed { reason };
    }

    pub(crate) fn shutdown(&mut self) {
        self.live = false;
        self.pending.clear();
    }
}
