use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::annotation::{
    AnnotationEngine, CommitKind, DrawingId, DrawingObject, DrawingTemplate, HitContext,
    PointerSample, StylePatch, Tool,
};
use crate::api::fetch_pipeline::{FetchPipeline, PendingFetch};
use crate::api::{FetchKind, FetchRequest, LoadState, SessionConfig};
use crate::core::{
    Candle, CandleSeries, CandleStore, ChartGeometry, PixelPoint, Timeframe, UnixSeconds,
    Viewport, aggregate_to,
};
use crate::error::{ReplayError, ReplayResult};
use crate::extensions::{TradeContext, TradeProgress};
use crate::interaction::{CoordinateMapper, Key, KeyCommand, Modifiers, resolve_key_command};
use crate::panes::{DualPaneSynchronizer, Layout, PaneId, PaneSet, ViewportChangeOrigin};
use crate::persistence::{AnnotationStore, CandleSource, PersistenceGateway, SaveOutcome};
use crate::render::{FrameStyle, PaneFrameBuilder, RenderFrame};
use crate::replay::{ReplayController, ReplayPhase};

/// Store revision, replay position and timeframe the secondary aggregate was built from.
type SecondaryKey = (u64, Option<usize>, Timeframe);

#[derive(Debug, Clone, PartialEq)]
struct SecondaryCache {
    key: SecondaryKey,
    series: CandleSeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecycle {
    Created,
    Running,
    TornDown,
}

/// Hosts one trade replay view: candles, replay, panes, annotations and the
/// save path, with explicit `init`/`teardown`.
///
/// All inputs (pointer, keys, elapsed time, fetch responses) arrive through
/// `&mut self` calls from a single host thread.
#[derive(Debug)]
pub struct ReplaySession<A: AnnotationStore> {
    config: SessionConfig,
    lifecycle: SessionLifecycle,
    candles: CandleStore,
    replay: ReplayController,
    annotations: AnnotationEngine,
    mapper: CoordinateMapper,
    panes: PaneSet,
    gateway: PersistenceGateway<A>,
    fetch: FetchPipeline,
    last_fetch_error: Option<ReplayError>,
    gesture_pane: Option<PaneId>,
    cut_tool_active: bool,
    secondary_cache: Option<SecondaryCache>,
    trade: Option<TradeContext>,
    price_offset: Option<f64>,
    frame_style: FrameStyle,
}

impl<A: AnnotationStore> ReplaySession<A> {
    pub fn new(config: SessionConfig, annotation_store: A) -> ReplayResult<Self> {
        config.validate()?;
        if config.secondary_timeframe.seconds() < config.primary_timeframe.seconds() {
            return Err(ReplayError::InvalidData(
                "secondary timeframe must not be finer than the primary timeframe".to_owned(),
            ));
        }
        let replay = ReplayController::default().with_speed(config.replay_speed())?;
        let synchronizer = DualPaneSynchronizer::new(config.secondary_window_seconds)?;
        let mut panes = PaneSet::new(
            config.primary_timeframe,
            config.secondary_timeframe,
            synchronizer,
        );
        panes.set_layout(config.layout);

        Ok(Self {
            candles: CandleStore::new(config.instrument.clone(), config.primary_timeframe),
            replay,
            annotations: AnnotationEngine::new(config.hit_tolerance, config.click_slop_px),
            mapper: CoordinateMapper::new(config.magnet),
            panes,
            gateway: PersistenceGateway::new(
                annotation_store,
                config.trade_id.clone(),
                config.save_debounce(),
            ),
            fetch: FetchPipeline::default(),
            last_fetch_error: None,
            gesture_pane: None,
            cut_tool_active: false,
            secondary_cache: None,
            trade: None,
            price_offset: None,
            frame_style: FrameStyle::default(),
            lifecycle: SessionLifecycle::Created,
            config,
        })
    }

    pub fn with_trade(mut self, trade: TradeContext) -> ReplayResult<Self> {
        trade.validate()?;
        self.trade = Some(trade);
        Ok(self)
    }

    #[must_use]
    pub fn with_frame_style(mut self, frame_style: FrameStyle) -> Self {
        self.frame_style = frame_style;
        self
    }

    /// Loads persisted drawings and requests the initial candle window.
    pub fn init(&mut self, from: UnixSeconds, to: UnixSeconds) -> ReplayResult<FetchRequest> {
        if self.lifecycle != SessionLifecycle::Created {
            return Err(ReplayError::InvalidData(
                "session can only be initialized once".to_owned(),
            ));
        }
        if from > to {
            return Err(ReplayError::InvalidData(
                "initial fetch window must satisfy from <= to".to_owned(),
            ));
        }
        let drawings = self.gateway.load()?;
        self.annotations.load(drawings);
        self.lifecycle = SessionLifecycle::Running;
        info!(
            trade_id = %self.config.trade_id,
            instrument = %self.config.instrument,
            from,
            to,
            "replay session started"
        );
        Ok(self
            .fetch
            .begin_initial(&self.config.instrument, from, to))
    }

    /// Re-requests the initial window after a failed load.
    pub fn retry_initial(&mut self, from: UnixSeconds, to: UnixSeconds) -> Option<FetchRequest> {
        if !self.is_live() || !matches!(self.fetch.state(), LoadState::Failed { .. }) {
            return None;
        }
        Some(
            self.fetch
                .begin_initial(&self.config.instrument, from, to),
        )
    }

    /// Stops timers, drops late fetch results and flushes unsaved drawings.
    pub fn teardown(&mut self) -> SaveOutcome {
        if self.lifecycle == SessionLifecycle::TornDown {
            return SaveOutcome::Unchanged;
        }
        self.lifecycle = SessionLifecycle::TornDown;
        self.replay.pause();
        self.fetch.shutdown();
        let outcome = self.gateway.flush_on_teardown();
        info!(trade_id = %self.config.trade_id, ?outcome, "replay session torn down");
        outcome
    }

    #[must_use]
    pub fn lifecycle(&self) -> SessionLifecycle {
        self.lifecycle
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.lifecycle == SessionLifecycle::Running
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn candle_store(&self) -> &CandleStore {
        &self.candles
    }

    #[must_use]
    pub fn replay(&self) -> &ReplayController {
        &self.replay
    }

    #[must_use]
    pub fn annotations(&self) -> &AnnotationEngine {
        &self.annotations
    }

    #[must_use]
    pub fn panes(&self) -> &PaneSet {
        &self.panes
    }

    #[must_use]
    pub fn gateway(&self) -> &PersistenceGateway<A> {
        &self.gateway
    }

    #[must_use]
    pub fn trade(&self) -> Option<&TradeContext> {
        self.trade.as_ref()
    }

    /// Price shift applied to fetched candles to line them up with the trade.
    #[must_use]
    pub fn price_offset(&self) -> Option<f64> {
        self.price_offset
    }

    #[must_use]
    pub fn load_state(&self) -> &LoadState {
        self.fetch.state()
    }

    /// Most recent fetch failure, initial or back-fill.
    #[must_use]
    pub fn last_fetch_error(&self) -> Option<&ReplayError> {
        self.last_fetch_error.as_ref()
    }

    /// Applies a fetch response. Returns `false` when the response was
    /// dropped (unknown ticket or session torn down).
    pub fn complete_fetch(&mut self, ticket: u64, result: ReplayResult<Vec<Candle>>) -> bool {
        let Some(PendingFetch { kind, from }) = self.fetch.accept(ticket) else {
            return false;
        };
        match (kind, result) {
            (FetchKind::Initial, Ok(candles)) if candles.is_empty() => {
                let err = ReplayError::fetch("no candles in requested window");
                warn!(ticket, "initial candle fetch returned nothing");
                if self.candles.is_empty() {
                    self.fetch.mark_failed(err.to_string());
                }
                self.last_fetch_error = Some(err);
            }
            (FetchKind::Initial, Ok(candles)) => {
                self.price_offset = self
                    .trade
                    .as_ref()
                    .filter(|_| self.config.align_prices_to_trade)
                    .and_then(|trade| trade.price_offset(&candles));
                let candles = self.aligned(candles);
                self.candles.load(candles);
                self.replay.set_data(self.candles.series().clone());
                self.fetch.mark_ready();
                self.last_fetch_error = None;
            }
            (FetchKind::Backfill, Ok(candles)) => {
                self.fetch.backfill_covered(from);
                let candles = self.aligned(candles);
                let stats = self.candles.backfill(candles);
                if stats.inserted > 0 {
                    self.replay.set_data(self.candles.series().clone());
                }
                debug!(
                    ticket,
                    from,
                    inserted = stats.inserted,
                    duplicates = stats.duplicates,
                    count = self.candles.series().len(),
                    "applied back-fill"
                );
            }
            (kind, Err(err)) => {
                warn!(ticket, ?kind, error = %err, "candle fetch failed");
                if kind == FetchKind::Initial && self.candles.is_empty() {
                    self.fetch.mark_failed(err.to_string());
                }
                self.last_fetch_error = Some(err);
            }
        }
        true
    }

    fn aligned(&self, candles: Vec<Candle>) -> Vec<Candle> {
        match self.price_offset {
            Some(offset) => candles
                .into_iter()
                .map(|candle| candle.shifted(offset))
                .collect(),
            None => candles,
        }
    }

    /// Resolves `request` synchronously through a blocking candle source.
    pub fn fetch_with<C: CandleSource>(
        &mut self,
        source: &mut C,
        request: &FetchRequest,
    ) -> bool {
        let result = source.fetch(&request.instrument, request.from, request.to);
        self.complete_fetch(request.ticket, result)
    }

    /// Feeds elapsed host time to the replay timer and the save debounce.
    /// Returns the number of replay ticks that fired.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        if !self.is_live() {
            return 0;
        }
        let ticks = self.replay.advance(elapsed);
        self.gateway.advance(elapsed);
        ticks
    }

    fn pane_timeframe(&self, pane: PaneId) -> Timeframe {
        self.panes.pane(pane).timeframe
    }

    pub fn set_pane_geometry(&mut self, pane: PaneId, geometry: ChartGeometry) {
        self.panes.set_geometry(pane, geometry);
    }

    pub fn set_layout(&mut self, layout: Layout) -> Option<Viewport> {
        self.panes.set_layout(layout)
    }

    pub fn set_secondary_timeframe(
        &mut self,
        timeframe: Timeframe,
    ) -> ReplayResult<Option<Viewport>> {
        if timeframe.seconds() < self.config.primary_timeframe.seconds() {
            return Err(ReplayError::InvalidData(format!(
                "secondary timeframe {timeframe} is finer than primary {}",
                self.config.primary_timeframe
            )));
        }
        Ok(self.panes.set_secondary_timeframe(timeframe))
    }

    /// Records a pane's new visible range and may ask for older candles.
    ///
    /// Echoes of synchronizer-driven updates are swallowed.
    pub fn on_viewport_changed(
        &mut self,
        pane: PaneId,
        viewport: Viewport,
    ) -> Option<FetchRequest> {
        if !self.is_live() {
            return None;
        }
        if self.panes.on_viewport_changed(pane, viewport) == ViewportChangeOrigin::Synchronizer {
            return None;
        }
        let first_loaded = self.candles.first_time()?;
        let timeframe = self.pane_timeframe(pane);
        let trigger_seconds = i64::from(self.config.backfill_trigger_bars) * timeframe.seconds();
        self.fetch.maybe_backfill(
            &self.config.instrument,
            first_loaded,
            viewport.from,
            trigger_seconds,
            self.config.primary_timeframe.backfill_chunk_seconds(),
        )
    }

    /// Primary candles filtered by the replay position.
    #[must_use]
    pub fn primary_candles(&self) -> &[Candle] {
        self.replay.visible_candles()
    }

    fn secondary_key(&self) -> SecondaryKey {
        (
            self.candles.revision(),
            self.replay.playback_index(),
            self.pane_timeframe(PaneId::Secondary),
        )
    }

    /// Secondary series aggregated from the replay-filtered primary candles,
    /// so its last bar is the in-progress one.
    pub fn secondary_series(&self) -> ReplayResult<CandleSeries> {
        let key = self.secondary_key();
        if let Some(cache) = self.secondary_cache.as_ref().filter(|cache| cache.key == key) {
            return Ok(cache.series.clone());
        }
        aggregate_to(self.replay.visible_candles(), key.2)
    }

    /// Secondary aggregate, rebuilt only when the data, the replay position
    /// or the secondary timeframe changed.
    fn cached_secondary(&mut self) -> ReplayResult<&CandleSeries> {
        let key = self.secondary_key();
        let cache = match self.secondary_cache.take() {
            Some(cache) if cache.key == key => cache,
            _ => SecondaryCache {
                key,
                series: aggregate_to(self.replay.visible_candles(), key.2)?,
            },
        };
        Ok(&self.secondary_cache.insert(cache).series)
    }

    fn sample(
        &mut self,
        pane: PaneId,
        x: f64,
        y: f64,
        modifiers: Modifiers,
    ) -> Option<PointerSample> {
        let transform = self.panes.pane(pane).transform()?;
        let pixel = PixelPoint::new(x, y);
        let raw = transform.pixel_to_domain(pixel)?;
        let mapper = self.mapper;
        if !mapper.magnet().enabled {
            return Some(PointerSample::new(pixel, raw, modifiers));
        }
        let interval = self.pane_timeframe(pane).seconds();
        let point = match pane {
            PaneId::Primary => mapper.snap(raw, self.replay.visible_candles(), interval),
            PaneId::Secondary => {
                let series = self.cached_secondary().ok()?;
                mapper.snap(raw, series.as_slice(), interval)
            }
        };
        Some(PointerSample::new(pixel, point, modifiers))
    }

    /// Arms the cut tool: the next pointer press on either pane cuts replay at
    /// the pressed time and hands control back to the cursor.
    pub fn set_cut_tool(&mut self, active: bool) {
        self.cut_tool_active = active && self.is_live();
        if self.cut_tool_active {
            self.annotations.set_tool(Tool::Cursor);
            self.gesture_pane = None;
        }
    }

    #[must_use]
    pub fn is_cut_tool_active(&self) -> bool {
        self.cut_tool_active
    }

    fn cut_at_pointer(&mut self, pane: PaneId, x: f64, y: f64) -> Option<UnixSeconds> {
        let transform = self.panes.pane(pane).transform()?;
        let time = transform.pixel_to_domain(PixelPoint::new(x, y))?.time;
        let cut = self.replay.cut(time)?;
        self.set_tool(Tool::Cursor);
        info!(requested = time, cut, "replay cut from pointer");
        Some(cut)
    }

    /// Pointer press; positions outside the decodable range are ignored.
    pub fn pointer_down(
        &mut self,
        pane: PaneId,
        x: f64,
        y: f64,
        modifiers: Modifiers,
    ) -> Option<CommitKind> {
        if !self.is_live() {
            return None;
        }
        if self.cut_tool_active {
            self.cut_at_pointer(pane, x, y);
            return None;
        }
        let sample = self.sample(pane, x, y, modifiers)?;
        let transform = self.panes.pane(pane).transform()?;
        let timeframe = self.pane_timeframe(pane);
        let commit = self.annotations.pointer_down(
            sample,
            HitContext {
                transform: &transform,
                timeframe: timeframe.label(),
            },
        );
        self.gesture_pane = self
            .annotations
            .is_gesture_active()
            .then_some(pane);
        self.after_edit(commit.is_some());
        commit
    }

    pub fn pointer_move(&mut self, pane: PaneId, x: f64, y: f64, modifiers: Modifiers) {
        if !self.is_live() || self.gesture_pane != Some(pane) {
            return;
        }
        if let Some(sample) = self.sample(pane, x, y, modifiers) {
            self.annotations.pointer_move(sample);
        }
    }

    /// Pointer release; a release outside the pane commits the last preview.
    pub fn pointer_up(
        &mut self,
        pane: PaneId,
        x: f64,
        y: f64,
        modifiers: Modifiers,
    ) -> Option<CommitKind> {
        if !self.is_live() || self.gesture_pane != Some(pane) {
            return None;
        }
        if let Some(sample) = self.sample(pane, x, y, modifiers) {
            self.annotations.pointer_move(sample);
        }
        let commit = self.annotations.pointer_up(modifiers);
        if !self.annotations.is_gesture_active() {
            self.gesture_pane = None;
        }
        self.after_edit(commit.is_some());
        commit
    }

    /// Runs the command bound to `key`; returns it when something handled it.
    pub fn key(&mut self, key: Key, modifiers: Modifiers) -> Option<KeyCommand> {
        if !self.is_live() {
            return None;
        }
        let command = resolve_key_command(key, modifiers)?;
        let handled = match command {
            KeyCommand::Undo => self.undo(),
            KeyCommand::Redo => self.redo(),
            KeyCommand::DeleteSelection => self.delete_selected().is_some(),
            KeyCommand::Escape => {
                self.cut_tool_active = false;
                self.annotations.escape();
                self.gesture_pane = None;
                true
            }
            KeyCommand::TogglePlayback => {
                self.replay.is_active() && {
                    self.replay.toggle_playback();
                    true
                }
            }
            KeyCommand::StepForward => {
                self.replay.is_active() && self.replay.step_forward().is_some()
            }
            KeyCommand::StepBackward => {
                self.replay.is_active() && self.replay.step_backward().is_some()
            }
            KeyCommand::SelectTool(tool) => {
                self.set_tool(tool);
                true
            }
        };
        handled.then_some(command)
    }

    fn after_edit(&mut self, changed: bool) {
        if changed {
            self.gateway.notify_change(self.annotations.snapshot());
        }
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.annotations.set_tool(tool);
        self.cut_tool_active = false;
        self.gesture_pane = None;
    }

    pub fn set_magnet_enabled(&mut self, enabled: bool) {
        self.mapper.set_magnet_enabled(enabled);
    }

    pub fn undo(&mut self) -> bool {
        if !self.is_live() {
            return false;
        }
        let changed = self.annotations.undo();
        self.gesture_pane = None;
        self.after_edit(changed);
        changed
    }

    pub fn redo(&mut self) -> bool {
        if !self.is_live() {
            return false;
        }
        let changed = self.annotations.redo();
        self.gesture_pane = None;
        self.after_edit(changed);
        changed
    }

    pub fn delete_selected(&mut self) -> Option<CommitKind> {
        if !self.is_live() {
            return None;
        }
        let commit = self.annotations.delete_selected();
        self.after_edit(commit.is_some());
        commit
    }

    pub fn clear_all(&mut self) -> Option<CommitKind> {
        if !self.is_live() {
            return None;
        }
        let commit = self.annotations.clear_all();
        self.gesture_pane = None;
        self.after_edit(commit.is_some());
        commit
    }

    /// Edits after teardown are ignored and report `Ok(None)`.
    pub fn apply_style(
        &mut self,
        id: &DrawingId,
        patch: &StylePatch,
    ) -> ReplayResult<Option<CommitKind>> {
        if !self.is_live() {
            return Ok(None);
        }
        let commit = self.annotations.apply_style(id, patch)?;
        self.after_edit(commit.is_some());
        Ok(commit)
    }

    pub fn apply_template(
        &mut self,
        id: &DrawingId,
        template: &DrawingTemplate,
    ) -> ReplayResult<Option<CommitKind>> {
        if !self.is_live() {
            return Ok(None);
        }
        let commit = self.annotations.apply_template(id, template)?;
        self.after_edit(commit.is_some());
        Ok(commit)
    }

    pub fn set_text(
        &mut self,
        id: &DrawingId,
        text: impl Into<String>,
    ) -> ReplayResult<Option<CommitKind>> {
        if !self.is_live() {
            return Ok(None);
        }
        let commit = self.annotations.set_text(id, text)?;
        self.after_edit(commit.is_some());
        Ok(commit)
    }

    pub fn set_visible_timeframes(
        &mut self,
        id: &DrawingId,
        timeframes: Option<BTreeSet<String>>,
    ) -> ReplayResult<Option<CommitKind>> {
        if !self.is_live() {
            return Ok(None);
        }
        let commit = self.annotations.set_visible_timeframes(id, timeframes)?;
        self.after_edit(commit.is_some());
        Ok(commit)
    }

    /// Live drawing set as an owned snapshot.
    #[must_use]
    pub fn drawings(&self) -> Vec<DrawingObject> {
        self.annotations.snapshot()
    }

    pub fn cut(&mut self, at: UnixSeconds) -> Option<UnixSeconds> {
        if !self.is_live() {
            return None;
        }
        self.replay.cut(at)
    }

    pub fn play(&mut self) -> bool {
        self.is_live() && self.replay.play()
    }

    pub fn pause(&mut self) -> bool {
        self.replay.pause()
    }

    pub fn step_forward(&mut self) -> Option<UnixSeconds> {
        if !self.is_live() {
            return None;
        }
        self.replay.step_forward()
    }

    pub fn step_backward(&mut self) -> Option<UnixSeconds> {
        if !self.is_live() {
            return None;
        }
        self.replay.step_backward()
    }

    pub fn set_replay_speed(&mut self, speed: Duration) -> ReplayResult<()> {
        self.replay.set_speed(speed)
    }

    pub fn turn_off_replay(&mut self) {
        if self.is_live() {
            self.replay.turn_off();
        }
    }

    #[must_use]
    pub fn replay_phase(&self) -> ReplayPhase {
        self.replay.phase()
    }

    /// Cuts replay a few bars before the trade entry.
    pub fn focus_trade(&mut self) -> Option<UnixSeconds> {
        if !self.is_live() {
            return None;
        }
        let index = self.trade.as_ref()?.focus_index(self.candles.series())?;
        let time = self.candles.series().get(index)?.time;
        self.replay.cut(time)
    }

    #[must_use]
    pub fn trade_progress(&self) -> Option<TradeProgress> {
        let trade = self.trade.as_ref()?;
        if self.candles.is_empty() {
            return None;
        }
        Some(trade.evaluate(self.replay.visible_candles()))
    }

    #[must_use]
    pub fn entry_marker_time(&self) -> Option<UnixSeconds> {
        self.trade.as_ref()?.entry_marker_time(self.candles.series())
    }

    /// Materializes one pane: candles, visible drawings, the live preview and
    /// trade levels.
    pub fn render_frame(&self, pane: PaneId) -> ReplayResult<RenderFrame> {
        if pane == PaneId::Secondary && self.panes.layout() == Layout::Single {
            return Err(ReplayError::InvalidData(
                "secondary pane is hidden in single layout".to_owned(),
            ));
        }
        let transform = self.panes.pane(pane).transform().ok_or_else(|| {
            ReplayError::InvalidData("pane has no visible range yet".to_owned())
        })?;
        let timeframe = self.pane_timeframe(pane);
        let label = timeframe.label();
        let aggregated;
        let candles = match pane {
            PaneId::Primary => self.replay.visible_candles(),
            PaneId::Secondary => {
                aggregated = self.secondary_series()?;
                aggregated.as_slice()
            }
        };
        let preview = self
            .annotations
            .preview()
            .filter(|_| self.gesture_pane == Some(pane))
            .filter(|drawing| drawing.is_visible_on(label));
        let levels = self
            .trade
            .as_ref()
            .map(TradeContext::price_levels)
            .unwrap_or_default();

        Ok(PaneFrameBuilder::new(&transform, self.frame_style)?
            .candles(candles, timeframe.seconds())
            .price_levels(&levels)
            .drawings(self.annotations.visible_drawings(label), preview)
            .finish())
    }
}
