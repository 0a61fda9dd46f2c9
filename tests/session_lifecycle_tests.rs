use std::time::Duration;

use trade_replay::annotation::{CommitKind, DrawingKind, Tool};
use trade_replay::api::{FetchKind, LoadState, SessionLifecycle};
use trade_replay::core::{
    Candle, CandleSeries, ChartGeometry, PaneSize, PriceRange, Timeframe, Viewport,
};
use trade_replay::interaction::{Key, KeyCommand, Modifiers};
use trade_replay::panes::{Layout, PaneId};
use trade_replay::persistence::{InMemoryAnnotationStore, InMemoryCandleSource, SaveOutcome};
use trade_replay::render::{NullRenderer, Renderer};
use trade_replay::replay::ReplayPhase;
use trade_replay::{ReplaySession, SessionConfig};

const FIRST_LOADED: i64 = 180_000;
const LAST_LOADED: i64 = 359_940;

fn source() -> InMemoryCandleSource {
    let candles = (0..6_000)
        .map(|i| Candle::new(i * 60, 100.0, 101.0, 99.0, 100.5).expect("valid candle"))
        .collect();
    InMemoryCandleSource::new(CandleSeries::from_sorted(candles).expect("sorted"))
}

fn geometry() -> ChartGeometry {
    ChartGeometry::new(PaneSize::new(600, 400), PriceRange::new(90.0, 110.0))
}

fn running_session(source: &mut InMemoryCandleSource) -> ReplaySession<InMemoryAnnotationStore> {
    let config = SessionConfig::new("trade-1", "ES");
    let mut session =
        ReplaySession::new(config, InMemoryAnnotationStore::new()).expect("session");
    let request = session.init(FIRST_LOADED, LAST_LOADED).expect("init");
    assert_eq!(request.kind, FetchKind::Initial);
    assert!(session.fetch_with(source, &request));
    session.set_pane_geometry(PaneId::Primary, geometry());
    session
}

fn drag_line(session: &mut ReplaySession<InMemoryAnnotationStore>) -> Option<CommitKind> {
    session.pointer_down(PaneId::Primary, 100.0, 100.0, Modifiers::none());
    session.pointer_move(PaneId::Primary, 200.0, 150.0, Modifiers::none());
    session.pointer_up(PaneId::Primary, 200.0, 150.0, Modifiers::none())
}

#[test]
fn initial_load_makes_session_ready() {
    let mut source = source();
    let session = running_session(&mut source);

    assert_eq!(session.lifecycle(), SessionLifecycle::Running);
    assert_eq!(session.load_state(), &LoadState::Ready);
    assert_eq!(session.candle_store().first_time(), Some(FIRST_LOADED));
    assert_eq!(session.candle_store().series().len(), 3_000);
    assert_eq!(source.requests(), &[(FIRST_LOADED, LAST_LOADED)]);
}

#[test]
fn init_rejects_second_call_and_inverted_window() {
    let mut session = ReplaySession::new(
        SessionConfig::new("trade-1", "ES"),
        InMemoryAnnotationStore::new(),
    )
    .expect("session");
    assert!(session.init(10, 5).is_err());
    session.init(0, 10).expect("first init");
    assert!(session.init(0, 10).is_err());
}

#[test]
fn secondary_finer_than_primary_is_rejected() {
    let config =
        SessionConfig::new("trade-1", "ES").with_timeframes(Timeframe::Hour1, Timeframe::Min5);
    assert!(ReplaySession::new(config, InMemoryAnnotationStore::new()).is_err());
}

#[test]
fn scrolling_near_the_start_keeps_walking_back_in_chunks() {
    let mut source = source();
    let mut session = running_session(&mut source);

    let far = Viewport::new(FIRST_LOADED + 60_000, FIRST_LOADED + 66_000);
    assert!(session.on_viewport_changed(PaneId::Primary, far).is_none());

    let near = Viewport::new(FIRST_LOADED + 600, FIRST_LOADED + 6_600);
    let request = session
        .on_viewport_changed(PaneId::Primary, near)
        .expect("backfill request");
    assert_eq!(request.kind, FetchKind::Backfill);
    assert_eq!(request.to, FIRST_LOADED - 1);
    assert_eq!(request.from, FIRST_LOADED - 2 * 86_400);
    assert!(session.on_viewport_changed(PaneId::Primary, near).is_none());

    assert!(session.fetch_with(&mut source, &request));
    assert_eq!(session.candle_store().first_time(), Some(7_200));

    let start = Viewport::new(7_260, 13_260);
    let request = session
        .on_viewport_changed(PaneId::Primary, start)
        .expect("second backfill");
    assert!(session.fetch_with(&mut source, &request));
    assert_eq!(session.candle_store().first_time(), Some(0));

    let request = session
        .on_viewport_changed(PaneId::Primary, Viewport::new(0, 6_000))
        .expect("third backfill");
    assert_eq!((request.from, request.to), (-338_400, -165_601));
    assert!(session.fetch_with(&mut source, &request));
    assert_eq!(session.candle_store().first_time(), Some(0));

    let request = session
        .on_viewport_changed(PaneId::Primary, Viewport::new(0, 6_000))
        .expect("empty chunks do not stop back-fill");
    assert_eq!((request.from, request.to), (-511_200, -338_401));
}

#[test]
fn backfill_steps_over_a_closure_longer_than_one_chunk() {
    const DAY: i64 = 86_400;
    let week_one = (0..5 * 1_440).map(|i| i * 60);
    let reopen = 8 * DAY;
    let week_two = (0..2 * 1_440).map(|i| reopen + i * 60);
    let candles = week_one
        .chain(week_two)
        .map(|time| Candle::new(time, 100.0, 101.0, 99.0, 100.5).expect("valid candle"))
        .collect();
    let mut source =
        InMemoryCandleSource::new(CandleSeries::from_sorted(candles).expect("sorted"));

    let mut session = ReplaySession::new(
        SessionConfig::new("trade-1", "ES"),
        InMemoryAnnotationStore::new(),
    )
    .expect("session");
    let request = session.init(reopen, 10 * DAY - 60).expect("init");
    assert!(session.fetch_with(&mut source, &request));
    assert_eq!(session.candle_store().first_time(), Some(reopen));

    let near_reopen = Viewport::new(reopen + 600, reopen + 6_600);
    let gap = session
        .on_viewport_changed(PaneId::Primary, near_reopen)
        .expect("first backfill");
    assert_eq!((gap.from, gap.to), (reopen - 2 * DAY, reopen - 1));
    assert!(session.fetch_with(&mut source, &gap));
    assert_eq!(session.candle_store().first_time(), Some(reopen));

    let older = session
        .on_viewport_changed(PaneId::Primary, near_reopen)
        .expect("backfill continues past the empty chunk");
    assert_eq!((older.from, older.to), (reopen - 4 * DAY, reopen - 2 * DAY - 1));
    assert!(session.fetch_with(&mut source, &older));
    assert_eq!(session.candle_store().first_time(), Some(4 * DAY));
    assert_eq!(session.candle_store().series().len(), 2 * 1_440 + 1_440);
}

#[test]
fn failed_backfill_is_requested_again() {
    let mut source = source();
    let mut session = running_session(&mut source);
    let near = Viewport::new(FIRST_LOADED + 600, FIRST_LOADED + 6_600);
    let request = session
        .on_viewport_changed(PaneId::Primary, near)
        .expect("backfill request");

    source.set_failure(Some("timeout".to_owned()));
    assert!(session.fetch_with(&mut source, &request));
    assert!(session.last_fetch_error().is_some());
    assert_eq!(session.load_state(), &LoadState::Ready);

    let again = session
        .on_viewport_changed(PaneId::Primary, near)
        .expect("retry backfill");
    assert_eq!((again.from, again.to), (request.from, request.to));
}

#[test]
fn empty_initial_response_is_a_load_failure() {
    let mut session = ReplaySession::new(
        SessionConfig::new("trade-1", "ES"),
        InMemoryAnnotationStore::new(),
    )
    .expect("session");
    let request = session.init(FIRST_LOADED, LAST_LOADED).expect("init");

    assert!(session.complete_fetch(request.ticket, Ok(Vec::new())));
    match session.load_state() {
        LoadState::Failed { reason } => assert!(reason.contains("no candles")),
        other => panic!("expected failed load, got {other:?}"),
    }
    assert!(session.last_fetch_error().is_some());
    assert!(session.retry_initial(FIRST_LOADED, LAST_LOADED).is_some());
}

#[test]
fn failed_initial_load_can_be_retried() {
    let mut source = source();
    source.set_failure(Some("upstream unavailable".to_owned()));
    let mut session = ReplaySession::new(
        SessionConfig::new("trade-1", "ES"),
        InMemoryAnnotationStore::new(),
    )
    .expect("session");

    let request = session.init(FIRST_LOADED, LAST_LOADED).expect("init");
    assert!(session.fetch_with(&mut source, &request));
    assert!(matches!(session.load_state(), LoadState::Failed { .. }));
    assert!(session.last_fetch_error().is_some());

    source.set_failure(None);
    let retry = session
        .retry_initial(FIRST_LOADED, LAST_LOADED)
        .expect("retry request");
    assert!(session.fetch_with(&mut source, &retry));
    assert_eq!(session.load_state(), &LoadState::Ready);
    assert!(session.retry_initial(FIRST_LOADED, LAST_LOADED).is_none());
}

#[test]
fn responses_after_teardown_are_dropped() {
    let mut source = source();
    let mut session = ReplaySession::new(
        SessionConfig::new("trade-1", "ES"),
        InMemoryAnnotationStore::new(),
    )
    .expect("session");
    let request = session.init(FIRST_LOADED, LAST_LOADED).expect("init");

    assert_eq!(session.teardown(), SaveOutcome::Unchanged);
    assert_eq!(session.lifecycle(), SessionLifecycle::TornDown);
    assert!(!session.fetch_with(&mut source, &request));
    assert!(session.candle_store().is_empty());
    assert_eq!(session.teardown(), SaveOutcome::Unchanged);
}

#[test]
fn unknown_ticket_is_ignored() {
    let mut source = source();
    let mut session = running_session(&mut source);
    assert!(!session.complete_fetch(999, Ok(Vec::new())));
}

#[test]
fn pointer_drawing_is_saved_after_debounce() {
    let mut source = source();
    let mut session = running_session(&mut source);
    session.on_viewport_changed(PaneId::Primary, Viewport::new(300_000, 306_000));

    session.set_tool(Tool::Line);
    assert_eq!(drag_line(&mut session), Some(CommitKind::Create));
    assert_eq!(session.drawings().len(), 1);
    assert!(session.gateway().is_save_pending());

    session.advance(Duration::from_millis(500));
    assert_eq!(session.gateway().save_count(), 0);
    session.advance(Duration::from_millis(500));
    assert_eq!(session.gateway().save_count(), 1);
    assert!(session.gateway().store().document("trade-1").is_some());
}

#[test]
fn pointer_input_before_layout_is_ignored() {
    let mut source = source();
    let mut session = running_session(&mut source);
    session.set_tool(Tool::Text);
    assert_eq!(
        session.pointer_down(PaneId::Primary, 10.0, 10.0, Modifiers::none()),
        None
    );
    assert!(session.drawings().is_empty());
}

#[test]
fn magnet_snaps_new_drawings_onto_candles() {
    let mut source = source();
    let mut session = running_session(&mut source);
    session.on_viewport_changed(PaneId::Primary, Viewport::new(300_000, 306_000));
    session.set_magnet_enabled(true);

    session.set_tool(Tool::Text);
    assert_eq!(
        session.pointer_down(PaneId::Primary, 32.0, 182.0, Modifiers::none()),
        Some(CommitKind::Create)
    );
    let text = &session.drawings()[0];
    assert_eq!(text.kind, DrawingKind::Text);
    assert_eq!(text.points[0].time, 300_300);
    assert!((text.points[0].price - 101.0).abs() <= 1e-9);
}

#[test]
fn keyboard_shortcuts_drive_tools_history_and_replay() {
    let mut source = source();
    let mut session = running_session(&mut source);
    session.on_viewport_changed(PaneId::Primary, Viewport::new(300_000, 306_000));

    assert_eq!(
        session.key(Key::Char('t'), Modifiers::none()),
        Some(KeyCommand::SelectTool(Tool::Line))
    );
    assert_eq!(drag_line(&mut session), Some(CommitKind::Create));

    assert_eq!(session.key(Key::Char('z'), Modifiers::ctrl()), Some(KeyCommand::Undo));
    assert!(session.drawings().is_empty());
    assert_eq!(
        session.key(Key::Char('z'), Modifiers::ctrl_shift()),
        Some(KeyCommand::Redo)
    );
    assert_eq!(session.drawings().len(), 1);

    assert_eq!(session.key(Key::Space, Modifiers::none()), None);
    session.cut(310_000).expect("cut");
    assert_eq!(
        session.key(Key::Space, Modifiers::none()),
        Some(KeyCommand::TogglePlayback)
    );
    assert_eq!(session.replay_phase(), ReplayPhase::Playing);
    assert_eq!(session.advance(Duration::from_secs(2)), 2);
    assert_eq!(session.replay().playback_time(), Some(309_960 + 120));
}

#[test]
fn teardown_flushes_unsaved_drawings() {
    let mut source = source();
    let mut session = running_session(&mut source);
    session.on_viewport_changed(PaneId::Primary, Viewport::new(300_000, 306_000));
    session.set_tool(Tool::Rect);
    drag_line(&mut session);

    assert_eq!(session.teardown(), SaveOutcome::Saved);
    assert!(session.gateway().store().document("trade-1").is_some());
    assert_eq!(session.advance(Duration::from_secs(5)), 0);
    assert_eq!(
        session.pointer_down(PaneId::Primary, 100.0, 100.0, Modifiers::none()),
        None
    );
}

#[test]
fn edits_after_teardown_are_ignored() {
    let mut source = source();
    let mut session = running_session(&mut source);
    session.on_viewport_changed(PaneId::Primary, Viewport::new(300_000, 306_000));
    session.set_tool(Tool::Line);
    assert_eq!(drag_line(&mut session), Some(CommitKind::Create));
    let id = session.drawings()[0].id.clone();
    assert_eq!(session.teardown(), SaveOutcome::Saved);

    assert!(!session.undo());
    assert_eq!(session.clear_all(), None);
    assert_eq!(session.set_text(&id, "late"), Ok(None));
    assert_eq!(session.drawings().len(), 1);
    assert!(!session.gateway().is_dirty());

    assert_eq!(session.cut(300_000), None);
    assert_eq!(session.step_forward(), None);
    assert_eq!(session.replay_phase(), ReplayPhase::Off);
}

#[test]
fn cut_tool_arms_replay_at_the_pressed_candle() {
    let mut source = source();
    let mut session = running_session(&mut source);
    session.on_viewport_changed(PaneId::Primary, Viewport::new(300_000, 306_000));
    session.set_tool(Tool::Line);

    session.set_cut_tool(true);
    assert!(session.is_cut_tool_active());
    assert_eq!(
        session.pointer_down(PaneId::Primary, 100.0, 200.0, Modifiers::none()),
        None
    );
    assert_eq!(session.replay_phase(), ReplayPhase::Armed);
    assert_eq!(session.replay().playback_time(), Some(300_960));
    assert!(!session.is_cut_tool_active());
    assert_eq!(session.annotations().tool(), Tool::Cursor);
    assert!(session.drawings().is_empty());

    session.pointer_down(PaneId::Primary, 300.0, 200.0, Modifiers::none());
    session.pointer_up(PaneId::Primary, 300.0, 200.0, Modifiers::none());
    assert_eq!(session.replay().playback_time(), Some(300_960));
}

#[test]
fn cut_tool_needs_a_running_session_and_yields_to_drawing_tools() {
    let mut session = ReplaySession::new(
        SessionConfig::new("trade-1", "ES"),
        InMemoryAnnotationStore::new(),
    )
    .expect("session");
    session.set_cut_tool(true);
    assert!(!session.is_cut_tool_active());

    let mut source = source();
    let mut session = running_session(&mut source);
    session.set_cut_tool(true);
    session.set_tool(Tool::Rect);
    assert!(!session.is_cut_tool_active());
    session.set_cut_tool(true);
    assert_eq!(session.key(Key::Escape, Modifiers::none()), Some(KeyCommand::Escape));
    assert!(!session.is_cut_tool_active());
}

#[test]
fn secondary_magnet_follows_replay_position() {
    let mut source = source();
    let mut session = running_session(&mut source);
    session.cut(FIRST_LOADED + 20 * 60).expect("cut");
    session.set_magnet_enabled(true);

    session.on_viewport_changed(PaneId::Primary, Viewport::new(174_000, 186_000));
    let aligned = session.set_layout(Layout::Split).expect("aligned secondary");
    assert_eq!((aligned.from, aligned.to), (164_400, 186_000));
    session.set_pane_geometry(PaneId::Secondary, geometry());
    assert!(session.on_viewport_changed(PaneId::Secondary, aligned).is_none());

    session.set_tool(Tool::Text);
    assert_eq!(
        session.pointer_down(PaneId::Secondary, 460.0, 182.0, Modifiers::none()),
        Some(CommitKind::Create)
    );
    assert_eq!(session.drawings()[0].points[0].time, 180_900);

    for _ in 0..15 {
        session.step_forward().expect("step");
    }
    session.set_tool(Tool::Text);
    assert_eq!(
        session.pointer_down(PaneId::Secondary, 484.0, 182.0, Modifiers::none()),
        Some(CommitKind::Create)
    );
    let latest = &session.drawings()[1];
    assert_eq!(latest.points[0].time, 181_800);
    assert!((latest.points[0].price - 101.0).abs() <= 1e-9);
}

#[test]
fn persisted_drawings_are_restored_on_init() {
    let mut source = source();
    let mut session = running_session(&mut source);
    session.on_viewport_changed(PaneId::Primary, Viewport::new(300_000, 306_000));
    session.set_tool(Tool::Line);
    drag_line(&mut session);
    session.teardown();
    let document = session
        .gateway()
        .store()
        .document("trade-1")
        .expect("saved")
        .to_owned();

    let mut store = InMemoryAnnotationStore::new();
    store.insert_document("trade-1", document);
    let mut restored =
        ReplaySession::new(SessionConfig::new("trade-1", "ES"), store).expect("session");
    restored.init(FIRST_LOADED, LAST_LOADED).expect("init");
    assert_eq!(restored.drawings(), session.drawings());
    assert!(!restored.annotations().history().can_undo());
}

#[test]
fn secondary_pane_aggregates_replay_filtered_candles() {
    let mut source = source();
    let mut session = running_session(&mut source);
    session.cut(FIRST_LOADED + 20 * 60).expect("cut");

    let secondary = session.secondary_series().expect("aggregate");
    assert_eq!(secondary.len(), 2);
    assert_eq!(secondary.last().expect("partial bar").time, FIRST_LOADED + 900);
    assert_eq!(session.primary_candles().len(), 21);
}

#[test]
fn render_frames_follow_layout() {
    let mut source = source();
    let mut session = running_session(&mut source);
    assert!(session.render_frame(PaneId::Primary).is_err());

    session.on_viewport_changed(PaneId::Primary, Viewport::new(300_000, 306_000));
    let frame = session.render_frame(PaneId::Primary).expect("primary frame");
    let mut renderer = NullRenderer::default();
    renderer.render(&frame).expect("valid frame");
    assert!(renderer.last_rect_count >= 100);
    assert!(session.render_frame(PaneId::Secondary).is_err());

    let aligned = session.set_layout(Layout::Split).expect("aligned secondary");
    assert_eq!(aligned.to, 306_000);
    session.set_pane_geometry(PaneId::Secondary, geometry());
    assert!(session.on_viewport_changed(PaneId::Secondary, aligned).is_none());
    let secondary = session.render_frame(PaneId::Secondary).expect("secondary frame");
    renderer.render(&secondary).expect("valid secondary frame");
    assert!(renderer.last_rect_count > 0);
}
