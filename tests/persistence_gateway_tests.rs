use std::time::Duration;

use trade_replay::ReplayError;
use trade_replay::annotation::{DrawingKind, DrawingObject, DrawingStyle, DrawingTemplate};
use trade_replay::core::DomainPoint;
use trade_replay::persistence::json_contract::{
    drawings_from_json_compat_str, drawings_to_json_contract_v1_pretty,
};
use trade_replay::persistence::{
    AnnotationStore, Debouncer, InMemoryAnnotationStore, InMemoryTemplateStore,
    PersistenceGateway, SaveOutcome, TemplateStore,
};

fn level(price: f64) -> DrawingObject {
    DrawingObject::new(DrawingKind::Horizontal, [DomainPoint::new(0, price)]).expect("drawing")
}

fn gateway() -> PersistenceGateway<InMemoryAnnotationStore> {
    PersistenceGateway::new(
        InMemoryAnnotationStore::new(),
        "trade-42",
        Duration::from_millis(1_000),
    )
}

#[test]
fn debouncer_restarts_on_every_trigger() {
    let mut debouncer = Debouncer::new(Duration::from_millis(500));
    assert!(!debouncer.advance(Duration::from_secs(10)));

    debouncer.trigger();
    assert!(!debouncer.advance(Duration::from_millis(400)));
    debouncer.trigger();
    assert!(!debouncer.advance(Duration::from_millis(400)));
    assert!(debouncer.advance(Duration::from_millis(100)));
    assert!(!debouncer.is_pending());
    assert!(!debouncer.advance(Duration::from_millis(500)));
}

#[test]
fn burst_of_changes_produces_one_save() {
    let mut gateway = gateway();
    gateway.notify_change(vec![level(100.0)]);
    assert_eq!(gateway.advance(Duration::from_millis(600)), None);
    gateway.notify_change(vec![level(100.0), level(101.0)]);
    assert_eq!(gateway.advance(Duration::from_millis(600)), None);

    assert_eq!(gateway.advance(Duration::from_millis(400)), Some(SaveOutcome::Saved));
    assert_eq!(gateway.save_count(), 1);
    assert_eq!(gateway.store().save_calls(), 1);
    assert_eq!(gateway.last_persisted().len(), 2);
    assert!(!gateway.is_dirty());
}

#[test]
fn unchanged_snapshot_skips_the_store() {
    let mut gateway = gateway();
    gateway.notify_change(Vec::new());
    assert_eq!(gateway.advance(Duration::from_secs(1)), Some(SaveOutcome::Unchanged));
    assert_eq!(gateway.store().save_calls(), 0);
}

#[test]
fn teardown_flushes_pending_changes() {
    let mut gateway = gateway();
    gateway.notify_change(vec![level(99.5)]);
    assert!(gateway.is_save_pending());

    assert_eq!(gateway.flush_on_teardown(), SaveOutcome::Saved);
    assert!(!gateway.is_save_pending());
    let document = gateway.store().document("trade-42").expect("saved document");
    let restored = drawings_from_json_compat_str(document).expect("parse document");
    assert_eq!(restored.len(), 1);
    assert!((restored[0].points[0].price - 99.5).abs() <= 1e-9);
}

#[test]
fn failed_save_is_recorded_and_retried_by_next_flush() {
    let mut gateway = gateway();
    gateway.store_mut().set_fail_saves(true);
    gateway.notify_change(vec![level(1.0)]);

    let outcome = gateway.advance(Duration::from_secs(1)).expect("debounce fired");
    assert!(matches!(outcome, SaveOutcome::Failed(ReplayError::Persistence { .. })));
    assert!(gateway.last_error().is_some());
    assert!(gateway.is_dirty());

    gateway.store_mut().set_fail_saves(false);
    assert_eq!(gateway.flush_on_teardown(), SaveOutcome::Saved);
    assert!(gateway.last_error().is_none());
}

#[test]
fn load_sets_clean_baseline() {
    let mut store = InMemoryAnnotationStore::new();
    store
        .save("trade-42", &[level(5.0), level(6.0)])
        .expect("seed store");
    let mut gateway = PersistenceGateway::new(store, "trade-42", Duration::from_secs(1));

    let drawings = gateway.load().expect("load");
    assert_eq!(drawings.len(), 2);
    assert!(!gateway.is_dirty());
    assert_eq!(gateway.flush_on_teardown(), SaveOutcome::Unchanged);
}

#[test]
fn json_contract_accepts_bare_array_and_envelope() {
    let drawings = vec![level(1.25)];
    let envelope = drawings_to_json_contract_v1_pretty(&drawings).expect("serialize");
    assert!(envelope.contains("\"schema_version\": 1"));
    assert!(envelope.contains("\"type\": \"horizontal\""));
    assert_eq!(drawings_from_json_compat_str(&envelope).expect("envelope"), drawings);

    let bare = serde_json::to_string(&drawings).expect("bare array");
    assert_eq!(drawings_from_json_compat_str(&bare).expect("bare"), drawings);

    let future = r#"{"schema_version": 2, "drawings": []}"#;
    assert!(drawings_from_json_compat_str(future).is_err());
}

#[test]
fn template_store_filters_by_kind_and_deletes() {
    let mut store = InMemoryTemplateStore::new();
    let line = DrawingTemplate::new("Blue line", DrawingKind::Line, DrawingStyle::default())
        .expect("template");
    let rect = DrawingTemplate::new("Zone", DrawingKind::Rect, DrawingStyle::default())
        .expect("template");
    store.save_template(line.clone()).expect("save line");
    store.save_template(rect).expect("save rect");

    let lines = store.list_templates(DrawingKind::Line).expect("list");
    assert_eq!(lines, vec![line.clone()]);

    store.delete_template(&line.id).expect("delete");
    assert!(store.get(&line.id).is_none());
    assert!(matches!(
        store.delete_template(&line.id),
        Err(ReplayError::UnknownTemplate(_))
    ));
}
