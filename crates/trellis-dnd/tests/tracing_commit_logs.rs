//! Structured log output of the reparenting engine.
//!
//! Installs a capturing `tracing_subscriber` layer for the duration of each
//! test and asserts on span names, targets, levels and fields.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::executor::block_on;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use trellis_core::DropTarget;
use trellis_dnd::logging::{TARGET_COMMIT, TARGET_DRAG, TARGET_VALIDATOR};
use trellis_dnd::{Duration, Instant, MoveResponse};
use trellis_harness::Harness;
use trellis_harness::fixtures::{c1, c2, g};

// ═══════════════════════════════════════════════════════════════════════
// Capture layer
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    target: String,
    fields: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    fields: HashMap<String, String>,
}

impl CapturedEvent {
    fn message(&self) -> &str {
        self.fields.get("message").map_or("", String::as_str)
    }
}

#[derive(Default)]
struct Captured {
    spans: Mutex<Vec<CapturedSpan>>,
    events: Mutex<Vec<CapturedEvent>>,
}

struct CaptureLayer(Arc<Captured>);

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for CaptureLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.0.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            target: attrs.metadata().target().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }

    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.0.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured_tracing<F: FnOnce()>(f: F) -> Arc<Captured> {
    let captured = Arc::new(Captured::default());
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(captured.clone()));
    tracing::subscriber::with_default(subscriber, || {
        tracing::callsite::rebuild_interest_cache();
        f();
    });
    captured
}

impl Captured {
    fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn events_for(&self, target: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.target == target)
            .cloned()
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Commit
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn commit_runs_inside_span_with_node_fields() {
    let h = Harness::scenario();
    let captured = with_captured_tracing(|| {
        let mut session = h.session();
        session.begin_drag(&c1()).unwrap();
        block_on(session.drop_on(DropTarget::node(c2())));
    });

    let spans = captured.spans();
    let commit = spans
        .iter()
        .find(|s| s.name == "move.commit")
        .expect("expected move.commit span");
    assert_eq!(commit.target, TARGET_COMMIT);
    assert_eq!(commit.fields.get("node_id").map(String::as_str), Some("c1"));
    assert!(commit.fields["new_parent"].contains("c2"));
}

#[test]
fn successful_commit_logs_info() {
    let h = Harness::scenario();
    let captured = with_captured_tracing(|| {
        let mut session = h.session();
        session.begin_drag(&c1()).unwrap();
        block_on(session.drop_on(DropTarget::node(c2())));
    });

    let events = captured.events_for(TARGET_COMMIT);
    let done = events
        .iter()
        .find(|e| e.message() == "move committed")
        .expect("expected commit event");
    assert_eq!(done.level, tracing::Level::INFO);
    assert_eq!(done.fields.get("node_id").map(String::as_str), Some("c1"));
}

#[test]
fn failed_commit_logs_warn_with_server_message() {
    let h = Harness::scenario();
    h.api.push_reply(Ok(MoveResponse::failed("locked")));
    let captured = with_captured_tracing(|| {
        let mut session = h.session();
        session.begin_drag(&c1()).unwrap();
        block_on(session.drop_on(DropTarget::node(c2())));
    });

    let events = captured.events_for(TARGET_COMMIT);
    let failed = events
        .iter()
        .find(|e| e.message() == "move failed")
        .expect("expected failure event");
    assert_eq!(failed.level, tracing::Level::WARN);
    assert_eq!(
        failed.fields.get("server_message").map(String::as_str),
        Some("locked")
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Validation and session
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn rejection_logs_reason_code() {
    let h = Harness::scenario();
    let captured = with_captured_tracing(|| {
        let mut session = h.session();
        session.begin_drag(&c1()).unwrap();
        block_on(session.drop_on(DropTarget::node(g())));
    });

    let events = captured.events_for(TARGET_VALIDATOR);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].level, tracing::Level::DEBUG);
    assert_eq!(events[0].fields.get("reason").map(String::as_str), Some("cycle"));
    assert!(captured.events_for(TARGET_COMMIT).is_empty());
}

#[test]
fn session_transitions_log_under_drag_target() {
    let h = Harness::scenario();
    let captured = with_captured_tracing(|| {
        let mut session = h.session();
        let t = Instant::now();
        session.begin_drag(&c1()).unwrap();
        session.hover(DropTarget::node(c2()), t);
        session.tick(t + Duration::from_millis(50));
        session.cancel();
    });

    let messages: Vec<String> = captured
        .events_for(TARGET_DRAG)
        .iter()
        .map(|e| e.message().to_string())
        .collect();
    assert_eq!(messages, ["drag armed", "hover evaluated", "drag cancelled"]);
}

#[test]
fn nothing_logged_above_debug_for_a_clean_drag() {
    let h = Harness::scenario();
    let captured = with_captured_tracing(|| {
        let mut session = h.session();
        let t = Instant::now();
        session.begin_drag(&c2()).unwrap();
        session.hover(DropTarget::node(g()), t);
        session.tick(t + Duration::from_millis(50));
        session.cancel();
    });

    let noisy: Vec<_> = captured
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.level <= tracing::Level::INFO)
        .cloned()
        .collect();
    assert!(noisy.is_empty(), "unexpected events: {noisy:?}");
}
