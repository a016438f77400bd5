#![forbid(unsafe_code)]

//! The runtime's structured tracing events.

use std::sync::{Arc, Mutex};

use aexpr_runtime::{Reactive, Reactor, ReactorConfig, Scope, Value};
use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

#[derive(Default)]
struct Captured {
    messages: Vec<String>,
    spans: Vec<String>,
}

struct CaptureLayer {
    state: Arc<Mutex<Captured>>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::Id,
        _ctx: Context<'_, S>,
    ) {
        self.state
            .lock()
            .expect("capture lock")
            .spans
            .push(attrs.metadata().name().to_string());
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        struct Msg {
            message: Option<String>,
        }
        impl tracing::field::Visit for Msg {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = Some(value.to_string());
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = Some(format!("{value:?}").trim_matches('"').to_string());
                }
            }
        }
        let mut msg = Msg { message: None };
        event.record(&mut msg);
        if let Some(message) = msg.message {
            self.state.lock().expect("capture lock").messages.push(message);
        }
    }
}

fn capture() -> (Arc<Mutex<Captured>>, tracing::subscriber::DefaultGuard) {
    let state = Arc::new(Mutex::new(Captured::default()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer {
        state: Arc::clone(&state),
    });
    let guard = tracing::subscriber::set_default(subscriber);
    (state, guard)
}

#[test]
fn lifecycle_events_and_evaluation_span() {
    let (state, _guard) = capture();

    let reactor = Reactor::new();
    let obj = reactor.object([("a", Value::from(1))]);
    let expr = reactor
        .track_source("o.a", Scope::new().with("o", obj), [])
        .unwrap();
    expr.on_change(|_| {});
    reactor.set(obj, "a", 2).unwrap();
    expr.revoke();
    expr.reinstall().unwrap();

    let captured = state.lock().expect("capture lock");
    for expected in [
        "aexpr.install",
        "aexpr.reevaluate",
        "aexpr.changed",
        "aexpr.revoke",
        "aexpr.reinstall",
    ] {
        assert!(
            captured.messages.iter().any(|m| m == expected),
            "expected {expected} event, got {:?}",
            captured.messages
        );
    }
    assert!(captured.spans.iter().any(|s| s == "aexpr.evaluate"));
}

#[test]
fn failures_are_reported_at_warn() {
    let (state, _guard) = capture();

    let reactor = Reactor::with_config(ReactorConfig::default().with_max_cascade_depth(2));
    let obj = reactor.object([("a", Value::from(1))]);
    let weak = reactor.downgrade();
    reactor
        .track_source("o.a", Scope::new().with("o", obj), [])
        .unwrap()
        .on_change(|_| panic!("handler failure"))
        .on_change(move |v| {
            if let Some(reactor) = weak.upgrade() {
                let _ = reactor.set(obj, "a", v.to_number() + 1.0);
            }
        });
    reactor.set(obj, "a", 5).unwrap();
    let ticking = reactor.tick_source("o.a", Scope::new().with("o", obj)).unwrap();
    reactor.check_all().unwrap();
    ticking.revoke();

    let captured = state.lock().expect("capture lock");
    assert!(captured.messages.iter().any(|m| m == "aexpr.handler_failed"));
    assert!(captured.messages.iter().any(|m| m == "aexpr.cascade_limit"));
    assert!(captured.messages.iter().any(|m| m == "ticking.check"));
}
