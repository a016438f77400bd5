#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use aexpr::prelude::*;
use proptest::prelude::*;

#[test]
fn prelude_covers_the_common_path() {
    let reactor = Reactor::with_config(ReactorConfig::from_env());
    let obj = reactor.object([("a", Value::from(2)), ("b", Value::from(3))]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    reactor
        .track(
            ExprFunction::parse("(o) => Math.max(o.a, o.b)").unwrap(),
            Scope::new(),
            [Value::Object(obj)],
        )
        .unwrap()
        .on_change(move |v| sink.borrow_mut().push(v.clone()));
    reactor.set(obj, "a", 7).unwrap();
    assert_eq!(*seen.borrow(), vec![Value::from(7)]);
}

#[test]
fn tracked_and_polled_share_a_contract() {
    fn watch(expr: &impl Reactive, log: &Rc<RefCell<Vec<ExprId>>>) {
        let sink = Rc::clone(log);
        let id = expr.id();
        expr.on_change(move |_| sink.borrow_mut().push(id));
    }

    let reactor = Reactor::new();
    let obj = reactor.object([("a", Value::from(1))]);
    let log = Rc::new(RefCell::new(Vec::new()));
    let tracked = reactor
        .track_source("o.a", Scope::new().with("o", obj), [])
        .unwrap();
    let polled = reactor.tick_source("o.a", Scope::new().with("o", obj)).unwrap();
    watch(&tracked, &log);
    watch(&polled, &log);

    reactor.set(obj, "a", 2).unwrap();
    assert_eq!(*log.borrow(), vec![tracked.id()]);
    reactor.check_all().unwrap();
    assert_eq!(*log.borrow(), vec![tracked.id(), polled.id()]);
}

proptest! {
    /// A sum expression always holds the sum of the latest writes.
    #[test]
    fn sum_tracks_latest_writes(
        writes in prop::collection::vec((any::<bool>(), -1000..1000i32), 0..32)
    ) {
        let reactor = Reactor::new();
        let obj = reactor.object([("a", Value::from(0)), ("b", Value::from(0))]);
        let expr = reactor.track_source("o.a + o.b", Scope::new().with("o", obj), []).unwrap();
        let (mut a, mut b) = (0i32, 0i32);
        for (left, value) in writes {
            if left {
                a = value;
                reactor.set(obj, "a", value).unwrap();
            } else {
                b = value;
                reactor.set(obj, "b", value).unwrap();
            }
            prop_assert_eq!(expr.value(), Some(Value::from(f64::from(a) + f64::from(b))));
        }
    }
}
