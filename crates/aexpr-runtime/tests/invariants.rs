#![forbid(unsafe_code)]

//! Property-based checks of the notification and registry invariants.

use std::cell::RefCell;
use std::rc::Rc;

use aexpr_runtime::{ActiveExpression, PropertyKey, Reactive, Reactor, Scope, Value};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Write { prop: usize, value: i32 },
    Revoke { expr: usize },
    Reinstall { expr: usize },
}

const PROPS: [&str; 3] = ["a", "b", "c"];

const SOURCES: [&str; 3] = [
    "o.a * o.b",
    "o.a > 0 ? o.b : o.c",
    "Math.max(o.a, o.c) + o.b",
];

fn model(source: usize, a: i32, b: i32, c: i32) -> f64 {
    let (a, b, c) = (f64::from(a), f64::from(b), f64::from(c));
    match source {
        0 => a * b,
        1 => {
            if a > 0.0 {
                b
            } else {
                c
            }
        }
        _ => a.max(c) + b,
    }
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0..PROPS.len(), -3..4i32).prop_map(|(prop, value)| Op::Write { prop, value }),
        1 => (0..SOURCES.len()).prop_map(|expr| Op::Revoke { expr }),
        1 => (0..SOURCES.len()).prop_map(|expr| Op::Reinstall { expr }),
    ]
}

proptest! {
    /// Handlers run exactly when the modelled value changes, and only while
    /// the expression is active.
    #[test]
    fn notifies_iff_value_changed(ops in prop::collection::vec(op(), 1..48)) {
        let reactor = Reactor::new();
        let obj = reactor.object([
            ("a", Value::from(1)),
            ("b", Value::from(1)),
            ("c", Value::from(1)),
        ]);
        let mut current = [1i32; 3];

        let mut exprs: Vec<ActiveExpression> = Vec::new();
        let mut logs: Vec<Rc<RefCell<Vec<Value>>>> = Vec::new();
        for source in SOURCES {
            let expr = reactor
                .track_source(source, Scope::new().with("o", obj), [])
                .unwrap();
            let log = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&log);
            expr.on_change(move |v| sink.borrow_mut().push(v.clone()));
            exprs.push(expr);
            logs.push(log);
        }
        let mut last: Vec<f64> = (0..SOURCES.len()).map(|i| model(i, 1, 1, 1)).collect();
        let mut expected: Vec<Vec<Value>> = vec![Vec::new(); SOURCES.len()];

        for op in ops {
            match op {
                Op::Write { prop, value } => {
                    current[prop] = value;
                    reactor.set(obj, PROPS[prop], value).unwrap();
                    for (i, expr) in exprs.iter().enumerate() {
                        if !expr.is_active() {
                            continue;
                        }
                        let now = model(i, current[0], current[1], current[2]);
                        // Only written properties on the current read path
                        // trigger; an untouched path cannot change the value.
                        if now != last[i] {
                            expected[i].push(Value::Number(now));
                            last[i] = now;
                        }
                    }
                }
                Op::Revoke { expr } => exprs[expr].revoke(),
                Op::Reinstall { expr } => {
                    if !exprs[expr].is_active() {
                        exprs[expr].reinstall().unwrap();
                        last[expr] = model(expr, current[0], current[1], current[2]);
                    }
                }
            }
            prop_assert!(reactor.registry_is_consistent());
            for (i, expr) in exprs.iter().enumerate() {
                if expr.is_active() {
                    prop_assert_eq!(expr.value(), Some(Value::Number(last[i])));
                    prop_assert!(!expr.dependencies().is_empty());
                } else {
                    prop_assert!(expr.dependencies().is_empty());
                }
            }
        }

        for (log, want) in logs.iter().zip(&expected) {
            prop_assert_eq!(&*log.borrow(), want);
        }
    }

    /// After any write the dependency set is exactly the read path of the
    /// conditional.
    #[test]
    fn dependency_set_matches_read_path(flags in prop::collection::vec(any::<bool>(), 1..16)) {
        let reactor = Reactor::new();
        let obj = reactor.object([
            ("flag", Value::Bool(true)),
            ("x", Value::from(1)),
            ("y", Value::from(2)),
        ]);
        let expr = reactor
            .track_source("o.flag ? o.x : o.y", Scope::new().with("o", obj), [])
            .unwrap();
        for flag in flags {
            reactor.set(obj, "flag", flag).unwrap();
            let branch = if flag { "x" } else { "y" };
            prop_assert_eq!(
                expr.dependencies(),
                vec![PropertyKey::new(obj, "flag"), PropertyKey::new(obj, branch)]
            );
        }
    }
}
