#![forbid(unsafe_code)]

//! Built-in global objects.

use std::rc::Rc;

use aexpr_core::{Host, NativeFunction, ObjectId, Result, Value};

fn numeric_args(args: &[Value]) -> impl Iterator<Item = f64> + '_ {
    args.iter().map(Value::to_number)
}

fn first_arg(args: &[Value]) -> f64 {
    args.first().map_or(f64::NAN, Value::to_number)
}

fn unary(name: &'static str, op: fn(f64) -> f64) -> (Rc<str>, Value) {
    let function = NativeFunction::new(name, move |_, _, args| {
        Ok(Value::from(op(first_arg(args))))
    });
    (Rc::from(name), Value::from(function))
}

/// Script rounding: halves round towards positive infinity.
fn round_half_up(x: f64) -> f64 {
    let rounded = x.round();
    // `round` takes negative halves away from zero.
    if rounded - x == -0.5 { x.ceil() } else { rounded }
}

/// Allocate a `Math` object through `host`.
///
/// `max`/`min` return `NaN` when any argument is `NaN`, and `-Infinity`/
/// `Infinity` when called without arguments.
pub fn math_object(host: &dyn Host) -> Result<ObjectId> {
    let max = NativeFunction::new("max", |_, _, args| {
        let mut acc = f64::NEG_INFINITY;
        for n in numeric_args(args) {
            if n.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            acc = acc.max(n);
        }
        Ok(Value::Number(acc))
    });
    let min = NativeFunction::new("min", |_, _, args| {
        let mut acc = f64::INFINITY;
        for n in numeric_args(args) {
            if n.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            acc = acc.min(n);
        }
        Ok(Value::Number(acc))
    });
    let pow = NativeFunction::new("pow", |_, _, args| {
        let base = first_arg(args);
        let exponent = args.get(1).map_or(f64::NAN, Value::to_number);
        Ok(Value::Number(base.powf(exponent)))
    });

    let properties = vec![
        (Rc::from("max"), Value::from(max)),
        (Rc::from("min"), Value::from(min)),
        (Rc::from("pow"), Value::from(pow)),
        unary("abs", f64::abs),
        unary("floor", f64::floor),
        unary("ceil", f64::ceil),
        unary("round", round_half_up),
        unary("sqrt", f64::sqrt),
        (Rc::from("PI"), Value::Number(std::f64::consts::PI)),
    ];
    host.alloc_object(properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aexpr_core::Heap;
    use std::cell::RefCell;

    struct HeapHost(RefCell<Heap>);

    impl Host for HeapHost {
        fn get_property(&self, object: ObjectId, name: &str) -> Result<Value> {
            self.0.borrow().get(object, name)
        }

        fn set_property(&self, object: ObjectId, name: &str, value: Value) -> Result<()> {
            self.0.borrow_mut().set(object, name, value).map(|_| ())
        }

        fn alloc_object(&self, properties: Vec<(Rc<str>, Value)>) -> Result<ObjectId> {
            Ok(self.0.borrow_mut().alloc_with(properties))
        }
    }

    fn call(host: &HeapHost, math: ObjectId, name: &str, args: &[Value]) -> Value {
        let function = host.get_property(math, name).unwrap();
        function
            .as_function()
            .expect("function")
            .call(host, &Value::Object(math), args)
            .unwrap()
    }

    #[test]
    fn max_min_semantics() {
        let host = HeapHost(RefCell::new(Heap::new()));
        let math = math_object(&host).unwrap();
        assert_eq!(call(&host, math, "max", &[Value::from(2), Value::from(3)]), Value::from(3));
        assert_eq!(call(&host, math, "min", &[Value::from(2), Value::from(3)]), Value::from(2));
        assert_eq!(
            call(&host, math, "max", &[]),
            Value::Number(f64::NEG_INFINITY)
        );
        assert!(
            call(&host, math, "max", &[Value::from(1), Value::Undefined])
                .as_number()
                .unwrap()
                .is_nan()
        );
    }

    #[test]
    fn rounding_and_unary_helpers() {
        let host = HeapHost(RefCell::new(Heap::new()));
        let math = math_object(&host).unwrap();
        assert_eq!(call(&host, math, "round", &[Value::from(2.5)]), Value::from(3));
        assert_eq!(call(&host, math, "round", &[Value::from(-2.5)]), Value::from(-2));
        assert_eq!(call(&host, math, "round", &[Value::from(-2.6)]), Value::from(-3));
        // The largest double below one half.
        assert_eq!(
            call(&host, math, "round", &[Value::from(0.49999999999999994)]),
            Value::from(0)
        );
        assert_eq!(call(&host, math, "abs", &[Value::from(-4)]), Value::from(4));
        assert_eq!(call(&host, math, "pow", &[Value::from(2), Value::from(10)]), Value::from(1024));
    }
}
