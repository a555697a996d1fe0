//! Loose, type-coercing operators.
//!
//! Query expressions follow scripting-language semantics: `"3" == 3` holds,
//! `"a" + 1` concatenates, `null` counts as `0` in arithmetic and comparison.
//! Every operator the compiler emits (and every constant it folds) goes
//! through these functions so folded and dynamic evaluation agree.

use crate::value::Value;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use core::cmp::Ordering;

/// Returns the truthiness of a value.
///
/// `null`, `false`, `0`, `NaN` and the empty string are falsy; every container
/// is truthy, including empty ones.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) | Value::Record(_) | Value::Collection(_) => true,
    }
}

/// Converts a value to a number.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => parse_number(s),
        Value::Array(_) | Value::Collection(_) => parse_number(&to_string(value)),
        Value::Object(_) | Value::Record(_) => f64::NAN,
    }
}

fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    // Rust accepts "inf" and "nan" spellings that scripts do not.
    if text.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

/// Formats a number the way it renders when coerced to a string.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format_finite(n)
    }
}

/// Lays out the shortest round-trip digits of `n`: plain notation while the
/// decimal exponent is in `-7..21`, `1.5e+21` style outside it.
fn format_finite(n: f64) -> String {
    let sci = format!("{:e}", n.abs());
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return format!("{}", n);
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let count = digits.len() as i32;
    // Position of the decimal point relative to the first digit.
    let point = exponent.parse::<i32>().unwrap_or(0) + 1;

    let mut out = String::new();
    if n < 0.0 {
        out.push('-');
    }
    if count <= point && point <= 21 {
        out.push_str(&digits);
        out.extend(core::iter::repeat('0').take((point - count) as usize));
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    } else if -6 < point && point <= 0 {
        out.push_str("0.");
        out.extend(core::iter::repeat('0').take((-point) as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        let exp = point - 1;
        out.push('e');
        out.push(if exp < 0 { '-' } else { '+' });
        out.push_str(&exp.abs().to_string());
    }
    out
}

/// Converts a value to its string form.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.to_string(),
        Value::Array(items) => join(items.iter().cloned()),
        Value::Collection(items) => join(items.to_vec()),
        Value::Object(_) | Value::Record(_) => "[object Object]".to_string(),
    }
}

fn join(items: impl IntoIterator<Item = Value>) -> String {
    let mut out = String::new();
    for (idx, item) in items.into_iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        if !item.is_null() {
            out.push_str(&to_string(&item));
        }
    }
    out
}

/// Reduces containers to their string form; primitives are returned as-is.
pub fn to_primitive(value: &Value) -> Value {
    if value.kind().is_container() {
        Value::String(Rc::from(to_string(value)))
    } else {
        value.clone()
    }
}

fn same_identity(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        (Value::Record(x), Value::Record(y)) => x.id() == y.id(),
        (Value::Collection(x), Value::Collection(y)) => x.id() == y.id(),
        _ => false,
    }
}

/// Type-coercing equality (`==`).
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(_), _) => loose_eq(&Value::Number(to_number(a)), b),
        (_, Value::Bool(_)) => loose_eq(a, &Value::Number(to_number(b))),
        (Value::Number(x), Value::String(_)) => *x == to_number(b),
        (Value::String(_), Value::Number(y)) => to_number(a) == *y,
        _ => {
            let a_container = a.kind().is_container();
            let b_container = b.kind().is_container();
            match (a_container, b_container) {
                (true, true) => same_identity(a, b),
                (true, false) => loose_eq(&to_primitive(a), b),
                (false, true) => loose_eq(a, &to_primitive(b)),
                (false, false) => false,
            }
        }
    }
}

/// Strict equality (`===`): same kind and same value, containers by identity.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        _ => same_identity(a, b),
    }
}

/// Relational comparison. Two strings compare lexicographically, everything
/// else numerically. Returns `None` when either side is NaN.
pub fn loose_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    let a = to_primitive(a);
    let b = to_primitive(b);
    if let (Value::String(x), Value::String(y)) = (&a, &b) {
        return Some(x.as_ref().cmp(y.as_ref()));
    }
    to_number(&a).partial_cmp(&to_number(&b))
}

/// `a > b`
pub fn gt(a: &Value, b: &Value) -> bool {
    loose_cmp(a, b) == Some(Ordering::Greater)
}

/// `a >= b`
pub fn gte(a: &Value, b: &Value) -> bool {
    matches!(loose_cmp(a, b), Some(Ordering::Greater | Ordering::Equal))
}

/// `a < b`
pub fn lt(a: &Value, b: &Value) -> bool {
    loose_cmp(a, b) == Some(Ordering::Less)
}

/// `a <= b`
pub fn lte(a: &Value, b: &Value) -> bool {
    matches!(loose_cmp(a, b), Some(Ordering::Less | Ordering::Equal))
}

/// `a + b`: concatenates when either primitive is a string, adds otherwise.
pub fn add(a: &Value, b: &Value) -> Value {
    let a = to_primitive(a);
    let b = to_primitive(b);
    match (&a, &b) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            let mut out = to_string(&a);
            out.push_str(&to_string(&b));
            Value::from(out)
        }
        _ => Value::Number(to_number(&a) + to_number(&b)),
    }
}

/// `a - b`
pub fn sub(a: &Value, b: &Value) -> Value {
    Value::Number(to_number(a) - to_number(b))
}

/// `a * b`
pub fn mul(a: &Value, b: &Value) -> Value {
    Value::Number(to_number(a) * to_number(b))
}

/// `a / b`
pub fn div(a: &Value, b: &Value) -> Value {
    Value::Number(to_number(a) / to_number(b))
}

/// `a % b`, with the sign of the dividend.
pub fn rem(a: &Value, b: &Value) -> Value {
    Value::Number(libm::fmod(to_number(a), to_number(b)))
}

/// Unary minus.
pub fn neg(a: &Value) -> Value {
    Value::Number(-to_number(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::FieldMap;
    use alloc::vec::Vec;

    #[test]
    fn test_truthy() {
        assert!(!truthy(&Value::Null));
        assert!(!truthy(&Value::from(0)));
        assert!(!truthy(&Value::Number(f64::NAN)));
        assert!(!truthy(&Value::from("")));
        assert!(truthy(&Value::from("0")));
        assert!(truthy(&Value::array(Vec::<Value>::new())));
        assert!(truthy(&Value::from(-1)));
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(&Value::from(" 42 ")), 42.0);
        assert_eq!(to_number(&Value::from("")), 0.0);
        assert_eq!(to_number(&Value::from("0x1f")), 31.0);
        assert_eq!(to_number(&Value::from("1e3")), 1000.0);
        assert_eq!(to_number(&Value::from("-Infinity")), f64::NEG_INFINITY);
        assert!(to_number(&Value::from("inf")).is_nan());
        assert!(to_number(&Value::from("nan")).is_nan());
        assert!(to_number(&Value::from("12abc")).is_nan());
        assert_eq!(to_number(&Value::Null), 0.0);
        assert_eq!(to_number(&Value::Bool(true)), 1.0);
        assert_eq!(to_number(&Value::array([5])), 5.0);
        assert_eq!(to_number(&Value::array(Vec::<Value>::new())), 0.0);
        assert!(to_number(&Value::Object(Rc::new(FieldMap::new()))).is_nan());
    }

    #[test]
    fn test_to_string() {
        assert_eq!(to_string(&Value::from(3)), "3");
        assert_eq!(to_string(&Value::from(2.5)), "2.5");
        assert_eq!(to_string(&Value::Number(-0.0)), "0");
        assert_eq!(to_string(&Value::Number(f64::NAN)), "NaN");
        assert_eq!(to_string(&Value::Number(f64::INFINITY)), "Infinity");
        assert_eq!(to_string(&Value::from(100)), "100");
        assert_eq!(to_string(&Value::from(-123.456)), "-123.456");
        assert_eq!(to_string(&Value::from(1e20)), "100000000000000000000");
        assert_eq!(to_string(&Value::from(1e21)), "1e+21");
        assert_eq!(to_string(&Value::from(1.5e300)), "1.5e+300");
        assert_eq!(to_string(&Value::from(0.000001)), "0.000001");
        assert_eq!(to_string(&Value::from(1e-7)), "1e-7");
        assert_eq!(to_string(&Value::from(-2.5e-8)), "-2.5e-8");
        assert_eq!(to_string(&Value::Null), "null");
        assert_eq!(
            to_string(&Value::array([Value::from(1), Value::Null, Value::from("x")])),
            "1,,x"
        );
        assert_eq!(to_string(&Value::object([("a", 1)])), "[object Object]");
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&Value::from("3"), &Value::from(3)));
        assert!(loose_eq(&Value::Bool(true), &Value::from(1)));
        assert!(loose_eq(&Value::Bool(false), &Value::from("")));
        assert!(loose_eq(&Value::Null, &Value::Null));
        assert!(!loose_eq(&Value::Null, &Value::from(0)));
        assert!(!loose_eq(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(loose_eq(&Value::array([1, 2]), &Value::from("1,2")));
        assert!(!loose_eq(&Value::array([1]), &Value::array([1])));

        let shared = Value::array([1]);
        assert!(loose_eq(&shared, &shared.clone()));
    }

    #[test]
    fn test_strict_eq() {
        assert!(strict_eq(&Value::from(1), &Value::from(1.0)));
        assert!(!strict_eq(&Value::from("1"), &Value::from(1)));
        assert!(strict_eq(&Value::Number(0.0), &Value::Number(-0.0)));
        assert!(!strict_eq(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
    }

    #[test]
    fn test_comparison() {
        assert!(gt(&Value::from(3), &Value::from(2)));
        assert!(gt(&Value::from("10"), &Value::from(9)));
        assert!(lt(&Value::from("10"), &Value::from("9")));
        assert!(gte(&Value::from(2), &Value::from("2")));
        assert!(lte(&Value::Null, &Value::from(0)));
        assert!(!gt(&Value::Number(f64::NAN), &Value::from(0)));
        assert!(!lte(&Value::from("abc"), &Value::from(1)));
        assert_eq!(loose_cmp(&Value::from("x"), &Value::from(1)), None);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(add(&Value::from(1), &Value::from(2)), Value::from(3));
        assert_eq!(add(&Value::from("a"), &Value::from(1)), Value::from("a1"));
        assert_eq!(add(&Value::from("n="), &Value::from(1e21)), Value::from("n=1e+21"));
        assert_eq!(add(&Value::from(1), &Value::Null), Value::from(1));
        assert_eq!(add(&Value::array([1, 2]), &Value::from(3)), Value::from("1,23"));
        assert_eq!(sub(&Value::from("5"), &Value::from(2)), Value::from(3));
        assert_eq!(mul(&Value::from(2), &Value::Bool(true)), Value::from(2));
        assert_eq!(div(&Value::from(1), &Value::from(0)), Value::Number(f64::INFINITY));
        assert_eq!(rem(&Value::from(-7), &Value::from(3)), Value::from(-1));
        assert_eq!(neg(&Value::from("4")), Value::from(-4));
    }
}
