//! Per-column input/output converters referenced from table definitions.

use crate::value::Value;

/// Numeric column. Empty or non-numeric text becomes NULL; integral text
/// stays an integer, anything else a real.
pub fn integer(raw: &str) -> Value {
    let t = raw.trim();
    if t.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = t.parse::<i64>() {
        return Value::Integer(i);
    }
    real(t)
}

pub fn real(raw: &str) -> Value {
    match raw.trim().parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Real(f),
        _ => Value::Null,
    }
}

/// `H:MM:SS` → seconds since midnight. Hours may exceed 24 for trips
/// running past midnight; missing components count as zero. Values that
/// do not fit in an `i64` are NULL.
pub fn time_of_day(raw: &str) -> Value {
    let t = raw.trim();
    if t.is_empty() {
        return Value::Null;
    }
    let mut total = 0i64;
    for (part, unit) in t.split(':').zip([3_600i64, 60, 1]) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let next = part
            .parse::<i64>()
            .ok()
            .and_then(|n| n.checked_mul(unit))
            .and_then(|v| total.checked_add(v));
        match next {
            Some(t) => total = t,
            None => return Value::Null,
        }
    }
    Value::Integer(total)
}

/// Seconds since midnight → zero-padded `HH:MM:SS`.
pub fn format_time_of_day(value: &Value) -> String {
    match value.as_i64() {
        Some(secs) => format!(
            "{:02}:{:02}:{:02}",
            secs / 3_600,
            (secs % 3_600) / 60,
            secs % 60
        ),
        None => value.render(),
    }
}
