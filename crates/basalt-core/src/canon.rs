//! Module: canon
//! Responsibility: the canonical JSON text form used for fingerprinting.
//! Does not own: the hash function (hash.rs) or envelope layout (snapshot).
//!
//! Invariants:
//! - Object keys are ordered by UTF-8 byte comparison at every level.
//! - No insignificant whitespace.
//! - Numbers are re-rendered: integral values in the exact range print as
//!   plain decimals, everything else prints in upper-case exponent form
//!   whose mantissa always carries a fraction part (`1.0E-5`), with no `+`
//!   sign and no leading exponent zeros.

use serde_json::Value as JsonValue;
use std::fmt::Write;

// Largest magnitude at which every integer is exactly representable in f64.
const MAX_EXACT_INTEGRAL: f64 = 9_007_199_254_740_992.0; // 2^53

/// Render a JSON document in canonical text form.
#[must_use]
pub fn to_canonical_string(value: &JsonValue) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Null => out.push_str("null"),
        JsonValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        JsonValue::Number(n) => write_number(n, out),
        JsonValue::String(s) => write_string(s, out),
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        JsonValue::Object(map) => {
            let mut keys = map.keys().collect::<Vec<_>>();
            keys.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                // Key came from the map; the entry must exist.
                if let Some(entry) = map.get(key) {
                    write_value(entry, out);
                }
            }
            out.push('}');
        }
    }
}

// serde_json's string escaping is deterministic and minimal; reuse it.
fn write_string(s: &str, out: &mut String) {
    match serde_json::to_string(s) {
        Ok(escaped) => out.push_str(&escaped),
        // String serialization cannot fail; keep the writer total anyway.
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}

fn write_number(n: &serde_json::Number, out: &mut String) {
    if let Some(u) = n.as_u64() {
        let _ = write!(out, "{u}");
    } else if let Some(i) = n.as_i64() {
        let _ = write!(out, "{i}");
    } else if let Some(f) = n.as_f64() {
        write_f64(f, out);
    } else {
        // Unreachable with default serde_json features.
        let _ = write!(out, "{n}");
    }
}

// Canonical float rendering. Integral values within the exact f64 range
// collapse to plain decimals so `1.0` and `1` fingerprint identically.
// Everything else uses the shortest exponent form with the exponent's
// leading zeros stripped and a mantissa that always keeps its fraction
// part: `1.0E-05` canonicalizes to `1.0E-5`, never `1E-5`.
fn write_f64(f: f64, out: &mut String) {
    if f == 0.0 {
        // Collapse -0.0 as well.
        out.push('0');
        return;
    }
    if f.fract() == 0.0 && f.abs() <= MAX_EXACT_INTEGRAL {
        let _ = write!(out, "{f:.0}");
        return;
    }

    let mut repr = format!("{f:E}");
    if let Some(exp_at) = repr.find('E')
        && !repr[..exp_at].contains('.')
    {
        repr.insert_str(exp_at, ".0");
    }
    out.push_str(&repr);
}

///
/// TESTS
///
