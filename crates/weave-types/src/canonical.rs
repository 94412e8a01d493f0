//! Canonical JSON serialization (RFC 8785 semantics).
//!
//! The canonical form is the preimage of every link hash, so it must be
//! byte-identical across backends and across runs:
//!
//! - object keys sorted lexicographically by code point
//! - no insignificant whitespace
//! - strings escaped minimally per RFC 8259
//! - numbers in canonical form: integers without a trailing `.0`, `-0`
//!   normalized to `0`
//!
//! A language-default JSON writer guarantees none of this, which is why the
//! writer here is explicit.

use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;

/// Serialize a value to its canonical JSON byte form.
pub fn to_canonical_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, ValidationError> {
    let value =
        serde_json::to_value(value).map_err(|e| ValidationError::Serialization(e.to_string()))?;
    let mut out = Vec::new();
    write_value(&mut out, &value);
    Ok(out)
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // Sort explicitly rather than relying on the map's iteration
            // order, which depends on serde_json feature flags.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(out, key);
                out.push(b':');
                write_value(out, &map[*key]);
            }
            out.push(b'}');
        }
    }
}

fn write_number(out: &mut Vec<u8>, n: &serde_json::Number) {
    if let Some(i) = n.as_i64() {
        out.extend_from_slice(i.to_string().as_bytes());
    } else if let Some(u) = n.as_u64() {
        out.extend_from_slice(u.to_string().as_bytes());
    } else if let Some(f) = n.as_f64() {
        // 2^53 bounds the range where f64 represents integers exactly.
        if f == 0.0 {
            out.push(b'0');
        } else if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
            out.extend_from_slice((f as i64).to_string().as_bytes());
        } else {
            out.extend_from_slice(n.to_string().as_bytes());
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\x08' => out.extend_from_slice(b"\\b"),
            '\x09' => out.extend_from_slice(b"\\t"),
            '\x0a' => out.extend_from_slice(b"\\n"),
            '\x0c' => out.extend_from_slice(b"\\f"),
            '\x0d' => out.extend_from_slice(b"\\r"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical_str(value: &Value) -> String {
        String::from_utf8(to_canonical_vec(value).unwrap()).unwrap()
    }

    #[test]
    fn keys_are_sorted() {
        let value = json!({"b": 1, "a": 2, "aa": 3});
        assert_eq!(canonical_str(&value), r#"{"a":2,"aa":3,"b":1}"#);
    }

    #[test]
    fn no_insignificant_whitespace() {
        let value: Value = serde_json::from_str("{ \"a\" : [ 1 , 2 ] }").unwrap();
        assert_eq!(canonical_str(&value), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn stable_under_key_reordering() {
        let a: Value = serde_json::from_str(r#"{"x":1,"y":{"b":2,"a":3}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y":{"a":3,"b":2},"x":1}"#).unwrap();
        assert_eq!(to_canonical_vec(&a).unwrap(), to_canonical_vec(&b).unwrap());
    }

    #[test]
    fn integral_floats_lose_the_fraction() {
        let value = json!({"n": 1.0});
        assert_eq!(canonical_str(&value), r#"{"n":1}"#);
    }

    #[test]
    fn negative_zero_normalizes() {
        let value = json!({"n": -0.0});
        assert_eq!(canonical_str(&value), r#"{"n":0}"#);
    }

    #[test]
    fn non_integral_floats_keep_shortest_form() {
        let value = json!({"n": 1.5});
        assert_eq!(canonical_str(&value), r#"{"n":1.5}"#);
    }

    #[test]
    fn strings_escape_minimally() {
        let value = json!("a\"b\\c\nd\u{1}");
        assert_eq!(canonical_str(&value), "\"a\\\"b\\\\c\\nd\\u0001\"");
    }

    #[test]
    fn unicode_passes_through() {
        let value = json!("héllo ☃");
        assert_eq!(canonical_str(&value), "\"héllo ☃\"");
    }

    #[test]
    fn scalars() {
        assert_eq!(canonical_str(&json!(null)), "null");
        assert_eq!(canonical_str(&json!(true)), "true");
        assert_eq!(canonical_str(&json!(-42)), "-42");
    }
}
