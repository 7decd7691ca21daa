//! Conversion between the store's `snake_case` field names and the
//! `camelCase` names used by the application types.
//!
//! Both directions walk the whole value: every object key is rewritten,
//! arrays keep their order and leaf values are never touched.

use serde_json::{Map, Value};

/// Keys holding raw credential material. These are written exactly as given,
/// never rewritten to `snake_case`.
pub const CREDENTIAL_KEYS: &[&str] = &["password", "passwordHash"];

/// Rewrites every key from `snake_case` to `camelCase`.
pub fn to_camel(value: Value) -> Value {
    map_keys(value, &|key| snake_to_camel(key))
}

/// Rewrites every key from `camelCase` to `snake_case` (credential keys
/// excepted).
pub fn to_snake(value: Value) -> Value {
    map_keys(value, &|key| {
        if CREDENTIAL_KEYS.contains(&key) {
            key.to_string()
        } else {
            camel_to_snake(key)
        }
    })
}

fn map_keys(value: Value, f: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (f(&key), map_keys(value, f)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| map_keys(v, f)).collect())
        }
        leaf => leaf,
    }
}

pub fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut leading = true;
    let mut pending_underscore = false;

    for c in key.chars() {
        if c == '_' {
            if leading {
                out.push('_');
            } else if pending_underscore {
                // `a__b` has no camel form, so the extra underscore stays
                out.push('_');
            } else {
                pending_underscore = true;
            }
            continue;
        }
        leading = false;

        if pending_underscore {
            pending_underscore = false;
            if c.is_ascii_lowercase() {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push('_');
                out.push(c);
            }
        } else {
            out.push(c);
        }
    }

    if pending_underscore {
        out.push('_');
    }

    out
}

pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
