//! Message template rendering.
//!
//! Success and error messages in a protocol are templates such as
//! `"item {id} not found"`. Rendering substitutes placeholders from the data a
//! handler passes to its emitter.
//!
//! # Placeholders
//! - `{key}`: field of an object
//! - `{0}`, `{1}`: element of an array
//! - `{}` / `{0}`: a scalar value
//! - `{{` and `}}`: literal braces
//!
//! Placeholders that cannot be resolved are left verbatim so a template bug
//! shows up in the message instead of silently disappearing.

use serde_json::Value;

/// Render `template` against optional interpolation data.
pub fn render(template: &str, data: Option<&Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    key.push(inner);
                }
                if !closed {
                    out.push('{');
                    out.push_str(&key);
                    continue;
                }
                match lookup(data, key.trim()) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(&key);
                        out.push('}');
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

fn lookup(data: Option<&Value>, key: &str) -> Option<String> {
    let value = match data? {
        Value::Object(map) => map.get(key)?,
        Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
        Value::Null => return None,
        scalar if key.is_empty() || key == "0" => scalar,
        _ => return None,
    };
    Some(display(value))
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
