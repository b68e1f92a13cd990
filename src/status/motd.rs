use serde_json::Value;

const FORMAT_MARKER: char = '§';

/// Plain text of a server description, which is either a bare string
/// or a chat component tree. Colour/style codes are dropped.
pub fn clean(description: &Value) -> String {
    let mut raw = String::new();
    flatten(description, &mut raw);

    strip_codes(&raw)
}

fn flatten(component: &Value, out: &mut String) {
    match component {
        Value::String(s) => out.push_str(s),
        Value::Array(parts) => {
            for part in parts {
                flatten(part, out);
            }
        }
        Value::Object(obj) => {
            match (obj.get("text"), obj.get("translate")) {
                (Some(text), _) => flatten(text, out),
                (None, Some(Value::String(key))) => out.push_str(key),
                _ => {}
            }
            if let Some(extra) = obj.get("extra") {
                flatten(extra, out);
            }
        }
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(_) | Value::Null => {}
    }
}

fn strip_codes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == FORMAT_MARKER {
            chars.next();
        } else {
            out.push(c);
        }
    }

    out
}
