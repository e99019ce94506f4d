use serde_json::Value;

/// Message shown when a failure carries nothing readable.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Keys drained before the remaining fields, in this order.
const PRIORITY_KEYS: &[&str] = &[
    "detail",
    "errors",
    "new_password",
    "password",
    "non_field_errors",
    "uid",
    "token",
];

/// Server-supplied failure description.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ErrorPayload {
    #[default]
    Empty,
    Text(String),
    List(Vec<String>),
    /// Field name to messages, in the order the server sent them.
    Fields(Vec<(String, Vec<String>)>),
}

impl ErrorPayload {
    /// Builds a payload from a decoded JSON body.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ErrorPayload::Empty,
            Value::String(text) => ErrorPayload::Text(text.clone()),
            Value::Array(items) => {
                let mut messages = Vec::new();
                for item in items {
                    collect_messages(item, &mut messages);
                }
                ErrorPayload::List(messages)
            }
            Value::Object(map) => ErrorPayload::Fields(
                map.iter()
                    .map(|(key, value)| {
                        let mut messages = Vec::new();
                        collect_messages(value, &mut messages);
                        (key.clone(), messages)
                    })
                    .collect(),
            ),
            Value::Bool(_) | Value::Number(_) => {
                let mut messages = Vec::new();
                collect_messages(value, &mut messages);
                messages
                    .pop()
                    .map(ErrorPayload::Text)
                    .unwrap_or(ErrorPayload::Empty)
            }
        }
    }

    /// Builds a payload from a raw response body: JSON when it parses, the text otherwise.
    pub fn from_body(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return ErrorPayload::Empty;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => ErrorPayload::from_json(&value),
            Err(_) => ErrorPayload::Text(raw.to_string()),
        }
    }
}

/// Reduces any payload to one non-empty display string.
pub fn normalize_error(payload: &ErrorPayload) -> String {
    let joined = match payload {
        ErrorPayload::Empty => String::new(),
        ErrorPayload::Text(text) => text.clone(),
        ErrorPayload::List(items) => items.join("\n"),
        ErrorPayload::Fields(fields) => {
            let mut buckets: Vec<&str> = Vec::new();
            let mut consumed = vec![false; fields.len()];
            for key in PRIORITY_KEYS {
                for (index, (name, messages)) in fields.iter().enumerate() {
                    if !consumed[index] && name == key {
                        consumed[index] = true;
                        buckets.extend(messages.iter().map(String::as_str));
                    }
                }
            }
            for (index, (_, messages)) in fields.iter().enumerate() {
                if !consumed[index] {
                    buckets.extend(messages.iter().map(String::as_str));
                }
            }
            buckets.join("\n")
        }
    };

    if joined.is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        joined
    }
}

// Falsy scalars (null, false, 0, "") carry no message.
fn collect_messages(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null | Value::Bool(false) => {}
        Value::Bool(true) => out.push("true".to_string()),
        Value::Number(number) => {
            if number.as_f64() != Some(0.0) {
                out.push(number.to_string());
            }
        }
        Value::String(text) => {
            if !text.is_empty() {
                out.push(text.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_messages(item, out);
            }
        }
        Value::Object(map) => {
            for nested in map.values() {
                collect_messages(nested, out);
            }
        }
    }
}
