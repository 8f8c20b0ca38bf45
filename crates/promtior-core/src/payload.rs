//! Reply normalization
//!
//! The RAG endpoint does not return a uniform shape: depending on how the
//! chain was deployed the reply may be a bare string, a LangServe envelope
//! (`{"output": ...}`), a failure object, an `answer` object, a message-like
//! object with `content`, or anything else. [`ResponsePayload::classify`]
//! turns the raw JSON into a tagged variant by checking the shapes in a fixed
//! precedence order, and [`ResponsePayload::into_text`] renders it for the
//! chat pane.
//!
//! Truthiness and string conversion follow browser JavaScript semantics so
//! the terminal client shows exactly what the web widget shows for the same
//! reply.

use serde_json::{Map, Value};

/// Shown when the reply (or its `output`) is empty.
pub const EMPTY_RESPONSE_TEXT: &str = "Respuesta vacía del servidor.";

#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    Empty,
    Text(String),
    /// `{ "ok": false, "message"?, "context"? }`
    Failure {
        message: Option<String>,
        context: Option<String>,
        raw: Value,
    },
    Answer(String),
    Content(Content),
    /// No recognized shape; dumped as pretty JSON.
    Opaque(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Items(Vec<String>),
    Other(Value),
}

impl ResponsePayload {
    /// Classify a parsed reply body. The order of the checks matters: a
    /// payload can match several shapes and the first one wins.
    pub fn classify(parsed: Value) -> Self {
        let payload = unwrap_output(parsed);

        if !is_truthy(&payload) {
            return ResponsePayload::Empty;
        }

        let map = match payload {
            Value::String(text) => return ResponsePayload::Text(text),
            Value::Object(map) => map,
            other => return ResponsePayload::Opaque(other),
        };

        if map.get("ok") == Some(&Value::Bool(false)) {
            return ResponsePayload::Failure {
                message: map.get("message").filter(|v| is_truthy(v)).map(js_to_string),
                context: map.get("context").filter(|v| is_truthy(v)).map(js_to_string),
                raw: Value::Object(map),
            };
        }

        if let Some(answer) = map.get("answer").filter(|v| is_truthy(v)) {
            return ResponsePayload::Answer(js_to_string(answer));
        }

        if let Some(content) = map.get("content").filter(|v| is_truthy(v)) {
            let content = match content {
                Value::Array(items) => Content::Items(items.iter().map(content_item_text).collect()),
                Value::String(text) => Content::Text(text.clone()),
                other => Content::Other(other.clone()),
            };
            return ResponsePayload::Content(content);
        }

        ResponsePayload::Opaque(Value::Object(map))
    }

    /// Render the payload as the text of a bot message.
    pub fn into_text(self) -> String {
        match self {
            ResponsePayload::Empty => EMPTY_RESPONSE_TEXT.to_string(),
            ResponsePayload::Text(text) | ResponsePayload::Answer(text) => text,
            ResponsePayload::Failure {
                message,
                context,
                raw,
            } => {
                let mut text = message.map(|m| m + "\n\n").unwrap_or_default();
                text.push_str(&context.unwrap_or_else(|| js_json(&raw).to_string()));
                text
            }
            ResponsePayload::Content(Content::Items(items)) => items.join("\n"),
            ResponsePayload::Content(Content::Text(text)) => text,
            ResponsePayload::Content(Content::Other(value)) => js_json(&value).to_string(),
            ResponsePayload::Opaque(value) => {
                let value = js_json(&value);
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Classify and render a parsed reply in one step.
pub fn normalize(parsed: Value) -> String {
    ResponsePayload::classify(parsed).into_text()
}

fn unwrap_output(parsed: Value) -> Value {
    match parsed {
        Value::Object(mut map) => match map.remove("output") {
            Some(output) => output,
            None => Value::Object(map),
        },
        other => other,
    }
}

fn content_item_text(item: &Value) -> String {
    match item {
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("text") {
            Some(Value::Null) | None => String::new(),
            Some(text) => js_to_string(text),
        },
        _ => String::new(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// 2^53, the end of the range where every integer is an exact double.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Rebuild a value so serde_json prints it like `JSON.stringify`: integral
/// floats lose their `.0` and integer-like object keys come first in
/// ascending order, ahead of the other keys in insertion order.
fn js_json(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => Value::from(f as i64),
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(js_json).collect()),
        Value::Object(map) => {
            let mut indexed: Vec<(u32, &str)> = map
                .keys()
                .filter_map(|key| array_index(key).map(|i| (i, key.as_str())))
                .collect();
            indexed.sort_unstable_by_key(|(i, _)| *i);

            let mut out = Map::with_capacity(map.len());
            for (_, key) in indexed {
                out.insert(key.to_string(), js_json(&map[key]));
            }
            for (key, item) in map {
                if array_index(key).is_none() {
                    out.insert(key.clone(), js_json(item));
                }
            }
            Value::Object(out)
        }
        _ => value.clone(),
    }
}

/// Canonical array index: decimal digits, no leading zero, below 2^32 - 1.
fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse::<u32>().ok().filter(|&i| i != u32::MAX)
}

/// String conversion as done by `String(value)` in a browser.
fn js_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_f64() {
                let f = n.as_f64().unwrap_or_default();
                if f == 0.0 {
                    "0".to_string()
                } else if f.fract() == 0.0 && f.abs() < 1e21 {
                    format!("{:.0}", f)
                } else {
                    f.to_string()
                }
            } else {
                n.to_string()
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_string_is_unwrapped() {
        assert_eq!(normalize(json!({"output": "hello"})), "hello");
    }

    #[test]
    fn test_integral_float_dumped_without_fraction() {
        assert_eq!(normalize(json!({"output": {"score": 1.0}})), "{\n  \"score\": 1\n}");
        assert_eq!(normalize(json!({"ok": false, "n": 2.0})), r#"{"ok":false,"n":2}"#);
        assert_eq!(normalize(json!({"content": {"p": 0.5, "q": -3.0}})), r#"{"p":0.5,"q":-3}"#);
    }

    #[test]
    fn test_index_like_keys_dumped_first() {
        assert_eq!(
            normalize(json!({"ok": false, "b": 1, "10": 0, "2": 0, "01": 0})),
            r#"{"2":0,"10":0,"ok":false,"b":1,"01":0}"#
        );
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("007"), None);
        assert_eq!(array_index("4294967295"), None);
        assert_eq!(array_index("-1"), None);
    }

    #[test]
    fn test_bare_string() {
        assert_eq!(normalize(json!("hola")), "hola");
    }

    #[test]
    fn test_answer() {
        assert_eq!(normalize(json!({"output": {"answer": "42"}})), "42");
    }

    #[test]
    fn test_answer_without_envelope() {
        assert_eq!(normalize(json!({"answer": "directo"})), "directo");
    }

    #[test]
    fn test_failure_with_message_and_context() {
        let reply = json!({"output": {"ok": false, "message": "bad", "context": "ctx"}});
        assert_eq!(normalize(reply), "bad\n\nctx");
    }

    #[test]
    fn test_failure_without_context_dumps_compact_json() {
        let reply = json!({"output": {"ok": false, "message": "bad"}});
        assert_eq!(normalize(reply), "bad\n\n{\"ok\":false,\"message\":\"bad\"}");
    }

    #[test]
    fn test_failure_without_message() {
        let reply = json!({"ok": false, "context": "solo contexto"});
        assert_eq!(normalize(reply), "solo contexto");
    }

    #[test]
    fn test_failure_wins_over_answer() {
        let reply = json!({"ok": false, "answer": "ignored", "message": "m", "context": "c"});
        assert_eq!(normalize(reply), "m\n\nc");
    }

    #[test]
    fn test_ok_true_falls_through_to_answer() {
        let reply = json!({"ok": true, "answer": "sí"});
        assert_eq!(normalize(reply), "sí");
    }

    #[test]
    fn test_content_items_joined() {
        let reply = json!({"output": {"content": [{"text": "a"}, {"text": "b"}]}});
        assert_eq!(normalize(reply), "a\nb");
    }

    #[test]
    fn test_content_mixed_items() {
        let reply = json!({"content": ["plain", {"text": "obj"}, {"type": "image"}, null, 7, {"text": null}]});
        assert_eq!(normalize(reply), "plain\nobj\n\n\n\n");
    }

    #[test]
    fn test_content_string() {
        assert_eq!(normalize(json!({"output": {"content": "x"}})), "x");
    }

    #[test]
    fn test_content_other_is_compact_json() {
        let reply = json!({"content": {"b": 1, "a": 2}});
        assert_eq!(normalize(reply), "{\"b\":1,\"a\":2}");
    }

    #[test]
    fn test_empty_answer_falls_through_to_content() {
        let reply = json!({"answer": "", "content": "from content"});
        assert_eq!(normalize(reply), "from content");
    }

    #[test]
    fn test_null_output_is_empty_placeholder() {
        assert_eq!(normalize(json!({"output": null})), EMPTY_RESPONSE_TEXT);
    }

    #[test]
    fn test_falsy_values_are_empty_placeholder() {
        for reply in [json!(null), json!(""), json!(false), json!(0), json!({"output": ""})] {
            assert_eq!(normalize(reply), EMPTY_RESPONSE_TEXT);
        }
    }

    #[test]
    fn test_unrecognized_object_is_pretty_printed() {
        let reply = json!({"output": {"foo": 1, "bar": [true]}});
        assert_eq!(
            normalize(reply),
            "{\n  \"foo\": 1,\n  \"bar\": [\n    true\n  ]\n}"
        );
    }

    #[test]
    fn test_empty_object_and_array_are_opaque() {
        assert_eq!(normalize(json!({})), "{}");
        assert_eq!(normalize(json!([])), "[]");
    }

    #[test]
    fn test_output_key_only_checked_on_objects() {
        let reply = json!([{"output": "nested"}]);
        assert!(matches!(ResponsePayload::classify(reply), ResponsePayload::Opaque(_)));
    }

    #[test]
    fn test_non_string_answer_is_stringified_like_a_browser() {
        assert_eq!(normalize(json!({"answer": 42})), "42");
        assert_eq!(normalize(json!({"answer": 1.5})), "1.5");
        assert_eq!(normalize(json!({"answer": [1, null, "x"]})), "1,,x");
        assert_eq!(normalize(json!({"answer": {"nested": true}})), "[object Object]");
    }

    #[test]
    fn test_classify_variants() {
        assert_eq!(
            ResponsePayload::classify(json!({"output": {"content": ["a", "b"]}})),
            ResponsePayload::Content(Content::Items(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            ResponsePayload::classify(json!({"output": {"answer": "x"}})),
            ResponsePayload::Answer("x".into())
        );
        assert_eq!(ResponsePayload::classify(json!(null)), ResponsePayload::Empty);
    }
}
