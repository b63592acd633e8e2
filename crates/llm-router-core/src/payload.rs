//! Request/response payload model
//!
//! A payload is the JSON body travelling through the router. Stages never
//! mutate it in place: every rewrite builds a new value, so a caller holding
//! the input keeps seeing it unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,

    /// Optional name of the sender
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }
}

/// Which fields of a payload count as text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextScope {
    /// Every string anywhere in the structure, object keys included
    #[default]
    AllStrings,

    /// Only `messages[*].content`, either a string or a list of text parts
    MessageContents,
}

/// JSON payload passed through transform and gate pipelines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    /// Wrap an arbitrary JSON value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Build a `{"messages": [...]}` payload
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        let messages = messages
            .into_iter()
            .map(|m| serde_json::to_value(m).unwrap_or(Value::Null))
            .collect();
        let mut body = Map::new();
        body.insert("messages".to_string(), Value::Array(messages));
        Self(Value::Object(body))
    }

    /// Borrow the underlying JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the underlying JSON value
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Messages of the payload.
    ///
    /// Entries without a string `role` are skipped. Content given as a list
    /// of parts is flattened by joining its text parts with newlines.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let Some(items) = self.0.get("messages").and_then(Value::as_array) else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| {
                let role = item.get("role")?.as_str()?;
                let content = match item.get("content") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Array(parts)) => parts
                        .iter()
                        .filter_map(text_part)
                        .collect::<Vec<_>>()
                        .join("\n"),
                    _ => String::new(),
                };
                let mut message = ChatMessage::new(role, content);
                message.name = item
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Some(message)
            })
            .collect()
    }

    /// Text fields visible under `scope`, in document order
    pub fn text_fields(&self, scope: TextScope) -> Vec<&str> {
        let mut out = Vec::new();
        match scope {
            TextScope::AllStrings => collect_strings(&self.0, &mut out),
            TextScope::MessageContents => {
                for content in message_contents(&self.0) {
                    match content {
                        Value::String(s) => out.push(s.as_str()),
                        Value::Array(parts) => out.extend(parts.iter().filter_map(text_part)),
                        _ => {}
                    }
                }
            }
        }
        out
    }

    /// Rewrite every text field under `scope` and return the new payload.
    ///
    /// Each field is handed to `f` on its own; `self` is left untouched. Under
    /// [`TextScope::AllStrings`] two keys rewritten to the same string collapse
    /// into one entry (the later one in key order) and a warning is logged.
    pub fn map_text<F>(&self, scope: TextScope, mut f: F) -> Payload
    where
        F: FnMut(&str) -> String,
    {
        match scope {
            TextScope::AllStrings => Payload(map_strings(&self.0, &mut f)),
            TextScope::MessageContents => Payload(map_message_contents(&self.0, &mut f)),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        payload.0
    }
}

fn text_part(part: &Value) -> Option<&str> {
    if part.get("type").and_then(Value::as_str) != Some("text") {
        return None;
    }
    part.get("text").and_then(Value::as_str)
}

fn message_contents(value: &Value) -> impl Iterator<Item = &Value> {
    value
        .get("messages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|m| m.get("content"))
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => {
            for (k, v) in map {
                out.push(k);
                collect_strings(v, out);
            }
        }
        _ => {}
    }
}

fn map_strings<F>(value: &Value, f: &mut F) -> Value
where
    F: FnMut(&str) -> String,
{
    match value {
        Value::String(s) => Value::String(f(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| map_strings(v, f)).collect()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                let key = f(k);
                let val = map_strings(v, f);
                if out.insert(key, val).is_some() {
                    warn!(
                        keys = map.len(),
                        "Rewritten object keys collide, later entry replaces earlier one"
                    );
                }
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn map_message_contents<F>(value: &Value, f: &mut F) -> Value
where
    F: FnMut(&str) -> String,
{
    let mut out = value.clone();
    let Some(messages) = out.get_mut("messages").and_then(Value::as_array_mut) else {
        return out;
    };

    for message in messages {
        let Some(content) = message.get_mut("content") else {
            continue;
        };
        match content {
            Value::String(s) => *s = f(s),
            Value::Array(parts) => {
                for part in parts {
                    if part.get("type").and_then(Value::as_str) != Some("text") {
                        continue;
                    }
                    if let Some(Value::String(s)) = part.get_mut("text") {
                        *s = f(s);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upper(s: &str) -> String {
        s.to_uppercase()
    }

    #[test]
    fn test_from_messages_round_trip() {
        let payload = Payload::from_messages(vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
        ]);

        let messages = payload.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn test_all_strings_includes_keys() {
        let payload = Payload::new(json!({"name": "jan", "tags": ["a", {"k": "v"}], "n": 3}));
        let masked = payload.map_text(TextScope::AllStrings, upper);

        assert_eq!(
            masked.as_value(),
            &json!({"NAME": "JAN", "TAGS": ["A", {"K": "V"}], "N": 3})
        );
    }

    #[test]
    fn test_colliding_keys_keep_later_entry() {
        let payload = Payload::new(json!({"a@b.com": "first", "c@d.com": "second", "x": "y"}));
        let mask = |s: &str| {
            if s.contains('@') {
                "{{EMAIL}}".to_string()
            } else {
                s.to_string()
            }
        };

        let out = payload.map_text(TextScope::AllStrings, mask);
        let object = out.as_value().as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["{{EMAIL}}"], "second");
        assert_eq!(object["x"], "y");
    }

    #[test]
    fn test_map_text_leaves_input_untouched() {
        let payload = Payload::new(json!({"messages": [{"role": "user", "content": "abc"}]}));
        let masked = payload.map_text(TextScope::MessageContents, upper);

        assert_eq!(payload.as_value()["messages"][0]["content"], "abc");
        assert_eq!(masked.as_value()["messages"][0]["content"], "ABC");
    }

    #[test]
    fn test_message_contents_only_touches_content() {
        let payload = Payload::new(json!({
            "model": "gpt",
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "user", "content": [
                    {"type": "text", "text": "part"},
                    {"type": "image_url", "image_url": {"url": "x"}}
                ]}
            ]
        }));
        let masked = payload.map_text(TextScope::MessageContents, upper);
        let value = masked.as_value();

        assert_eq!(value["model"], "gpt");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "HI");
        assert_eq!(value["messages"][1]["content"][0]["text"], "PART");
        assert_eq!(value["messages"][1]["content"][1]["image_url"]["url"], "x");
    }

    #[test]
    fn test_text_fields_scopes() {
        let payload = Payload::new(json!({
            "messages": [{"role": "user", "content": "one"}],
            "extra": "two"
        }));

        assert_eq!(payload.text_fields(TextScope::MessageContents), vec!["one"]);

        let all = payload.text_fields(TextScope::AllStrings);
        assert!(all.contains(&"extra"));
        assert!(all.contains(&"two"));
        assert!(all.contains(&"role"));
    }

    #[test]
    fn test_messages_lenient_parse() {
        let payload = Payload::new(json!({
            "messages": [
                {"content": "no role"},
                {"role": "user", "content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]}
            ]
        }));

        let messages = payload.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "a\nb");
    }
}
