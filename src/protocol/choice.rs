//! Choice lists and their normalization.
//!
//! Boxes accept choice lists (`options`, `actions`, page `menu`/`nav`) in
//! several loose shapes. Everything is converted into one canonical ordered
//! `Vec<Choice>` here, before any resolution logic looks at it.
//!
//! # Accepted Shapes
//!
//! ```text
//! ["a", "b", 3]                    bare primitives
//! [["Apple", "a"], ["Banana", 2]]  [text, value] pairs
//! [{"value": "a", "text": "A"}]    choice objects (nested `options` allowed)
//! "a b c"                          whitespace-separated words
//! {"Apple": "a", "Banana": 2}      text -> value mapping, in received order
//! ```
//!
//! Malformed entries are skipped with a warning. They never fail the box.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use super::value::{is_falsy, Value};

/// One entry of a choice list.
///
/// A choice with non-empty `options` is a group header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    /// The value captured when this choice is picked.
    pub value: Value,
    /// Display text. Defaults to the value's text.
    pub text: String,
    /// Icon name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Secondary text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Pre-selection flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    /// Nested choices; non-empty for group headers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Choice>,
}

impl Choice {
    /// Create a plain choice.
    pub fn new(value: impl Into<Value>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
            icon: None,
            caption: None,
            selected: None,
            options: Vec::new(),
        }
    }

    /// Create a choice whose text is the value's own text.
    pub fn from_value(value: Value) -> Self {
        let text = value.to_string();
        Self::new(value, text)
    }

    /// Create a choice from wire text, falling back to the value's text when
    /// the wire text is empty.
    fn labelled(value: Value, text: &str) -> Self {
        if text.is_empty() {
            Self::from_value(value)
        } else {
            Self::new(value, text)
        }
    }

    /// Whether this choice heads a group of nested choices.
    #[must_use]
    pub fn is_group(&self) -> bool {
        !self.options.is_empty()
    }

    /// Whether this choice is flagged as selected.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected == Some(true)
    }
}

/// Normalize a raw choice list into canonical form.
///
/// Normalizing an already-normalized (and serialized) list yields the same
/// list.
pub fn normalize_options(raw: &JsonValue) -> Vec<Choice> {
    if is_falsy(raw) {
        return Vec::new();
    }

    match raw {
        JsonValue::Array(items) => items.iter().filter_map(normalize_entry).collect(),
        JsonValue::String(s) => s
            .split_whitespace()
            .map(|word| Choice::new(word, word))
            .collect(),
        JsonValue::Object(map) => map
            .iter()
            .filter_map(|(text, value)| match Value::from_json(value) {
                Some(value) => Some(Choice::labelled(value, text)),
                None => {
                    warn!(
                        "Invalid choice value in dictionary for '{}'. Want a primitive, got {}",
                        text, value
                    );
                    None
                }
            })
            .collect(),
        other => {
            warn!(
                "Invalid choice list. Want string, array or dictionary, got {}",
                other
            );
            Vec::new()
        }
    }
}

/// Normalize an optional choice list; absence means an empty list.
pub fn normalize_optional(raw: Option<&JsonValue>) -> Vec<Choice> {
    raw.map(normalize_options).unwrap_or_default()
}

fn normalize_entry(entry: &JsonValue) -> Option<Choice> {
    if let Some(value) = Value::from_json(entry) {
        return Some(Choice::from_value(value));
    }

    match entry {
        JsonValue::Array(pair) => {
            if let [JsonValue::String(text), value] = pair.as_slice()
                && let Some(value) = Value::from_json(value)
            {
                return Some(Choice::labelled(value, text));
            }
            warn!("Invalid choice pair. Want [string, primitive], got {}", entry);
            None
        }
        JsonValue::Object(fields) => normalize_object(fields, entry),
        _ => {
            warn!("Invalid choice entry, got {}", entry);
            None
        }
    }
}

fn normalize_object(fields: &Map<String, JsonValue>, entry: &JsonValue) -> Option<Choice> {
    let Some(value) = fields.get("value").and_then(Value::from_json) else {
        warn!("Invalid choice object. Want a primitive 'value', got {}", entry);
        return None;
    };

    let text = fields.get("text").and_then(JsonValue::as_str).unwrap_or_default();
    let Choice { value, text, .. } = Choice::labelled(value, text);

    Some(Choice {
        value,
        text,
        icon: string_field(fields, "icon"),
        caption: string_field(fields, "caption"),
        selected: fields
            .get("selected")
            .filter(|s| !s.is_null())
            .map(|s| !is_falsy(s)),
        options: normalize_optional(fields.get("options")),
    })
}

fn string_field(fields: &Map<String, JsonValue>, key: &str) -> Option<String> {
    fields.get(key).and_then(JsonValue::as_str).map(str::to_string)
}
