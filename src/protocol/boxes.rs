//! Box tree nodes and their sanitization.
//!
//! Boxes arrive as loosely-typed JSON objects tagged by `t`. Sanitization runs
//! once per box, at decode time, and produces a [`FormBox`] whose typed fields
//! can be trusted by the resolver:
//!
//! ```text
//! raw JSON ──► tag check ──► typed fields ──► options/actions normalized
//!                  │                               │
//!                  │ unknown                       ▼
//!                  ▼                        range → min/max[/step[/precision]]
//!            text fallback                         │
//!                                                  ▼
//!                                       items sanitized recursively
//! ```
//!
//! Attributes the sanitizer does not know are kept in [`FormBox::extra`] and
//! written back verbatim on serialization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

use super::choice::{normalize_optional, Choice};
use super::value::{FieldValue, Value};

/// Wire tag of an input box.
pub const TAG_INPUT: u64 = 1;
/// Wire tag of an output box.
pub const TAG_OUTPUT: u64 = 3;

/// Whether a box collects a value or only displays content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u64")]
pub enum BoxKind {
    /// Interactive control.
    Input,
    /// Display-only content, possibly with nested items.
    Output,
}

impl From<BoxKind> for u64 {
    fn from(kind: BoxKind) -> Self {
        match kind {
            BoxKind::Input => TAG_INPUT,
            BoxKind::Output => TAG_OUTPUT,
        }
    }
}

/// Control mode requested by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Mode {
    Md,
    Button,
    Menu,
    Radio,
    Check,
    Text,
    Range,
    Number,
    Time,
    Date,
    Day,
    Week,
    Month,
    Tag,
    Color,
    Rating,
    /// Any other mode string, preserved verbatim.
    Other(String),
}

impl Mode {
    /// The wire name of this mode.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Mode::Md => "md",
            Mode::Button => "button",
            Mode::Menu => "menu",
            Mode::Radio => "radio",
            Mode::Check => "check",
            Mode::Text => "text",
            Mode::Range => "range",
            Mode::Number => "number",
            Mode::Time => "time",
            Mode::Date => "date",
            Mode::Day => "day",
            Mode::Week => "week",
            Mode::Month => "month",
            Mode::Tag => "tag",
            Mode::Color => "color",
            Mode::Rating => "rating",
            Mode::Other(s) => s,
        }
    }
}

impl From<&str> for Mode {
    fn from(s: &str) -> Self {
        match s {
            "md" => Mode::Md,
            "button" => Mode::Button,
            "menu" => Mode::Menu,
            "radio" => Mode::Radio,
            "check" => Mode::Check,
            "text" => Mode::Text,
            "range" => Mode::Range,
            "number" => Mode::Number,
            "time" => Mode::Time,
            "date" => Mode::Date,
            "day" => Mode::Day,
            "week" => Mode::Week,
            "month" => Mode::Month,
            "tag" => Mode::Tag,
            "color" => Mode::Color,
            "rating" => Mode::Rating,
            other => Mode::Other(other.to_string()),
        }
    }
}

impl From<String> for Mode {
    fn from(s: String) -> Self {
        Mode::from(s.as_str())
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of a box tree, after sanitization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonValue")]
pub struct FormBox {
    #[serde(rename = "t")]
    pub kind: BoxKind,
    /// Stable identity, generated when the wire omits it.
    pub xid: String,
    /// Capture slot requested by the wire; `-1` opts out of capture.
    pub index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Choice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Choice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<FormBox>,
    #[serde(skip_serializing_if = "is_false")]
    pub multiple: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub editable: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub password: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub inline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Layout hints and any other attribute not interpreted here.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FormBox {
    fn empty(kind: BoxKind, xid: String, index: i32) -> Self {
        Self {
            kind,
            xid,
            index,
            text: None,
            name: None,
            mode: None,
            value: None,
            min: None,
            max: None,
            step: None,
            precision: None,
            range: None,
            options: Vec::new(),
            actions: Vec::new(),
            items: Vec::new(),
            multiple: false,
            editable: false,
            required: false,
            password: false,
            inline: false,
            lines: None,
            mask: None,
            prefix: None,
            suffix: None,
            error: None,
            placeholder: None,
            icon: None,
            extra: Map::new(),
        }
    }

    /// A display-only text node standing in for something unrecognized.
    pub fn text_fallback(raw: &JsonValue) -> Self {
        let text = match raw {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        let mut node = Self::empty(BoxKind::Output, new_xid(), -1);
        node.text = Some(text);
        node
    }

    /// Sanitize a raw box.
    ///
    /// Never fails: anything that is not a tagged box object becomes a text
    /// fallback node.
    pub fn sanitize(raw: JsonValue) -> Self {
        let map = match raw {
            JsonValue::Object(map) => map,
            other => {
                warn!("Invalid box. Want an object, got {}", other);
                return Self::text_fallback(&other);
            }
        };

        let kind = match map.get("t").and_then(JsonValue::as_u64) {
            Some(TAG_INPUT) => BoxKind::Input,
            Some(TAG_OUTPUT) => BoxKind::Output,
            _ => {
                let raw = JsonValue::Object(map);
                warn!("Invalid box tag, got {}", raw);
                return Self::text_fallback(&raw);
            }
        };

        let mut fields = Fields(map);
        fields.0.remove("t");

        let xid = fields.string("xid").unwrap_or_else(new_xid);
        let index = fields.index();
        let mut node = Self::empty(kind, xid, index);

        node.text = fields.string("text");
        node.name = fields.string("name");
        node.icon = fields.string("icon");
        node.inline = fields.flag("inline");
        node.items = fields.items();

        if kind == BoxKind::Input {
            node.mode = fields.string("mode").map(Mode::from);
            node.value = fields.field_value("value");
            node.min = fields.value("min");
            node.max = fields.value("max");
            node.step = fields.number("step");
            node.precision = fields.count("precision");
            node.options = normalize_optional(fields.0.remove("options").as_ref());
            node.actions = normalize_optional(fields.0.remove("actions").as_ref());
            node.multiple = fields.flag("multiple");
            node.editable = fields.flag("editable");
            node.required = fields.flag("required");
            node.password = fields.flag("password");
            node.lines = fields.count("lines");
            node.mask = fields.string("mask");
            node.prefix = fields.string("prefix");
            node.suffix = fields.string("suffix");
            node.error = fields.string("error");
            node.placeholder = fields.string("placeholder");
            node.range = fields.range();
            node.apply_range();
        }

        node.extra = fields.0;
        node
    }

    /// Derive bounds from the `range` shorthand.
    fn apply_range(&mut self) {
        let Some(range) = self.range.clone() else {
            return;
        };

        match range.as_slice() {
            [lo, hi] if (lo.is_number() && hi.is_number()) || (lo.is_string() && hi.is_string()) => {
                self.min = Some(lo.clone());
                self.max = Some(hi.clone());
            }
            [lo, hi, rest @ ..]
                if (1..=2).contains(&rest.len()) && range.iter().all(Value::is_number) =>
            {
                self.min = Some(lo.clone());
                self.max = Some(hi.clone());
                self.step = rest.first().and_then(Value::as_f64);
                if let Some(precision) = rest.get(1).and_then(Value::as_f64) {
                    self.precision = as_count(precision);
                }
            }
            _ => warn!("Ignoring range of {} mixed or unsupported bounds", range.len()),
        }
    }

    /// Whether this box collects a value.
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.kind == BoxKind::Input
    }

    /// The scalar carried by `value`, if any.
    #[must_use]
    pub fn scalar(&self) -> Option<&Value> {
        self.value.as_ref().and_then(FieldValue::as_scalar)
    }
}

impl From<JsonValue> for FormBox {
    fn from(raw: JsonValue) -> Self {
        Self::sanitize(raw)
    }
}

fn new_xid() -> String {
    Uuid::new_v4().simple().to_string()
}

fn as_count(n: f64) -> Option<u32> {
    (n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX)).then_some(n as u32)
}

/// Raw attribute map with typed, warn-on-mismatch accessors.
///
/// Each accessor removes the key it reads; whatever is left over becomes
/// pass-through.
struct Fields(Map<String, JsonValue>);

impl Fields {
    fn take(&mut self, key: &str) -> Option<JsonValue> {
        self.0.remove(key).filter(|v| !v.is_null())
    }

    fn mismatch(key: &str, want: &str, got: &JsonValue) {
        warn!("Dropping box attribute '{}'. Want {}, got {}", key, want, got);
    }

    fn string(&mut self, key: &str) -> Option<String> {
        match self.take(key)? {
            JsonValue::String(s) => Some(s),
            other => {
                Self::mismatch(key, "a string", &other);
                None
            }
        }
    }

    fn flag(&mut self, key: &str) -> bool {
        match self.take(key) {
            None => false,
            Some(JsonValue::Bool(b)) => b,
            Some(other) => {
                Self::mismatch(key, "a boolean", &other);
                false
            }
        }
    }

    fn number(&mut self, key: &str) -> Option<f64> {
        let raw = self.take(key)?;
        let n = raw.as_f64();
        if n.is_none() {
            Self::mismatch(key, "a number", &raw);
        }
        n
    }

    fn count(&mut self, key: &str) -> Option<u32> {
        let raw = self.take(key)?;
        let n = raw.as_f64().and_then(as_count);
        if n.is_none() {
            Self::mismatch(key, "a non-negative integer", &raw);
        }
        n
    }

    fn value(&mut self, key: &str) -> Option<Value> {
        let raw = self.take(key)?;
        let v = Value::from_json(&raw);
        if v.is_none() {
            Self::mismatch(key, "a primitive", &raw);
        }
        v
    }

    fn field_value(&mut self, key: &str) -> Option<FieldValue> {
        let raw = self.take(key)?;
        let v = FieldValue::from_json(&raw);
        if v.is_none() {
            Self::mismatch(key, "a primitive or a list of primitives", &raw);
        }
        v
    }

    fn index(&mut self) -> i32 {
        match self.take("index") {
            None => 0,
            Some(raw) => match raw.as_i64().and_then(|n| i32::try_from(n).ok()) {
                Some(n) => n,
                None => {
                    Self::mismatch("index", "an integer", &raw);
                    0
                }
            },
        }
    }

    fn range(&mut self) -> Option<Vec<Value>> {
        let raw = self.take("range")?;
        let values = match &raw {
            JsonValue::Array(items) => items.iter().map(Value::from_json).collect(),
            _ => None,
        };
        if values.is_none() {
            Self::mismatch("range", "a list of primitives", &raw);
        }
        values
    }

    fn items(&mut self) -> Vec<FormBox> {
        match self.take("items") {
            None => Vec::new(),
            Some(JsonValue::Array(items)) => items.into_iter().map(FormBox::sanitize).collect(),
            Some(other) => {
                Self::mismatch("items", "a list", &other);
                Vec::new()
            }
        }
    }
}
