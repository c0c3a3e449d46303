//! Typed message envelope and newline-delimited JSON framing.
//!
//! Every frame on the wire is one JSON object:
//!
//! ```text
//! { "t": <type>, "d": <payload>, "p": <position>, "e": <error text>, "c": <error code> }
//! ```
//!
//! Only `t` is mandatory. A single transport payload may carry several frames
//! separated by `\n`; [`decode_frames`] decodes them independently so one bad
//! frame never hides the others.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use super::boxes::FormBox;
use super::choice::{normalize_optional, Choice};
use super::value::{FieldValue, Value};

/// Errors from decoding or encoding a frame.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Frame is not valid JSON, or not an object.
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    /// Frame has no usable `t` field.
    #[error("Frame has no message type")]
    MissingType,
    /// Frame type is outside the known range.
    #[error("Unknown message type: {0}")]
    UnknownType(u64),
    /// Payload does not have the shape required by its type.
    #[error("Invalid {kind:?} payload: {reason}")]
    InvalidPayload {
        /// Type of the offending frame.
        kind: MsgType,
        /// What was wrong.
        reason: String,
    },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Numeric message type carried in `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    Error = 1,
    Join = 2,
    Leave = 3,
    Abort = 4,
    Resume = 5,
    Request = 6,
    Response = 7,
    Watch = 8,
    Event = 9,
    Input = 10,
    Insert = 11,
    Update = 12,
    Remove = 13,
    Conf = 14,
    Switch = 15,
}

impl TryFrom<u64> for MsgType {
    type Error = CodecError;

    fn try_from(t: u64) -> Result<Self, CodecError> {
        Ok(match t {
            1 => MsgType::Error,
            2 => MsgType::Join,
            3 => MsgType::Leave,
            4 => MsgType::Abort,
            5 => MsgType::Resume,
            6 => MsgType::Request,
            7 => MsgType::Response,
            8 => MsgType::Watch,
            9 => MsgType::Event,
            10 => MsgType::Input,
            11 => MsgType::Insert,
            12 => MsgType::Update,
            13 => MsgType::Remove,
            14 => MsgType::Conf,
            15 => MsgType::Switch,
            other => return Err(CodecError::UnknownType(other)),
        })
    }
}

impl From<MsgType> for u64 {
    fn from(t: MsgType) -> Self {
        t as u64
    }
}

/// Page-level configuration.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Conf {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub menu: Vec<Choice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nav: Vec<Choice>,
}

impl Conf {
    /// Build a configuration from its wire object; `menu` and `nav` are
    /// normalized like any other choice list.
    pub fn from_json(fields: &Map<String, JsonValue>) -> Self {
        let text = |key: &str| fields.get(key).and_then(JsonValue::as_str).map(str::to_string);
        Self {
            title: text("title"),
            caption: text("caption"),
            menu: normalize_optional(fields.get("menu")),
            nav: normalize_optional(fields.get("nav")),
        }
    }
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Remote-side failure.
    Error { text: String, code: Option<i64> },
    Join(JsonValue),
    Leave(JsonValue),
    Abort(JsonValue),
    Resume(JsonValue),
    Request(JsonValue),
    Response(JsonValue),
    Watch(JsonValue),
    Event(JsonValue),
    /// The full capture buffer.
    Input(Vec<FieldValue>),
    /// Add a root box, at `position` or at the end.
    Insert { node: FormBox, position: Option<i64> },
    /// Replace a root box at `position`, or the whole page.
    Update { node: FormBox, position: Option<i64> },
    /// Remove every box sharing this box's `xid`.
    Remove(FormBox),
    Conf(Conf),
    Switch(Value),
}

#[derive(Deserialize)]
struct Envelope {
    t: Option<u64>,
    #[serde(default)]
    d: JsonValue,
    p: Option<i64>,
    e: Option<String>,
    c: Option<i64>,
}

impl Message {
    /// The wire type of this message.
    #[must_use]
    pub fn kind(&self) -> MsgType {
        match self {
            Message::Error { .. } => MsgType::Error,
            Message::Join(_) => MsgType::Join,
            Message::Leave(_) => MsgType::Leave,
            Message::Abort(_) => MsgType::Abort,
            Message::Resume(_) => MsgType::Resume,
            Message::Request(_) => MsgType::Request,
            Message::Response(_) => MsgType::Response,
            Message::Watch(_) => MsgType::Watch,
            Message::Event(_) => MsgType::Event,
            Message::Input(_) => MsgType::Input,
            Message::Insert { .. } => MsgType::Insert,
            Message::Update { .. } => MsgType::Update,
            Message::Remove(_) => MsgType::Remove,
            Message::Conf(_) => MsgType::Conf,
            Message::Switch(_) => MsgType::Switch,
        }
    }

    /// Decode a single frame.
    pub fn decode(frame: &str) -> CodecResult<Self> {
        let env: Envelope = serde_json::from_str(frame)?;
        let kind = MsgType::try_from(env.t.ok_or(CodecError::MissingType)?)?;
        let invalid = |reason: &str| CodecError::InvalidPayload {
            kind,
            reason: reason.to_string(),
        };

        let msg = match kind {
            MsgType::Error => Message::Error {
                text: env.e.unwrap_or_default(),
                code: env.c,
            },
            MsgType::Join => Message::Join(env.d),
            MsgType::Leave => Message::Leave(env.d),
            MsgType::Abort => Message::Abort(env.d),
            MsgType::Resume => Message::Resume(env.d),
            MsgType::Request => Message::Request(env.d),
            MsgType::Response => Message::Response(env.d),
            MsgType::Watch => Message::Watch(env.d),
            MsgType::Event => Message::Event(env.d),
            MsgType::Input => Message::Input(
                serde_json::from_value(env.d)
                    .map_err(|e| invalid(&format!("want a list of values: {}", e)))?,
            ),
            MsgType::Insert | MsgType::Update | MsgType::Remove => {
                if !env.d.is_object() {
                    return Err(invalid("want a box object"));
                }
                let node = FormBox::sanitize(env.d);
                match kind {
                    MsgType::Insert => Message::Insert {
                        node,
                        position: env.p,
                    },
                    MsgType::Update => Message::Update {
                        node,
                        position: env.p,
                    },
                    _ => Message::Remove(node),
                }
            }
            MsgType::Conf => match &env.d {
                JsonValue::Object(fields) => Message::Conf(Conf::from_json(fields)),
                _ => return Err(invalid("want an object")),
            },
            MsgType::Switch => {
                Message::Switch(Value::from_json(&env.d).ok_or_else(|| invalid("want a primitive"))?)
            }
        };

        Ok(msg)
    }

    /// Encode this message as one frame, without the trailing newline.
    pub fn encode(&self) -> CodecResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("t", &u64::from(self.kind()))?;

        match self {
            Message::Error { text, code } => {
                map.serialize_entry("e", text)?;
                if let Some(code) = code {
                    map.serialize_entry("c", code)?;
                }
            }
            Message::Join(d)
            | Message::Leave(d)
            | Message::Abort(d)
            | Message::Resume(d)
            | Message::Request(d)
            | Message::Response(d)
            | Message::Watch(d)
            | Message::Event(d) => {
                if !d.is_null() {
                    map.serialize_entry("d", d)?;
                }
            }
            Message::Input(values) => map.serialize_entry("d", values)?,
            Message::Insert { node, position } | Message::Update { node, position } => {
                map.serialize_entry("d", node)?;
                if let Some(p) = position {
                    map.serialize_entry("p", p)?;
                }
            }
            Message::Remove(node) => map.serialize_entry("d", node)?,
            Message::Conf(conf) => map.serialize_entry("d", conf)?,
            Message::Switch(v) => map.serialize_entry("d", v)?,
        }

        map.end()
    }
}

/// Split a transport payload on `\n` and decode every non-empty frame, in
/// order.
pub fn decode_frames(payload: &str) -> Vec<CodecResult<Message>> {
    payload
        .split('\n')
        .map(str::trim)
        .filter(|frame| !frame.is_empty())
        .map(Message::decode)
        .collect()
}
