//! Wire-level data model.
//!
//! - [`value`]: primitive values and capture-buffer slots
//! - [`choice`]: choice lists and their normalization
//! - [`boxes`]: box tree nodes and sanitization
//! - [`message`]: typed envelope and line framing

pub mod boxes;
pub mod choice;
pub mod message;
pub mod value;

pub use boxes::{BoxKind, FormBox, Mode};
pub use choice::{normalize_options, Choice};
pub use message::{decode_frames, CodecError, Conf, Message, MsgType};
pub use value::{FieldValue, Value};
