//! Position-addressed capture buffer.
//!
//! A form's controls write their values into one flat buffer; the slot of a
//! control is its position in a depth-first walk of the form. Contexts are
//! cheap handles onto that shared buffer:
//!
//! ```text
//!   ctx(-1) ──next──► ctx(0) ──next──► ctx(1) ──next──► ctx(2)
//!      │                 │                │                │
//!      └─────────────────┴───── Arc<Mutex<buffer>> ────────┘
//!                                         │
//!                                    send() ──► Outbox ──► Input message
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::{FieldValue, Message};
use crate::transport::TransportHandle;

/// Where submitted buffers go.
#[derive(Debug, Clone)]
pub enum Outbox {
    /// A live transport.
    Transport(TransportHandle),
    /// An in-process channel, for tests and offline use.
    Channel(mpsc::UnboundedSender<Message>),
    /// Nowhere; submissions are logged and dropped.
    Discard,
}

impl Outbox {
    /// Hand a message to the outbox. Never fails; problems are logged.
    pub fn send(&self, msg: Message) {
        match self {
            Outbox::Transport(handle) => {
                if let Err(e) = handle.send(msg) {
                    warn!("Failed to submit form: {}", e);
                }
            }
            Outbox::Channel(tx) => {
                if tx.send(msg).is_err() {
                    warn!("Failed to submit form: receiver dropped");
                }
            }
            Outbox::Discard => debug!("Discarding submission: {:?}", msg),
        }
    }
}

/// The flat value buffer of one mounted form.
///
/// Only slots handed out by [`CaptureContext::next`] are writable, so the
/// buffer never grows past the number of mounted leaves.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    slots: Vec<FieldValue>,
    claimed: usize,
}

impl CaptureBuffer {
    /// Make slots `0..=index` writable.
    pub fn claim(&mut self, index: i32) {
        if let Ok(index) = usize::try_from(index) {
            self.claimed = self.claimed.max(index + 1);
        }
    }

    /// Number of writable slots.
    #[must_use]
    pub fn claimed(&self) -> usize {
        self.claimed
    }

    /// Write `value` at `index`, padding with nulls. Negative indices are
    /// ignored; unclaimed ones are ignored with a warning.
    pub fn write(&mut self, index: i32, value: FieldValue) {
        let Ok(index) = usize::try_from(index) else {
            return;
        };
        if index >= self.claimed {
            warn!(
                "Ignoring write to slot {}; only {} slots are mounted",
                index, self.claimed
            );
            return;
        }
        if self.slots.len() <= index {
            self.slots.resize(index + 1, FieldValue::Null);
        }
        self.slots[index] = value;
    }

    /// Current contents.
    #[must_use]
    pub fn slots(&self) -> &[FieldValue] {
        &self.slots
    }
}

/// A handle onto a form's capture buffer, bound to one slot.
#[derive(Debug, Clone)]
pub struct CaptureContext {
    buffer: Arc<Mutex<CaptureBuffer>>,
    outbox: Outbox,
    index: i32,
}

impl CaptureContext {
    /// Start a fresh, empty buffer. The returned context is bound to `-1`,
    /// so the first [`next`](Self::next) yields slot 0.
    pub fn new(outbox: Outbox) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(CaptureBuffer::default())),
            outbox,
            index: -1,
        }
    }

    /// The slot this context writes to.
    #[must_use]
    pub fn index(&self) -> i32 {
        self.index
    }

    fn lock(&self) -> MutexGuard<'_, CaptureBuffer> {
        // Slots hold plain values, so a poisoned lock is still usable.
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write `value` at an arbitrary claimed slot. No-op for negative or
    /// unclaimed indices.
    pub fn capture(&self, index: i32, value: impl Into<FieldValue>) {
        self.lock().write(index, value.into());
    }

    /// Write `value` at this context's slot, then optionally ship the whole
    /// buffer.
    pub fn submit(&self, value: impl Into<FieldValue>, also_send: bool) {
        self.capture(self.index, value);
        if also_send {
            self.send();
        }
    }

    /// Ship the whole buffer as an `Input` message.
    pub fn send(&self) {
        let values = self.snapshot();
        debug!("Submitting {} values", values.len());
        self.outbox.send(Message::Input(values));
    }

    /// A context on the same buffer, bound to the following slot, which
    /// becomes writable.
    #[must_use]
    pub fn next(&self) -> Self {
        let next = self.bind(self.index.saturating_add(1));
        self.lock().claim(next.index);
        next
    }

    /// A context on the same buffer, bound to `index`.
    #[must_use]
    pub fn bind(&self, index: i32) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            outbox: self.outbox.clone(),
            index,
        }
    }

    /// Copy of the buffer's current contents.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FieldValue> {
        self.lock().slots().to_vec()
    }
}
