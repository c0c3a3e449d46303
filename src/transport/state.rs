//! Connection state machine.
//!
//! [`Connection`] decides what each socket callback means without touching
//! any I/O. The async driver in [`super::client`] feeds it callbacks and acts
//! on the events and outcomes it returns:
//!
//! ```text
//!             open                      close (≠ retry-later)
//! Connecting ──────► Connected ──────────────────────────► Disconnected(retry)
//!     ▲                                                          │
//!     └──────────────────────── timer fires ─────────────────────┘
//! ```

use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use super::backoff::Backoff;
use super::error::TransportError;
use crate::protocol::{decode_frames, Message};

/// Close code meaning "try again later".
pub const RETRY_LATER: u16 = 1013;
/// Close code used when the socket went away without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;
/// Close code sent on a deliberate disconnect.
pub const CLOSE_NORMAL: u16 = 1000;

/// Where a transport is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Opening a socket.
    Connecting,
    /// Socket open; sends go through.
    Connected,
    /// Socket closed; a reconnect is due after `retry` seconds.
    Disconnected { retry: u64 },
}

/// What the transport reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    /// Reconnecting after `retry` seconds.
    Disconnected { retry: u64 },
    Message(Message),
    /// A socket or frame error; never fatal on its own.
    Error(String),
}

/// Result of handling a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Close ignored; nothing is scheduled.
    Ignored,
    /// Reconnect after `delay` seconds.
    Retry { delay: u64 },
}

impl CloseOutcome {
    /// The event to report, if any.
    #[must_use]
    pub fn event(&self) -> Option<TransportEvent> {
        match self {
            CloseOutcome::Ignored => None,
            CloseOutcome::Retry { delay } => Some(TransportEvent::Disconnected { retry: *delay }),
        }
    }

    /// How long to wait before reconnecting; `None` means wait for an
    /// explicit reconnect.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        match self {
            CloseOutcome::Ignored => None,
            CloseOutcome::Retry { delay } => Some(Backoff::duration(*delay)),
        }
    }
}

/// Sans-IO state of one transport.
#[derive(Debug, Clone)]
pub struct Connection {
    state: ConnectionState,
    backoff: Backoff,
    retry_later_code: u16,
}

impl Connection {
    /// A connection in its initial `Connecting` state.
    #[must_use]
    pub fn new(backoff: Backoff, retry_later_code: u16) -> Self {
        Self {
            state: ConnectionState::Connecting,
            backoff,
            retry_later_code,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether outbound messages should be written.
    #[must_use]
    pub fn can_send(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// A connection attempt is starting.
    pub fn on_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// The socket opened.
    pub fn on_open(&mut self) -> TransportEvent {
        info!("Connected");
        self.state = ConnectionState::Connected;
        self.backoff.reset();
        TransportEvent::Connected
    }

    /// The socket closed with `code` (`None` when no code was given).
    pub fn on_close(&mut self, code: Option<u16>) -> CloseOutcome {
        if code == Some(self.retry_later_code) {
            debug!("Server asked to retry later; waiting for an explicit reconnect");
            return CloseOutcome::Ignored;
        }

        let delay = self.backoff.fail();
        info!("Disconnected (code {:?}); reconnecting in {}s", code, delay);
        self.state = ConnectionState::Disconnected { retry: delay };
        CloseOutcome::Retry { delay }
    }

    /// A payload arrived. Each `\n`-separated frame becomes one event, in
    /// order.
    pub fn on_data(&mut self, payload: &str) -> Vec<TransportEvent> {
        decode_frames(payload)
            .into_iter()
            .map(|frame| match frame {
                Ok(msg) => TransportEvent::Message(msg),
                Err(e) => TransportEvent::Error(TransportError::from(e).to_string()),
            })
            .collect()
    }

    /// The socket reported an error.
    pub fn on_error(&mut self, err: &dyn fmt::Display) -> TransportEvent {
        debug!("Socket error: {}", err);
        TransportEvent::Error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Value;

    fn connection() -> Connection {
        Connection::new(Backoff::default(), RETRY_LATER)
    }

    #[test]
    fn test_initial_state() {
        let c = connection();
        assert_eq!(c.state(), ConnectionState::Connecting);
        assert!(!c.can_send());
    }

    #[test]
    fn test_open_then_close() {
        let mut c = connection();
        assert_eq!(c.on_open(), TransportEvent::Connected);
        assert!(c.can_send());

        let outcome = c.on_close(Some(CLOSE_ABNORMAL));
        assert_eq!(outcome, CloseOutcome::Retry { delay: 1 });
        assert_eq!(outcome.event(), Some(TransportEvent::Disconnected { retry: 1 }));
        assert_eq!(outcome.delay(), Some(Duration::from_secs(1)));
        assert_eq!(c.state(), ConnectionState::Disconnected { retry: 1 });
        assert!(!c.can_send());
    }

    #[test]
    fn test_consecutive_failures_back_off() {
        let mut c = connection();
        let delays: Vec<u64> = (0..6)
            .map(|_| {
                c.on_connecting();
                match c.on_close(None) {
                    CloseOutcome::Retry { delay } => delay,
                    CloseOutcome::Ignored => 0,
                }
            })
            .collect();
        assert_eq!(delays, [1, 2, 4, 8, 16, 16]);

        c.on_open();
        assert_eq!(c.on_close(None), CloseOutcome::Retry { delay: 1 });
    }

    #[test]
    fn test_retry_later_is_ignored() {
        let mut c = connection();
        c.on_open();
        let outcome = c.on_close(Some(RETRY_LATER));
        assert_eq!(outcome, CloseOutcome::Ignored);
        assert_eq!(outcome.event(), None);
        assert_eq!(outcome.delay(), None);
        assert_eq!(c.state(), ConnectionState::Connected);

        // The ignored close does not advance the backoff.
        assert_eq!(c.on_close(None), CloseOutcome::Retry { delay: 1 });
    }

    #[test]
    fn test_data_frames_in_order() {
        let mut c = connection();
        let events = c.on_data("{\"t\":15,\"d\":1}\n{bad json\n{\"t\":15,\"d\":2}\n");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], TransportEvent::Message(Message::Switch(Value::from(1))));
        assert!(matches!(&events[1], TransportEvent::Error(e) if e.starts_with("Codec error")));
        assert_eq!(events[2], TransportEvent::Message(Message::Switch(Value::from(2))));
    }

    #[test]
    fn test_error_does_not_change_state() {
        let mut c = connection();
        c.on_open();
        let event = c.on_error(&"boom");
        assert_eq!(event, TransportEvent::Error("boom".to_string()));
        assert_eq!(c.state(), ConnectionState::Connected);
    }
}
