//! Reconnect backoff.

use std::time::Duration;

/// Capped exponential backoff, in whole seconds.
///
/// Each failure yields the current delay and then doubles it, so consecutive
/// failures wait `initial, 2*initial, 4*initial, ...` up to `max`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    initial: u64,
    max: u64,
    current: u64,
}

impl Backoff {
    /// Create a backoff starting at `initial` seconds, capped at `max`.
    #[must_use]
    pub fn new(initial: u64, max: u64) -> Self {
        let initial = initial.max(1);
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// The delay the next failure will use.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Record a failure; returns the delay to wait before retrying.
    ///
    /// The delay is reported before it doubles, so the first retry waits
    /// `initial` (1, 2, 4, ...), not `2 * initial`.
    pub fn fail(&mut self) -> u64 {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Record a success.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// `secs` as a [`Duration`].
    #[must_use]
    pub fn duration(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(1, 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_capped() {
        let mut b = Backoff::default();
        let delays: Vec<u64> = (0..7).map(|_| b.fail()).collect();
        assert_eq!(delays, [1, 2, 4, 8, 16, 16, 16]);
    }

    #[test]
    fn test_first_failure_waits_initial_delay() {
        let mut b = Backoff::new(2, 60);
        assert_eq!(b.current(), 2);
        assert_eq!(b.fail(), 2);
        assert_eq!(b.current(), 4);
    }

    #[test]
    fn test_reset() {
        let mut b = Backoff::default();
        b.fail();
        b.fail();
        b.fail();
        b.reset();
        assert_eq!(b.fail(), 1);
        assert_eq!(b.current(), 2);
    }

    #[test]
    fn test_degenerate_bounds() {
        let mut b = Backoff::new(0, 0);
        assert_eq!(b.fail(), 1);
        assert_eq!(b.fail(), 1);

        let mut b = Backoff::new(3, 10);
        assert_eq!([b.fail(), b.fail(), b.fail()], [3, 6, 10]);
    }
}
