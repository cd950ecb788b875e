//! PING/PONG liveness tracking (`spec.md` §4.5).
//!
//! A connection sends PING every `heartbeatInterval` and expects a PONG
//! within `heartbeatTimeout`; missing one marks the connection dead so the
//! caller can tear it down and start reconnecting. Kept as a plain state
//! machine over `Instant` (no timers of its own) so the connection driver
//! can poll it on whatever tick it already runs, the same way
//! `synckit-sync`'s `AwarenessMap` tracks TTLs without owning a scheduler.

use std::time::{Duration, Instant};

use synckit_core::config::HeartbeatConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PingState {
    Idle,
    AwaitingPong,
}

/// Tracks when the next PING is due and whether the in-flight one has
/// timed out.
pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    state: PingState,
    last_ping_at: Instant,
    last_pong_at: Instant,
}

impl HeartbeatMonitor {
    pub fn new(config: HeartbeatConfig, now: Instant) -> Self {
        Self {
            config,
            state: PingState::Idle,
            last_ping_at: now,
            last_pong_at: now,
        }
    }

    /// Whether a PING is due: `heartbeatInterval` has elapsed since the
    /// last one and none is currently in flight.
    pub fn ping_due(&self, now: Instant) -> bool {
        self.state == PingState::Idle && now.duration_since(self.last_ping_at) >= Duration::from_secs(self.config.interval_secs)
    }

    /// Records that a PING was just sent; starts the PONG timeout clock.
    pub fn record_ping_sent(&mut self, now: Instant) {
        self.state = PingState::AwaitingPong;
        self.last_ping_at = now;
    }

    /// Records an inbound PONG; clears the awaiting-reply state.
    pub fn record_pong_received(&mut self, now: Instant) {
        self.state = PingState::Idle;
        self.last_pong_at = now;
    }

    /// True once a PING has been outstanding longer than
    /// `heartbeatTimeout` without a matching PONG — the connection should
    /// be treated as dead.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.state == PingState::AwaitingPong
            && now.duration_since(self.last_ping_at) >= Duration::from_secs(self.config.timeout_secs)
    }

    pub fn last_pong_at(&self) -> Instant {
        self.last_pong_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HeartbeatConfig {
        HeartbeatConfig { interval_secs: 30, timeout_secs: 5 }
    }

    #[test]
    fn ping_not_due_immediately_after_creation() {
        let now = Instant::now();
        let monitor = HeartbeatMonitor::new(config(), now);
        assert!(!monitor.ping_due(now));
    }

    #[test]
    fn ping_due_after_interval_elapses() {
        let start = Instant::now();
        let monitor = HeartbeatMonitor::new(config(), start);
        let later = start + Duration::from_secs(31);
        assert!(monitor.ping_due(later));
    }

    #[test]
    fn no_second_ping_due_while_one_is_in_flight() {
        let start = Instant::now();
        let mut monitor = HeartbeatMonitor::new(config(), start);
        let later = start + Duration::from_secs(31);
        monitor.record_ping_sent(later);
        assert!(!monitor.ping_due(later));
    }

    #[test]
    fn expires_once_pong_timeout_elapses() {
        let start = Instant::now();
        let mut monitor = HeartbeatMonitor::new(config(), start);
        monitor.record_ping_sent(start);
        let still_waiting = start + Duration::from_secs(4);
        assert!(!monitor.is_expired(still_waiting));
        let timed_out = start + Duration::from_secs(6);
        assert!(monitor.is_expired(timed_out));
    }

    #[test]
    fn pong_before_timeout_clears_awaiting_state() {
        let start = Instant::now();
        let mut monitor = HeartbeatMonitor::new(config(), start);
        monitor.record_ping_sent(start);
        let pong_at = start + Duration::from_secs(1);
        monitor.record_pong_received(pong_at);
        assert!(!monitor.is_expired(start + Duration::from_secs(10)));
        assert_eq!(monitor.last_pong_at(), pong_at);
    }
}
