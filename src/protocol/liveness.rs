//! Ping/pong liveness tracking.
//!
//! Once the link has been idle for longer than the stall time a single ping
//! goes out. If nothing at all arrives before twice the stall time the
//! connection is considered dead.

use std::time::{Duration, Instant};

/// Default stall time before a ping is sent.
pub const DEFAULT_STALL_TIME: Duration = Duration::from_secs(60);

/// What the read cycle should do about liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessVerdict {
    Alive,
    SendPing,
    Expired,
}

#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    stall_time: Duration,
    last_activity: Instant,
    ping_sent: bool,
}

impl LivenessMonitor {
    pub fn new(stall_time: Duration, now: Instant) -> Self {
        Self {
            stall_time,
            last_activity: now,
            ping_sent: false,
        }
    }

    pub fn stall_time(&self) -> Duration {
        self.stall_time
    }

    pub fn set_stall_time(&mut self, stall_time: Duration) {
        self.stall_time = stall_time;
    }

    /// Start tracking a fresh connection.
    pub fn reset(&mut self, now: Instant) {
        self.last_activity = now;
        self.ping_sent = false;
    }

    /// Inbound bytes arrived.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn pong_received(&mut self) {
        self.ping_sent = false;
    }

    pub fn ping_sent(&self) -> bool {
        self.ping_sent
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Evaluate the link at `now`. Returns `SendPing` at most once per stall.
    pub fn check(&mut self, now: Instant) -> LivenessVerdict {
        let idle = self.idle(now);
        if idle > self.stall_time.saturating_mul(2) {
            return LivenessVerdict::Expired;
        }
        if idle > self.stall_time && !self.ping_sent {
            self.ping_sent = true;
            return LivenessVerdict::SendPing;
        }
        LivenessVerdict::Alive
    }
}
