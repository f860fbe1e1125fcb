//! Observability and Metrics
//!
//! Counters for the login-server link. The supervisor holds them in an
//! `Arc`; [`crate::LoginLink::metrics_handle`] hands out a clone so another
//! task can take snapshots while the link is being driven.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

#[derive(Debug)]
pub struct LinkMetrics {
    /// Connection attempts started
    pub connect_attempts: AtomicU64,
    /// Attempts where the transport could not be opened
    pub connect_failures: AtomicU64,
    /// Transports opened
    pub connections_established: AtomicU64,
    /// Handshakes the login server accepted
    pub handshakes_accepted: AtomicU64,
    /// Handshakes the login server rejected
    pub handshakes_rejected: AtomicU64,
    /// Messages written
    pub messages_sent: AtomicU64,
    /// Messages decoded
    pub messages_received: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub bytes_received: AtomicU64,
    pub pings_sent: AtomicU64,
    pub pongs_received: AtomicU64,
    /// Framing and dispatch violations
    pub framing_errors: AtomicU64,
    pub liveness_timeouts: AtomicU64,
    /// Connections lost or torn down
    pub disconnects: AtomicU64,
    start_time: Instant,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self {
            connect_attempts: AtomicU64::new(0),
            connect_failures: AtomicU64::new(0),
            connections_established: AtomicU64::new(0),
            handshakes_accepted: AtomicU64::new(0),
            handshakes_rejected: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            pings_sent: AtomicU64::new(0),
            pongs_received: AtomicU64::new(0),
            framing_errors: AtomicU64::new(0),
            liveness_timeouts: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connect_failed(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_established(&self) {
        self.connections_established.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handshake_accepted(&self) {
        self.handshakes_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handshake_rejected(&self) {
        self.handshakes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message sent
    pub fn message_sent(&self, byte_count: u64) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record raw bytes read from the transport
    pub fn bytes_read(&self, byte_count: u64) {
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn ping_sent(&self) {
        self.pings_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pong_received(&self) {
        self.pongs_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn framing_error(&self) {
        self.framing_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn liveness_timeout(&self) {
        self.liveness_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn disconnected(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            connections_established: self.connections_established.load(Ordering::Relaxed),
            handshakes_accepted: self.handshakes_accepted.load(Ordering::Relaxed),
            handshakes_rejected: self.handshakes_rejected.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            pings_sent: self.pings_sent.load(Ordering::Relaxed),
            pongs_received: self.pongs_received.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
            liveness_timeouts: self.liveness_timeouts.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connect_attempts = snapshot.connect_attempts,
            connect_failures = snapshot.connect_failures,
            connections_established = snapshot.connections_established,
            handshakes_accepted = snapshot.handshakes_accepted,
            handshakes_rejected = snapshot.handshakes_rejected,
            messages_sent = snapshot.messages_sent,
            messages_received = snapshot.messages_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            pings_sent = snapshot.pings_sent,
            pongs_received = snapshot.pongs_received,
            framing_errors = snapshot.framing_errors,
            liveness_timeouts = snapshot.liveness_timeouts,
            disconnects = snapshot.disconnects,
            uptime_seconds = snapshot.uptime_seconds,
            "Login link metrics snapshot"
        );
    }
}

impl Default for LinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub connections_established: u64,
    pub handshakes_accepted: u64,
    pub handshakes_rejected: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub pings_sent: u64,
    pub pongs_received: u64,
    pub framing_errors: u64,
    pub liveness_timeouts: u64,
    pub disconnects: u64,
    pub uptime_seconds: u64,
}
