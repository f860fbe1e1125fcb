//! Handshake state machine for the login-server link.
//!
//! ```text
//! Disconnected -> Connecting -> AwaitingResult -> Ready
//!       ^              |                |-------> Rejected
//!       |--------------|  (connect failed / teardown)
//! ```
//!
//! The machine never retries on its own. `Disconnected` and `Rejected` are
//! the idle phases from which the supervisor may start a new attempt.

use tracing::debug;

use crate::core::packet::Credentials;
use crate::error::{LinkError, Result};
use crate::protocol::message::{ConnectionStatus, OutboundMessage};

/// Lifecycle phase of the login-server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Disconnected,
    Connecting,
    AwaitingResult,
    Ready,
    Rejected,
}

impl Phase {
    /// No connection exists or is being made.
    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Disconnected | Phase::Rejected)
    }
}

#[derive(Debug, Default)]
pub struct Handshake {
    phase: Phase,
}

impl Handshake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Start a connection attempt.
    pub fn begin(&mut self) -> Result<()> {
        if !self.phase.is_idle() {
            return Err(LinkError::InvalidTransition {
                from: self.phase,
                event: "begin",
            });
        }
        self.transition(Phase::Connecting);
        Ok(())
    }

    /// The transport could not be opened.
    pub fn connect_failed(&mut self) {
        if self.phase == Phase::Connecting {
            self.transition(Phase::Disconnected);
        }
    }

    /// The transport is up; returns the handshake message to send.
    ///
    /// This is the only place a handshake message is produced.
    pub fn established(&mut self, credentials: &Credentials) -> Result<OutboundMessage> {
        if self.phase != Phase::Connecting {
            return Err(LinkError::InvalidTransition {
                from: self.phase,
                event: "established",
            });
        }
        self.transition(Phase::AwaitingResult);
        Ok(OutboundMessage::Handshake(credentials.clone()))
    }

    /// Apply the login server's verdict.
    pub fn on_result(&mut self, status: ConnectionStatus) -> Result<ConnectionStatus> {
        if self.phase != Phase::AwaitingResult {
            return Err(LinkError::UnexpectedResult(self.phase));
        }
        match status {
            ConnectionStatus::Accepted => self.transition(Phase::Ready),
            ConnectionStatus::Rejected(_) => self.transition(Phase::Rejected),
        }
        Ok(status)
    }

    /// The connection is gone. A rejection stays visible until the next attempt.
    pub fn reset(&mut self) {
        if self.phase != Phase::Rejected {
            self.transition(Phase::Disconnected);
        }
    }

    fn transition(&mut self, to: Phase) {
        debug!(from = ?self.phase, ?to, "Handshake phase change");
        self.phase = to;
    }
}
