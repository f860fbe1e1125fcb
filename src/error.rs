//! # Error Types
//!
//! Error handling for the login-server link.
//!
//! ## Error Categories
//! - **Resolution / Connect**: the login server could not be located or reached
//! - **Framing**: the inbound byte stream is desynchronized or hostile
//! - **Handshake**: the login server refused our credentials or address
//! - **Liveness**: no traffic arrived inside the stall window
//!
//! Every fatal variant is reported after the transport has already been
//! closed, so callers only need to log it and wait for the next
//! `ensure_connected` tick.
//!
//! ## Example Usage
//! ```rust
//! use login_link::error::{LinkError, Result};
//! use tracing::error;
//!
//! fn check_port(port: u16) -> Result<u16> {
//!     if port == 0 {
//!         return Err(LinkError::ConfigError("port cannot be 0".into()));
//!     }
//!     Ok(port)
//! }
//!
//! if let Err(e) = check_port(0) {
//!     error!(error = %e, "Invalid login server port");
//! }
//! ```

use std::fmt;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

use crate::protocol::handshake::Phase;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Configuration errors
    pub const ERR_ADDRESS_NOT_SET: &str = "Login server address has not been resolved";
    pub const ERR_FIELD_TOO_LONG: &str = "Value exceeds the 24-byte credential field";

    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_CONNECTION_TIMEOUT: &str = "Connection timed out (no activity)";

    /// Handshake errors
    pub const ERR_BAD_CREDENTIALS: &str = "Invalid username/password";
    pub const ERR_ADDRESS_NOT_PERMITTED: &str = "Address not permitted by the login server";
}

/// Reasons the login server gives for refusing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Status `1`.
    BadCredentials,
    /// Status `2`.
    AddressNotPermitted,
    /// Any status the login server does not document.
    Unknown(u8),
}

impl RejectReason {
    /// The raw status byte this reason was decoded from.
    pub fn status(&self) -> u8 {
        match *self {
            RejectReason::BadCredentials => 1,
            RejectReason::AddressNotPermitted => 2,
            RejectReason::Unknown(status) => status,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::BadCredentials => f.write_str(constants::ERR_BAD_CREDENTIALS),
            RejectReason::AddressNotPermitted => f.write_str(constants::ERR_ADDRESS_NOT_PERMITTED),
            RejectReason::Unknown(status) => write!(f, "Invalid response (error code {status})"),
        }
    }
}

/// Violations of the framing or dispatch rules. Always fatal to the connection.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    #[error("Unrecognized command 0x{0:04x}")]
    UnknownCommand(u16),

    #[error("Command 0x{code:04x} declares {declared} bytes, below the 4-byte header")]
    UndersizedLength { code: u16, declared: u16 },

    #[error("No handler for command 0x{0:04x}")]
    UnhandledCommand(u16),

    #[error("Command 0x{code:04x} is missing payload bytes ({len} bytes)")]
    Truncated { code: u16, len: usize },
}

// LinkError is the primary error type for all link operations
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to resolve login server address '{host}'")]
    Resolution { host: String },

    #[error("Failed to connect to login server at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("Login server rejected the connection: {0}")]
    HandshakeRejected(RejectReason),

    #[error("Connection result received while {0:?}")]
    UnexpectedResult(Phase),

    #[error("Invalid transition from {from:?} on {event}")]
    InvalidTransition { from: Phase, event: &'static str },

    #[error("{}", constants::ERR_CONNECTION_TIMEOUT)]
    LivenessTimeout,

    #[error("{}", constants::ERR_CONNECTION_CLOSED)]
    ConnectionClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using LinkError
pub type Result<T> = std::result::Result<T, LinkError>;
