//! Wire constants, command length table, credentials and decoded messages.

use bytes::Bytes;
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{constants, LinkError, Result};

/// Fixed width of the identifier and secret fields.
pub const NAME_LENGTH: usize = 24;

/// First command code covered by the inbound length table.
pub const PACKET_LEN_TABLE_START: u16 = 0x2810;
/// Number of command codes covered by the inbound length table.
pub const PACKET_LEN_TABLE_SIZE: usize = 8;

/// Outbound: identifier + secret.
pub const CMD_HANDSHAKE: u16 = 0x2720;
/// Outbound: keepalive.
pub const CMD_PING: u16 = 0x2821;
/// Inbound: accept/reject status for our handshake.
pub const CMD_CONNECTION_RESULT: u16 = 0x2811;
/// Inbound: keepalive answer.
pub const CMD_PONG: u16 = 0x2812;

/// Size of the command code at the start of every message.
pub const CODE_LEN: usize = 2;
/// Code plus the u16 length field of a dynamic-length message.
pub const DYNAMIC_HEADER_LEN: usize = 4;
/// Total size of the outbound handshake.
pub const HANDSHAKE_LEN: usize = CODE_LEN + 2 * NAME_LENGTH;
/// Total size of the outbound ping.
pub const PING_LEN: usize = CODE_LEN;

/// Length rule for one command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketLen {
    /// Code is not valid on this link.
    Invalid,
    /// Message is always this many bytes, code included.
    Fixed(u16),
    /// Bytes 2-3 of the message carry its total length.
    Dynamic,
}

/// Maps inbound command codes to their [`PacketLen`].
///
/// Covers a contiguous range starting at `start`; any code outside that
/// range is [`PacketLen::Invalid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketLengthTable {
    start: u16,
    entries: Vec<PacketLen>,
}

impl PacketLengthTable {
    /// Create a table covering `size` codes from `start`, all invalid.
    pub fn new(start: u16, size: usize) -> Self {
        let size = size.min(usize::from(u16::MAX - start) + 1);
        Self {
            start,
            entries: vec![PacketLen::Invalid; size],
        }
    }

    /// Codes covered by this table.
    pub fn range(&self) -> Range<u32> {
        let start = u32::from(self.start);
        start..start + self.entries.len() as u32
    }

    /// Look up the length rule for `code`.
    #[inline]
    pub fn lookup(&self, code: u16) -> PacketLen {
        code.checked_sub(self.start)
            .and_then(|index| self.entries.get(usize::from(index)))
            .copied()
            .unwrap_or(PacketLen::Invalid)
    }

    /// Set the length rule for a code inside the table's range.
    pub fn set(&mut self, code: u16, len: PacketLen) -> Result<()> {
        if let PacketLen::Fixed(n) = len {
            if usize::from(n) < CODE_LEN {
                return Err(LinkError::ConfigError(format!(
                    "Fixed length {n} for command 0x{code:04x} is shorter than the command code"
                )));
            }
        }

        let slot = code
            .checked_sub(self.start)
            .and_then(|index| self.entries.get_mut(usize::from(index)))
            .ok_or_else(|| {
                LinkError::ConfigError(format!(
                    "Command 0x{code:04x} is outside the length table range"
                ))
            })?;
        *slot = len;
        Ok(())
    }
}

impl Default for PacketLengthTable {
    /// The table the login server speaks: connection result and pong only.
    fn default() -> Self {
        let mut entries = vec![PacketLen::Invalid; PACKET_LEN_TABLE_SIZE];
        entries[usize::from(CMD_CONNECTION_RESULT - PACKET_LEN_TABLE_START)] = PacketLen::Fixed(3);
        entries[usize::from(CMD_PONG - PACKET_LEN_TABLE_START)] = PacketLen::Fixed(2);
        Self {
            start: PACKET_LEN_TABLE_START,
            entries,
        }
    }
}

/// A fully-buffered inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Command code.
    pub code: u16,
    /// Total length on the wire, header included.
    pub length: usize,
    /// Bytes after the header (code, plus the length field for dynamic messages).
    pub payload: Bytes,
}

impl InboundMessage {
    /// Build a message from a frame holding exactly one encoded message.
    pub fn from_frame(mut frame: Bytes, header_len: usize) -> Self {
        let code = u16::from_le_bytes([frame[0], frame[1]]);
        let length = frame.len();
        let payload = frame.split_off(header_len);
        Self {
            code,
            length,
            payload,
        }
    }
}

/// Fixed-width identifier and secret sent in the handshake.
///
/// Both fields are zero-padded to [`NAME_LENGTH`] bytes and wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    userid: [u8; NAME_LENGTH],
    passwd: [u8; NAME_LENGTH],
}

impl Credentials {
    /// Build credentials from strings of at most [`NAME_LENGTH`] bytes.
    pub fn new(userid: &str, passwd: &str) -> Result<Self> {
        Ok(Self {
            userid: fixed_field(userid)?,
            passwd: fixed_field(passwd)?,
        })
    }

    /// Build credentials from already padded fields.
    pub fn from_raw(userid: [u8; NAME_LENGTH], passwd: [u8; NAME_LENGTH]) -> Self {
        Self { userid, passwd }
    }

    pub fn userid(&self) -> &[u8; NAME_LENGTH] {
        &self.userid
    }

    pub fn passwd(&self) -> &[u8; NAME_LENGTH] {
        &self.passwd
    }

    /// Identifier with the zero padding stripped, for log messages.
    pub fn userid_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(trim_padding(&self.userid))
    }

    /// Whether these are the stock `s1`/`p1` inter-server credentials.
    pub fn is_default(&self) -> bool {
        trim_padding(&self.userid) == b"s1" && trim_padding(&self.passwd) == b"p1"
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::from_raw([0; NAME_LENGTH], [0; NAME_LENGTH])
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("userid", &self.userid_lossy())
            .field("passwd", &"<redacted>")
            .finish()
    }
}

fn fixed_field(value: &str) -> Result<[u8; NAME_LENGTH]> {
    let bytes = value.as_bytes();
    if bytes.len() > NAME_LENGTH {
        return Err(LinkError::ConfigError(format!(
            "{} ({} bytes)",
            constants::ERR_FIELD_TOO_LONG,
            bytes.len()
        )));
    }
    let mut field = [0u8; NAME_LENGTH];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

fn trim_padding(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}
