use bytes::{BufMut, Bytes, BytesMut};

use crate::core::packet::{
    Credentials, InboundMessage, CMD_CONNECTION_RESULT, CMD_HANDSHAKE, CMD_PING, CMD_PONG,
    HANDSHAKE_LEN, NAME_LENGTH, PING_LEN,
};
use crate::error::{FramingError, LinkError, RejectReason, Result};

/// Messages this side sends to the login server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Handshake(Credentials),
    Ping,
}

impl OutboundMessage {
    pub fn code(&self) -> u16 {
        match self {
            OutboundMessage::Handshake(_) => CMD_HANDSHAKE,
            OutboundMessage::Ping => CMD_PING,
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            OutboundMessage::Handshake(_) => HANDSHAKE_LEN,
            OutboundMessage::Ping => PING_LEN,
        }
    }

    /// Append the wire form of this message to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_u16_le(self.code());
        if let OutboundMessage::Handshake(credentials) = self {
            dst.put_slice(credentials.userid());
            dst.put_slice(credentials.passwd());
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Parse a message as the login server would receive it.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(FramingError::Truncated {
                code: 0,
                len: data.len(),
            }
            .into());
        }

        let code = u16::from_le_bytes([data[0], data[1]]);
        match code {
            CMD_HANDSHAKE => {
                if data.len() < HANDSHAKE_LEN {
                    return Err(FramingError::Truncated {
                        code,
                        len: data.len(),
                    }
                    .into());
                }
                let mut userid = [0u8; NAME_LENGTH];
                let mut passwd = [0u8; NAME_LENGTH];
                userid.copy_from_slice(&data[2..2 + NAME_LENGTH]);
                passwd.copy_from_slice(&data[2 + NAME_LENGTH..HANDSHAKE_LEN]);
                Ok(OutboundMessage::Handshake(Credentials::from_raw(
                    userid, passwd,
                )))
            }
            CMD_PING => Ok(OutboundMessage::Ping),
            other => Err(LinkError::Framing(FramingError::UnknownCommand(other))),
        }
    }
}

/// Status byte of a connection-result message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Accepted,
    Rejected(RejectReason),
}

impl ConnectionStatus {
    pub fn from_byte(status: u8) -> Self {
        match status {
            0 => ConnectionStatus::Accepted,
            1 => ConnectionStatus::Rejected(RejectReason::BadCredentials),
            2 => ConnectionStatus::Rejected(RejectReason::AddressNotPermitted),
            other => ConnectionStatus::Rejected(RejectReason::Unknown(other)),
        }
    }
}

/// Commands the login server sends on this link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundCommand {
    ConnectionResult(ConnectionStatus),
    Pong,
    /// Framed by the length table but not handled here.
    Unrecognized(u16),
}

impl InboundCommand {
    pub fn parse(msg: &InboundMessage) -> std::result::Result<Self, FramingError> {
        match msg.code {
            CMD_CONNECTION_RESULT => {
                let status = msg.payload.first().copied().ok_or(FramingError::Truncated {
                    code: msg.code,
                    len: msg.length,
                })?;
                Ok(InboundCommand::ConnectionResult(ConnectionStatus::from_byte(
                    status,
                )))
            }
            CMD_PONG => Ok(InboundCommand::Pong),
            other => Ok(InboundCommand::Unrecognized(other)),
        }
    }
}
