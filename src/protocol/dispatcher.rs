use tracing::warn;

use crate::core::packet::InboundMessage;
use crate::error::{FramingError, Result};
use crate::protocol::message::{ConnectionStatus, InboundCommand};

/// Receives the commands the login server may send.
///
/// A handler may tear the connection down; the caller is responsible for
/// checking that its connection is still live before touching it again.
pub trait CommandHandler {
    fn on_connection_result(&mut self, status: ConnectionStatus) -> Result<()>;
    fn on_pong(&mut self) -> Result<()>;
}

/// Route a decoded message to its handler.
///
/// Codes the length table frames but nothing handles are fatal.
pub fn dispatch<H>(handler: &mut H, msg: &InboundMessage) -> Result<()>
where
    H: CommandHandler + ?Sized,
{
    match InboundCommand::parse(msg)? {
        InboundCommand::ConnectionResult(status) => handler.on_connection_result(status),
        InboundCommand::Pong => handler.on_pong(),
        InboundCommand::Unrecognized(code) => {
            warn!(
                code = format_args!("0x{code:04x}"),
                len = msg.length,
                "Unknown packet from login server, disconnecting"
            );
            Err(FramingError::UnhandledCommand(code).into())
        }
    }
}
