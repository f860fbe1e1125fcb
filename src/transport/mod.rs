//! # Transport Layer
//!
//! The socket-level collaborator the supervisor drives. A transport resolves
//! host names, opens connections, and moves bytes without blocking: `read`
//! returns whatever is available right now and `write` queues anything the
//! socket cannot take yet.
//!
//! ## Implementations
//! - [`tcp::TcpTransport`]: tokio `TcpStream` using `try_read`/`try_write`
//! - [`memory::MemoryTransport`]: in-process peer, driven by a [`memory::MemoryPeer`]

use bytes::BytesMut;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::error::Result;

pub mod memory;
pub mod tcp;

/// Outcome of a single non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// This many bytes were appended to the buffer.
    Data(usize),
    /// Nothing available yet.
    WouldBlock,
    /// The peer closed the stream.
    EndOfStream,
}

#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Identifies one open connection.
    type Handle: Copy + Eq + fmt::Debug;

    /// Resolve a host name or literal address to a numeric address.
    async fn resolve(&mut self, host: &str) -> Result<IpAddr>;

    /// Open a connection to `addr`.
    async fn open(&mut self, addr: SocketAddr) -> Result<Self::Handle>;

    /// Append available bytes to `buf` without waiting.
    fn read(&mut self, handle: Self::Handle, buf: &mut BytesMut) -> Result<ReadStatus>;

    /// Queue `bytes` for sending.
    fn write(&mut self, handle: Self::Handle, bytes: &[u8]) -> Result<()>;

    /// Push out anything `write` could not send immediately.
    fn flush(&mut self, _handle: Self::Handle) -> Result<()> {
        Ok(())
    }

    /// Close the connection. Unknown handles are ignored.
    fn close(&mut self, handle: Self::Handle);
}
