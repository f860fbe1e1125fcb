use bytes::{Buf, BytesMut};
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, instrument};

use crate::error::{LinkError, Result};
use crate::transport::{ReadStatus, Transport};

/// Upper bound on bytes pulled from one socket in a single read cycle.
const MAX_READ_PER_CYCLE: usize = 64 * 1024;
const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TcpHandle(u64);

struct TcpConnection {
    stream: TcpStream,
    pending: BytesMut,
}

/// Non-blocking TCP transport on top of tokio.
///
/// Must be used from within a tokio runtime; readiness is tracked by the
/// runtime's I/O driver between read cycles.
#[derive(Default)]
pub struct TcpTransport {
    connections: HashMap<TcpHandle, TcpConnection>,
    next_id: u64,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn connection(&mut self, handle: TcpHandle) -> Result<&mut TcpConnection> {
        self.connections
            .get_mut(&handle)
            .ok_or(LinkError::ConnectionClosed)
    }
}

impl TcpConnection {
    fn flush_pending(&mut self) -> Result<()> {
        while !self.pending.is_empty() {
            match self.stream.try_write(&self.pending) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
                Ok(n) => self.pending.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl Transport for TcpTransport {
    type Handle = TcpHandle;

    #[instrument(skip(self))]
    async fn resolve(&mut self, host: &str) -> Result<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let resolution_error = || LinkError::Resolution {
            host: host.to_string(),
        };
        let addrs: Vec<SocketAddr> = lookup_host((host, 0))
            .await
            .map_err(|_| resolution_error())?
            .collect();

        addrs
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| addrs.first())
            .map(|addr| addr.ip())
            .ok_or_else(resolution_error)
    }

    #[instrument(skip(self))]
    async fn open(&mut self, addr: SocketAddr) -> Result<TcpHandle> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| LinkError::Connect { addr, source })?;
        stream.set_nodelay(true)?;

        self.next_id += 1;
        let handle = TcpHandle(self.next_id);
        self.connections.insert(
            handle,
            TcpConnection {
                stream,
                pending: BytesMut::new(),
            },
        );
        debug!(?handle, %addr, "TCP connection opened");
        Ok(handle)
    }

    fn read(&mut self, handle: TcpHandle, buf: &mut BytesMut) -> Result<ReadStatus> {
        let conn = self.connection(handle)?;
        let mut total = 0;

        while total < MAX_READ_PER_CYCLE {
            buf.reserve(READ_CHUNK);
            match conn.stream.try_read_buf(buf) {
                Ok(0) if total == 0 => return Ok(ReadStatus::EndOfStream),
                // end of stream is reported again on the next cycle
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if total == 0 {
            Ok(ReadStatus::WouldBlock)
        } else {
            Ok(ReadStatus::Data(total))
        }
    }

    fn write(&mut self, handle: TcpHandle, bytes: &[u8]) -> Result<()> {
        let conn = self.connection(handle)?;
        conn.pending.extend_from_slice(bytes);
        conn.flush_pending()
    }

    fn flush(&mut self, handle: TcpHandle) -> Result<()> {
        self.connection(handle)?.flush_pending()
    }

    fn close(&mut self, handle: TcpHandle) {
        if self.connections.remove(&handle).is_some() {
            debug!(?handle, "TCP connection closed");
        }
    }
}
