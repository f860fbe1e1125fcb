//! In-process transport.
//!
//! [`MemoryTransport`] is handed to the supervisor while the matching
//! [`MemoryPeer`] plays the login server: it feeds inbound bytes, inspects
//! what was sent, closes the stream and makes resolution or connects fail.

use bytes::{Buf, BytesMut};
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{LinkError, Result};
use crate::transport::{ReadStatus, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryHandle(u64);

#[derive(Debug, Default)]
struct PeerState {
    hosts: HashMap<String, IpAddr>,
    refuse_connections: bool,
    next_id: u64,
    open: Option<MemoryHandle>,
    last_addr: Option<SocketAddr>,
    inbound: BytesMut,
    outbound: BytesMut,
    end_of_stream: bool,
    opened: usize,
    closed: usize,
}

fn lock(state: &Mutex<PeerState>) -> MutexGuard<'_, PeerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub struct MemoryTransport {
    state: Arc<Mutex<PeerState>>,
}

/// The remote end of a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    state: Arc<Mutex<PeerState>>,
}

impl MemoryTransport {
    /// Create a transport and the peer that controls it.
    pub fn pair() -> (MemoryTransport, MemoryPeer) {
        let state = Arc::new(Mutex::new(PeerState::default()));
        (
            MemoryTransport {
                state: Arc::clone(&state),
            },
            MemoryPeer { state },
        )
    }

    fn check_open(state: &PeerState, handle: MemoryHandle) -> Result<()> {
        if state.open == Some(handle) {
            Ok(())
        } else {
            Err(LinkError::ConnectionClosed)
        }
    }
}

impl MemoryPeer {
    /// Make `host` resolve to `ip`. Literal addresses always resolve.
    pub fn add_host(&self, host: &str, ip: IpAddr) {
        lock(&self.state).hosts.insert(host.to_string(), ip);
    }

    pub fn refuse_connections(&self, refuse: bool) {
        lock(&self.state).refuse_connections = refuse;
    }

    /// Queue bytes for the next read on the open connection.
    pub fn send(&self, bytes: &[u8]) {
        lock(&self.state).inbound.extend_from_slice(bytes);
    }

    /// Signal end of stream on the open connection.
    pub fn close(&self) {
        lock(&self.state).end_of_stream = true;
    }

    /// Take everything written since the last call.
    pub fn take_sent(&self) -> Vec<u8> {
        let mut state = lock(&self.state);
        let len = state.outbound.len();
        state.outbound.split_to(len).to_vec()
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).open.is_some()
    }

    /// Number of connections opened so far.
    pub fn opened(&self) -> usize {
        lock(&self.state).opened
    }

    /// Number of connections closed by the local side so far.
    pub fn closed(&self) -> usize {
        lock(&self.state).closed
    }

    /// Address of the most recent connection attempt.
    pub fn last_addr(&self) -> Option<SocketAddr> {
        lock(&self.state).last_addr
    }
}

impl Transport for MemoryTransport {
    type Handle = MemoryHandle;

    async fn resolve(&mut self, host: &str) -> Result<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }
        lock(&self.state)
            .hosts
            .get(host)
            .copied()
            .ok_or_else(|| LinkError::Resolution {
                host: host.to_string(),
            })
    }

    async fn open(&mut self, addr: SocketAddr) -> Result<MemoryHandle> {
        let mut state = lock(&self.state);
        state.last_addr = Some(addr);
        if state.refuse_connections {
            return Err(LinkError::Connect {
                addr,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            });
        }

        state.next_id += 1;
        let handle = MemoryHandle(state.next_id);
        state.open = Some(handle);
        state.opened += 1;
        state.inbound.clear();
        state.outbound.clear();
        state.end_of_stream = false;
        Ok(handle)
    }

    fn read(&mut self, handle: MemoryHandle, buf: &mut BytesMut) -> Result<ReadStatus> {
        let mut state = lock(&self.state);
        Self::check_open(&state, handle)?;

        if state.inbound.has_remaining() {
            let n = state.inbound.len();
            buf.extend_from_slice(&state.inbound);
            state.inbound.clear();
            return Ok(ReadStatus::Data(n));
        }
        if state.end_of_stream {
            return Ok(ReadStatus::EndOfStream);
        }
        Ok(ReadStatus::WouldBlock)
    }

    fn write(&mut self, handle: MemoryHandle, bytes: &[u8]) -> Result<()> {
        let mut state = lock(&self.state);
        Self::check_open(&state, handle)?;
        state.outbound.extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self, handle: MemoryHandle) {
        let mut state = lock(&self.state);
        if state.open == Some(handle) {
            state.open = None;
            state.closed += 1;
        }
    }
}
