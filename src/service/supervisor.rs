//! Connection supervisor for the login-server link.
//!
//! [`LoginLink`] owns the single connection slot. It opens the transport,
//! sends the handshake, runs read cycles (read, liveness, decode, dispatch),
//! and tears the connection down on any fatal condition. It never schedules
//! anything itself: an outside scheduler calls [`LoginLink::ensure_connected`]
//! and [`LoginLink::poll`].

use bytes::{Buf, BytesMut};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::codec::Encoder;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{LinkConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_LOGIN_PORT};
use crate::core::codec::LoginCodec;
use crate::core::packet::{Credentials, PacketLengthTable};
use crate::error::{constants, LinkError, RejectReason, Result};
use crate::protocol::dispatcher::{dispatch, CommandHandler};
use crate::protocol::handshake::{Handshake, Phase};
use crate::protocol::liveness::{LivenessMonitor, LivenessVerdict, DEFAULT_STALL_TIME};
use crate::protocol::message::{ConnectionStatus, OutboundMessage};
use crate::transport::{ReadStatus, Transport};
use crate::utils::metrics::LinkMetrics;

/// Lifecycle callbacks for the owning server.
pub trait LinkEvents {
    /// The login server accepted our credentials; normal traffic may begin.
    fn on_ready(&mut self) {}

    /// The connection is gone. `cause` says why.
    fn on_disconnect(&mut self, _cause: &LinkError) {}
}

impl LinkEvents for () {}

struct Session<H> {
    /// Distinguishes this connection from any later one.
    id: u64,
    handle: H,
    rbuf: BytesMut,
}

/// The single supervised connection to the login server.
pub struct LoginLink<T: Transport, E: LinkEvents = ()> {
    transport: T,
    events: E,
    credentials: Credentials,
    host: String,
    ip: Option<IpAddr>,
    port: u16,
    codec: LoginCodec,
    handshake: Handshake,
    liveness: LivenessMonitor,
    session: Option<Session<T::Handle>>,
    next_session_id: u64,
    connect_timeout: Duration,
    metrics: Arc<LinkMetrics>,
}

impl<T: Transport, E: LinkEvents> LoginLink<T, E> {
    pub fn new(transport: T, events: E) -> Self {
        Self {
            transport,
            events,
            credentials: Credentials::default(),
            host: String::new(),
            ip: None,
            port: DEFAULT_LOGIN_PORT,
            codec: LoginCodec::default(),
            handshake: Handshake::new(),
            liveness: LivenessMonitor::new(DEFAULT_STALL_TIME, Instant::now()),
            session: None,
            next_session_id: 0,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            metrics: Arc::new(LinkMetrics::new()),
        }
    }

    /// Build a link from configuration, resolving the login server address.
    ///
    /// The configuration is validated first; nothing is resolved for an
    /// invalid one.
    pub async fn from_config(transport: T, events: E, config: &LinkConfig) -> Result<Self> {
        config.validate_strict()?;

        let mut link = Self::new(transport, events);
        link.set_credentials(&config.login.userid, &config.login.passwd)?;
        link.set_port(config.login.port);
        link.set_stall_time(config.liveness.stall_time);
        link.set_connect_timeout(config.supervisor.connect_timeout);
        link.set_remote_address(&config.login.address).await?;
        link.check_default_login();
        Ok(link)
    }

    /// Replace the inbound length table.
    pub fn with_length_table(mut self, table: PacketLengthTable) -> Self {
        self.codec = LoginCodec::new(table);
        self
    }

    pub fn set_credentials(&mut self, userid: &str, passwd: &str) -> Result<()> {
        self.credentials = Credentials::new(userid, passwd)?;
        Ok(())
    }

    /// Warn when the stock `s1`/`p1` credentials are in use.
    pub fn check_default_login(&self) -> bool {
        let is_default = self.credentials.is_default();
        if is_default {
            warn!("Using the default user/password s1/p1 is NOT RECOMMENDED");
            info!("Create a proper inter-server account on the login server and update the link credentials");
        }
        is_default
    }

    /// Resolve and store the login server address.
    ///
    /// On failure the previously stored address is kept.
    #[instrument(skip(self))]
    pub async fn set_remote_address(&mut self, host: &str) -> Result<IpAddr> {
        match self.transport.resolve(host).await {
            Ok(ip) => {
                self.ip = Some(ip);
                self.host = host.to_string();
                info!(host, %ip, "Login server address resolved");
                Ok(ip)
            }
            Err(e) => {
                warn!(host, error = %e, "Failed to resolve login server address");
                Err(e)
            }
        }
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn set_stall_time(&mut self, stall_time: Duration) {
        self.liveness.set_stall_time(stall_time);
    }

    /// Bound on a single transport `open`.
    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    pub fn phase(&self) -> Phase {
        self.handshake.phase()
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    /// Whether a transport connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn handle(&self) -> Option<T::Handle> {
        self.session.as_ref().map(|session| session.handle)
    }

    /// Textual address as configured, for diagnostics.
    pub fn remote_host(&self) -> &str {
        &self.host
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.ip.map(|ip| SocketAddr::new(ip, self.port))
    }

    pub fn ping_sent(&self) -> bool {
        self.liveness.ping_sent()
    }

    pub fn metrics(&self) -> &LinkMetrics {
        &self.metrics
    }

    /// Shared handle to the counters, readable while the link is being driven.
    pub fn metrics_handle(&self) -> Arc<LinkMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    /// Open the transport and send the handshake.
    ///
    /// A no-op while a connection is being made or already exists.
    #[instrument(skip(self, now), fields(host = %self.host, port = self.port))]
    pub async fn begin_connect(&mut self, now: Instant) -> Result<()> {
        if !self.phase().is_idle() {
            debug!(phase = ?self.phase(), "Connect requested while already connecting or connected");
            return Ok(());
        }
        let Some(ip) = self.ip else {
            return Err(LinkError::ConfigError(
                constants::ERR_ADDRESS_NOT_SET.to_string(),
            ));
        };
        let addr = SocketAddr::new(ip, self.port);

        self.handshake.begin()?;
        self.metrics.connect_attempt();
        info!(%addr, "Attempting to connect to login server");

        let attempt = tokio::time::timeout(self.connect_timeout, self.transport.open(addr));
        let opened = match attempt.await {
            Ok(result) => result,
            Err(_) => Err(LinkError::Connect {
                addr,
                source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
            }),
        };
        let handle = match opened {
            Ok(handle) => handle,
            Err(e) => {
                self.handshake.connect_failed();
                self.metrics.connect_failed();
                warn!(%addr, error = %e, "Could not connect to login server");
                return Err(e);
            }
        };

        self.next_session_id += 1;
        self.session = Some(Session {
            id: self.next_session_id,
            handle,
            rbuf: BytesMut::new(),
        });
        self.liveness.reset(now);
        self.metrics.connection_established();

        let hello = self.handshake.established(&self.credentials)?;
        debug!(userid = %self.credentials.userid_lossy(), "Sending handshake");
        self.send(hello)
    }

    /// Connect if no connection exists. Meant to be called on a fixed interval.
    pub async fn ensure_connected(&mut self, now: Instant) -> Result<()> {
        if self.session.is_some() || !self.phase().is_idle() {
            return Ok(());
        }
        self.begin_connect(now).await
    }

    /// Run one read cycle.
    ///
    /// Returns the cause when the cycle ended the connection; by then the
    /// transport is closed and `on_disconnect` has fired.
    pub fn poll(&mut self, now: Instant) -> Result<()> {
        let status = {
            let Some(session) = self.session.as_mut() else {
                return Ok(());
            };
            let handle = session.handle;
            match self.transport.flush(handle) {
                Ok(()) => self.transport.read(handle, &mut session.rbuf),
                Err(e) => Err(e),
            }
        };

        match status {
            Ok(ReadStatus::Data(n)) => {
                self.liveness.record_activity(now);
                self.metrics.bytes_read(n as u64);
            }
            Ok(ReadStatus::WouldBlock) => {}
            Ok(ReadStatus::EndOfStream) => return Err(self.teardown(LinkError::ConnectionClosed)),
            Err(e) => return Err(self.teardown(e)),
        }

        match self.liveness.check(now) {
            LivenessVerdict::Alive => {}
            LivenessVerdict::SendPing => {
                debug!(idle = ?self.liveness.idle(now), "Link stalled, sending ping");
                self.metrics.ping_sent();
                self.send(OutboundMessage::Ping)?;
            }
            LivenessVerdict::Expired => {
                self.metrics.liveness_timeout();
                return Err(self.teardown(LinkError::LivenessTimeout));
            }
        }

        self.parse()
    }

    /// Close any live connection. Does not fire `on_disconnect`.
    pub fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            self.transport.close(session.handle);
            self.metrics.disconnected();
            info!("Closed login server connection");
        }
        self.handshake = Handshake::new();
    }

    /// Decode and dispatch every complete message in the read buffer.
    fn parse(&mut self) -> Result<()> {
        loop {
            let Some(session) = self.session.as_ref() else {
                return Ok(());
            };
            let id = session.id;

            let header = match self.codec.peek(&session.rbuf) {
                Ok(Some(header)) => header,
                Ok(None) => return Ok(()),
                Err(e) => {
                    self.metrics.framing_error();
                    warn!(error = %e, "Framing error on login server connection");
                    return Err(self.teardown(e.into()));
                }
            };
            let msg = header.message(&session.rbuf);

            debug!(
                code = format_args!("0x{:04x}", msg.code),
                len = header.len,
                "Received packet from login server"
            );
            self.metrics.message_received();

            if let Err(e) = dispatch(&mut LinkHandlers { link: self }, &msg) {
                if matches!(e, LinkError::Framing(_)) {
                    self.metrics.framing_error();
                }
                return Err(if self.is_current(id) {
                    self.teardown(e)
                } else {
                    e
                });
            }

            // the handler may have replaced or dropped the connection
            match self.session.as_mut() {
                Some(session) if session.id == id => session.rbuf.advance(header.len),
                _ => return Ok(()),
            }
        }
    }

    fn is_current(&self, id: u64) -> bool {
        self.session.as_ref().is_some_and(|session| session.id == id)
    }

    fn send(&mut self, msg: OutboundMessage) -> Result<()> {
        let Some(handle) = self.handle() else {
            return Err(LinkError::ConnectionClosed);
        };

        let mut buf = BytesMut::with_capacity(msg.encoded_len());
        self.codec.encode(msg, &mut buf)?;

        match self.transport.write(handle, &buf) {
            Ok(()) => {
                self.metrics.message_sent(buf.len() as u64);
                Ok(())
            }
            Err(e) => Err(self.teardown(e)),
        }
    }

    /// Close the connection, reset the handshake and notify the owner.
    fn teardown(&mut self, cause: LinkError) -> LinkError {
        if let Some(session) = self.session.take() {
            self.transport.close(session.handle);
            self.handshake.reset();
            self.metrics.disconnected();
            warn!(error = %cause, "Connection to login server lost");
            self.events.on_disconnect(&cause);
        }
        cause
    }
}

impl<T: Transport, E: LinkEvents> Drop for LoginLink<T, E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Command handlers, borrowing the link for the duration of one dispatch.
struct LinkHandlers<'a, T: Transport, E: LinkEvents> {
    link: &'a mut LoginLink<T, E>,
}

impl<T: Transport, E: LinkEvents> CommandHandler for LinkHandlers<'_, T, E> {
    fn on_connection_result(&mut self, status: ConnectionStatus) -> Result<()> {
        let link = &mut *self.link;
        match link.handshake.on_result(status)? {
            ConnectionStatus::Accepted => {
                link.metrics.handshake_accepted();
                info!(host = %link.host, "Connected to login server");
                link.events.on_ready();
                Ok(())
            }
            ConnectionStatus::Rejected(reason) => {
                link.metrics.handshake_rejected();
                log_rejection(reason);
                Err(link.teardown(LinkError::HandshakeRejected(reason)))
            }
        }
    }

    fn on_pong(&mut self) -> Result<()> {
        self.link.liveness.pong_received();
        self.link.metrics.pong_received();
        Ok(())
    }
}

fn log_rejection(reason: RejectReason) {
    match reason {
        RejectReason::BadCredentials => {
            error!("Can not connect to login server: the inter-server user/password is invalid");
            error!("Make sure the login database holds a server account matching the link credentials");
        }
        RejectReason::AddressNotPermitted => {
            error!("Can not connect to login server: this address is not allowed");
            error!("Make sure the address is permitted in the login server network configuration");
        }
        RejectReason::Unknown(status) => {
            error!(status, "Invalid response from the login server");
        }
    }
}
