//! End-to-end tests over real TCP sockets against a minimal login server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use login_link::config::SupervisorConfig;
use login_link::error::{LinkError, RejectReason};
use login_link::service::runner;
use login_link::transport::tcp::TcpTransport;
use login_link::{LinkEvents, LoginLink, Phase};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Accept one connection, check the handshake, answer with `status` and
/// return everything the client sent after it until it hung up.
async fn login_server(listener: TcpListener, status: u8) -> (Vec<u8>, Vec<u8>) {
    let (mut socket, _) = listener.accept().await.unwrap();

    let mut hello = vec![0u8; 50];
    socket.read_exact(&mut hello).await.unwrap();
    socket.write_all(&[0x11, 0x28, status]).await.unwrap();

    let mut rest = Vec::new();
    let _ = socket.read_to_end(&mut rest).await;
    (hello, rest)
}

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

async fn tcp_link<E: LinkEvents>(addr: SocketAddr, events: E) -> LoginLink<TcpTransport, E> {
    let mut link = LoginLink::new(TcpTransport::new(), events);
    link.set_credentials("map01", "secret").unwrap();
    link.set_remote_address(&addr.ip().to_string()).await.unwrap();
    link.set_port(addr.port());
    link
}

/// Stops the runner as soon as the link is ready.
struct StopWhenReady {
    shutdown_tx: mpsc::Sender<()>,
    ready: usize,
}

impl LinkEvents for StopWhenReady {
    fn on_ready(&mut self) {
        self.ready += 1;
        let _ = self.shutdown_tx.try_send(());
    }
}

#[tokio::test]
async fn test_runner_connects_and_shuts_down() {
    let (listener, addr) = bind().await;
    let server = tokio::spawn(login_server(listener, 0));

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let mut link = tcp_link(
        addr,
        StopWhenReady {
            shutdown_tx,
            ready: 0,
        },
    )
    .await;

    let config = SupervisorConfig {
        initial_delay: Duration::ZERO,
        check_interval: Duration::from_millis(20),
        poll_interval: Duration::from_millis(5),
        ..SupervisorConfig::default()
    };
    timeout(Duration::from_secs(5), runner::run(&mut link, &config, shutdown_rx))
        .await
        .expect("runner finished")
        .expect("runner ok");

    assert_eq!(link.events().ready, 1);
    assert!(!link.is_connected());
    assert_eq!(link.metrics().snapshot().handshakes_accepted, 1);

    let (hello, rest) = timeout(Duration::from_secs(5), server)
        .await
        .expect("server finished")
        .unwrap();
    assert_eq!(&hello[..2], &[0x20, 0x27]);
    assert_eq!(&hello[2..7], b"map01");
    assert_eq!(&hello[26..32], b"secret");
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_runner_rejects_zero_intervals() {
    let (_listener, addr) = bind().await;
    let mut link = tcp_link(addr, ()).await;
    let (_tx, rx) = mpsc::channel(1);

    let config = SupervisorConfig {
        poll_interval: Duration::ZERO,
        ..SupervisorConfig::default()
    };
    assert!(matches!(
        runner::run(&mut link, &config, rx).await,
        Err(LinkError::ConfigError(_))
    ));
}

#[tokio::test]
async fn test_rejection_over_tcp() {
    let (listener, addr) = bind().await;
    let server = tokio::spawn(login_server(listener, 1));
    let mut link = tcp_link(addr, ()).await;

    link.begin_connect(Instant::now()).await.unwrap();

    let outcome = timeout(Duration::from_secs(5), async {
        loop {
            if let Err(e) = link.poll(Instant::now()) {
                return e;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("login server answered");

    assert!(matches!(
        outcome,
        LinkError::HandshakeRejected(RejectReason::BadCredentials)
    ));
    assert_eq!(link.phase(), Phase::Rejected);

    // the server sees the connection close
    timeout(Duration::from_secs(5), server)
        .await
        .expect("server finished")
        .unwrap();
}

#[tokio::test]
async fn test_connect_refused_over_tcp() {
    let (listener, addr) = bind().await;
    drop(listener);

    let mut link = tcp_link(addr, ()).await;
    match link.begin_connect(Instant::now()).await {
        Err(LinkError::Connect { addr: failed, .. }) => assert_eq!(failed, addr),
        other => panic!("expected connect error, got {other:?}"),
    }
    assert_eq!(link.phase(), Phase::Disconnected);
}

#[tokio::test]
async fn test_server_hangup_is_detected() {
    let (listener, addr) = bind().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut hello = vec![0u8; 50];
        socket.read_exact(&mut hello).await.unwrap();
        socket.write_all(&[0x11, 0x28, 0x00]).await.unwrap();
        // dropping the socket closes it
    });
    let mut link = tcp_link(addr, ()).await;
    link.begin_connect(Instant::now()).await.unwrap();
    server.await.unwrap();

    let outcome = timeout(Duration::from_secs(5), async {
        loop {
            if let Err(e) = link.poll(Instant::now()) {
                return e;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("hangup detected");

    assert!(matches!(outcome, LinkError::ConnectionClosed));
    assert_eq!(link.metrics().snapshot().handshakes_accepted, 1);
    assert_eq!(link.phase(), Phase::Disconnected);
}
