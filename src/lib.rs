//! # login-link
//!
//! Client core for the link between a server process and its login server.
//!
//! The crate keeps exactly one outbound connection alive: it sends the
//! credential handshake, frames inbound bytes with a per-command length table,
//! dispatches the two commands the login server sends back (connection result
//! and pong), and watches liveness with ping/pong. A scheduler calls
//! [`LoginLink::ensure_connected`] at a fixed interval to bring the link back
//! after any failure.
//!
//! ## Layout
//! - [`core`]: wire constants, the length table and the frame codec
//! - [`protocol`]: messages, dispatcher, handshake state machine, liveness
//! - [`transport`]: the [`transport::Transport`] seam plus TCP and in-memory implementations
//! - [`service`]: the connection supervisor and its tokio-driven runner
//! - [`config`], [`error`], [`utils`]: ambient configuration, errors, logging and metrics
//!
//! ## Example
//! ```no_run
//! use login_link::config::LinkConfig;
//! use login_link::service::{runner, LoginLink};
//! use login_link::transport::tcp::TcpTransport;
//!
//! # async fn start() -> login_link::error::Result<()> {
//! let config = LinkConfig::from_file("conf/login-link.toml")?;
//! let mut link = LoginLink::from_config(TcpTransport::new(), (), &config).await?;
//! runner::run_until_ctrl_c(&mut link, &config.supervisor).await
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::core::codec::LoginCodec;
pub use crate::core::packet::{Credentials, InboundMessage, PacketLen, PacketLengthTable};
pub use crate::error::{FramingError, LinkError, RejectReason, Result};
pub use crate::protocol::handshake::Phase;
pub use crate::service::{LinkEvents, LoginLink};
