//! # Protocol Layer
//!
//! Message types, command dispatch, the handshake state machine and the
//! ping/pong liveness monitor. Nothing here performs I/O; the supervisor in
//! [`crate::service`] feeds these pieces and acts on their results.

pub mod dispatcher;
pub mod handshake;
pub mod liveness;
pub mod message;
