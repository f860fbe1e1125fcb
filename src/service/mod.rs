//! # Connection Supervision
//!
//! [`LoginLink`] owns the one connection to the login server and exposes the
//! operations a scheduler needs. [`runner`] is a tokio scheduler that calls
//! them on fixed intervals.

pub mod runner;
pub mod supervisor;

pub use supervisor::{LinkEvents, LoginLink};
