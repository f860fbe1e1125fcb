//! # Utility Modules
//!
//! Supporting utilities shared by the link.
//!
//! ## Components
//! - **Logging**: `tracing-subscriber` setup driven by [`crate::config::LoggingConfig`]
//! - **Metrics**: atomic counters for connects, handshakes, traffic and failures

pub mod logging;
pub mod metrics;

pub use metrics::{LinkMetrics, MetricsSnapshot};
