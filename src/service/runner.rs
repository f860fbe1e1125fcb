//! Scheduler for a [`LoginLink`].
//!
//! Runs the connection check on a fixed interval after an initial delay and
//! a read cycle on a shorter one, until a shutdown signal arrives.

use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::config::SupervisorConfig;
use crate::error::{LinkError, Result};
use crate::service::supervisor::{LinkEvents, LoginLink};
use crate::transport::Transport;

/// Drive `link` until `shutdown_rx` yields or its senders are dropped.
///
/// The live connection is closed before returning.
#[instrument(skip_all, fields(check_interval = ?config.check_interval))]
pub async fn run<T, E>(
    link: &mut LoginLink<T, E>,
    config: &SupervisorConfig,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()>
where
    T: Transport,
    E: LinkEvents,
{
    if config.check_interval.is_zero() || config.poll_interval.is_zero() {
        return Err(LinkError::ConfigError(
            "Supervisor intervals must be greater than 0".to_string(),
        ));
    }

    let start = tokio::time::Instant::now() + config.initial_delay;
    let mut connect_check = interval_at(start, config.check_interval);
    connect_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut read_cycle = interval(config.poll_interval);
    read_cycle.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Login server link supervisor started");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down login server link");
                link.shutdown();
                link.metrics().log_metrics();
                return Ok(());
            }

            _ = connect_check.tick() => {
                if let Err(e) = link.ensure_connected(Instant::now()).await {
                    warn!(error = %e, "Login server connection attempt failed");
                }
            }

            _ = read_cycle.tick() => {
                if let Err(e) = link.poll(Instant::now()) {
                    debug!(error = %e, "Read cycle ended the login server connection");
                }
            }
        }
    }
}

/// Like [`run`], stopping on CTRL+C.
pub async fn run_until_ctrl_c<T, E>(
    link: &mut LoginLink<T, E>,
    config: &SupervisorConfig,
) -> Result<()>
where
    T: Transport,
    E: LinkEvents,
{
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    run(link, config, shutdown_rx).await
}
