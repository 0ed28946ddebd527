//! Drives a [`DeviceSimulator`] at its configured pace.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};
use warden_audit::ShutdownRx;

use crate::error::Result;
use crate::simulator::DeviceSimulator;

fn ticker(sim: &DeviceSimulator) -> Option<Interval> {
    let period = sim.config().interval();
    if period.is_zero() {
        return None;
    }
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(interval)
}

async fn pace(ticker: &mut Option<Interval>) {
    if let Some(interval) = ticker {
        interval.tick().await;
    }
}

fn exhausted(sim: &DeviceSimulator) -> bool {
    sim.config().count.is_some_and(|count| sim.emitted() >= count)
}

/// Writes events to `writer` as JSON lines until the configured count is
/// reached or `shutdown` fires. Returns the number of events written.
///
/// # Errors
///
/// Returns an error if an event cannot be serialized or written.
pub async fn run_to_writer<W>(
    sim: &mut DeviceSimulator,
    writer: &mut W,
    mut shutdown: ShutdownRx,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut ticker = ticker(sim);
    let mut shutdown_live = true;
    let mut written = 0u64;

    info!(device = %sim.config().device, count = ?sim.config().count, "simulator running");
    while !exhausted(sim) {
        tokio::select! {
            biased;

            signal = shutdown.recv(), if shutdown_live => {
                if matches!(signal, Err(tokio::sync::broadcast::error::RecvError::Closed)) {
                    shutdown_live = false;
                    continue;
                }
                debug!("simulator stop requested");
                break;
            }

            () = pace(&mut ticker) => {}
        }

        let mut line = sim.next_event().to_json()?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        written += 1;
    }

    info!(written, "simulator stopped");
    Ok(written)
}

/// Feeds events straight into an auditor channel until the configured count
/// is reached, `shutdown` fires, or the auditor stops receiving. Returns the
/// number of events delivered.
///
/// # Errors
///
/// Returns an error if an event cannot be serialized.
pub async fn run_to_channel(
    sim: &mut DeviceSimulator,
    events: &mpsc::Sender<String>,
    mut shutdown: ShutdownRx,
) -> Result<u64> {
    let mut ticker = ticker(sim);
    let mut shutdown_live = true;
    let mut delivered = 0u64;

    while !exhausted(sim) {
        tokio::select! {
            biased;

            signal = shutdown.recv(), if shutdown_live => {
                if matches!(signal, Err(tokio::sync::broadcast::error::RecvError::Closed)) {
                    shutdown_live = false;
                    continue;
                }
                break;
            }

            () = pace(&mut ticker) => {}
        }

        let line = sim.next_event().to_json()?;
        if events.send(line).await.is_err() {
            debug!("auditor closed the event channel");
            break;
        }
        delivered += 1;
    }

    Ok(delivered)
}
