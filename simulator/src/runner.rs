use anyhow::{Context, Result};
use pid_link::{ControlLoop, ParameterChannel, Process};
use std::future::Future;
use std::io;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

/// Run `control` once per sampling period until `shutdown` resolves
///
/// `shutdown` is polled across the whole run, so a request that arrives
/// while a step executes is seen on the next loop iteration.
pub async fn run_until<P, C, F>(control: &mut ControlLoop<P, C>, shutdown: F) -> Result<()>
where
    P: Process,
    C: ParameterChannel,
    F: Future<Output = io::Result<()>>,
{
    // tokio intervals reject a zero period
    let mut ticker = interval(control.period().max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("Failed to wait for shutdown")?;
                info!("Shutting down after {} cycles", control.cycles());
                return Ok(());
            }
            _ = ticker.tick() => {
                control.step();
            }
        }
    }
}
