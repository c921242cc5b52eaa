//! Send one gain update to a running simulator and print its telemetry
//!
//! Usage: pid-link-tune <kp> <ki> <kd> [target] [seconds]

use anyhow::{bail, Context, Result};
use pid_link::config::link;
use pid_link::{protocol, Gains};
use std::env;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Duration, Instant};
use tracing::{info, warn};

fn parse_arg(args: &[String], index: usize, name: &str) -> Result<f32> {
    let Some(value) = args.get(index) else {
        bail!("Missing {} (usage: pid-link-tune <kp> <ki> <kd> [target] [seconds])", name);
    };
    value
        .parse()
        .with_context(|| format!("{} is not a number: {}", name, value))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("pid_link_tune=debug,info")
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let gains = Gains::new(
        parse_arg(&args, 0, "kp")?,
        parse_arg(&args, 1, "ki")?,
        parse_arg(&args, 2, "kd")?,
    );
    if !gains.is_finite() {
        bail!("Gains must be finite numbers");
    }
    let target = args
        .get(3)
        .cloned()
        .unwrap_or_else(|| link::DEFAULT_BIND_ADDR.into());
    let seconds: u64 = match args.get(4) {
        Some(value) => value
            .parse()
            .with_context(|| format!("seconds is not an integer: {}", value))?,
        None => 3,
    };

    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("Failed to bind UDP socket")?;
    socket
        .connect(&target)
        .await
        .with_context(|| format!("Failed to reach {}", target))?;

    socket
        .send(&protocol::encode_gains(gains))
        .await
        .context("Failed to send gains")?;
    info!(
        "Sent gains to {}: Kp={}, Ki={}, Kd={}",
        target, gains.kp, gains.ki, gains.kd
    );

    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut buf = [0u8; 16];
    let mut count = 0usize;

    while let Ok(received) = timeout_at(deadline, socket.recv(&mut buf)).await {
        let len = received.context("Failed to receive telemetry")?;
        let data = &buf[..len];
        if let Some(measurement) = protocol::decode_telemetry(data) {
            count += 1;
            println!("{:>6} measurement={:>12.4}", count, measurement);
        } else if let Some((measurement, output)) = protocol::decode_report(data) {
            count += 1;
            println!(
                "{:>6} measurement={:>12.4} output={:>12.4}",
                count, measurement, output
            );
        } else {
            warn!("Unexpected {}-byte datagram", len);
        }
    }

    // Empty datagram detaches this client
    socket.send(&[]).await.context("Failed to detach")?;
    info!("Received {} telemetry values", count);
    Ok(())
}
