use anyhow::{Context, Result};
use pid_link::config::{link, load_or_initialize, SettingsStore};
use pid_link::{ControlLoop, FirstOrderPlant, OutputLimits, PidController, Session};
use pid_link_sim::{run_until, SettingsFile, UdpLink};
use std::env;
use tracing::{info, warn};

fn env_f32(name: &str) -> Result<Option<f32>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<f32>()
            .map(Some)
            .with_context(|| format!("{} is not a number: {}", name, value)),
        Err(_) => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (also collects the controller crate's log records)
    tracing_subscriber::fmt()
        .with_env_filter("pid_link_sim=debug,pid_link=debug,info")
        .init();

    let bind_addr = env::var("PID_LINK_BIND").unwrap_or_else(|_| link::DEFAULT_BIND_ADDR.into());
    let settings_path =
        env::var("PID_LINK_SETTINGS").unwrap_or_else(|_| link::DEFAULT_SETTINGS_PATH.into());

    let mut store = SettingsFile::new(settings_path);
    let mut settings = load_or_initialize(&mut store);

    let limits = OutputLimits::from_pair(
        env_f32("PID_LINK_OUTPUT_MIN")?,
        env_f32("PID_LINK_OUTPUT_MAX")?,
    )
    .context("Invalid output limits")?;
    if limits != OutputLimits::Unbounded {
        settings.output_limits = limits;
    }
    if let Some(setpoint) = env_f32("PID_LINK_SETPOINT")? {
        settings.setpoint = setpoint;
    }

    let controller =
        PidController::new(settings.to_config()).context("Invalid controller configuration")?;
    info!(
        "Controller ready: Kp={}, Ki={}, Kd={}, Ts={}s, setpoint={}, limits={:?}",
        settings.gains.kp,
        settings.gains.ki,
        settings.gains.kd,
        settings.sampling_period,
        settings.setpoint,
        settings.output_limits
    );

    let plant = FirstOrderPlant::with_defaults(settings.sampling_period);
    let link = UdpLink::bind(&bind_addr).await?;
    let session = Session::open(link);

    // PID_LINK_REPORT_OUTPUT=1 switches telemetry to 8-byte measurement + output reports
    let report_output = env::var("PID_LINK_REPORT_OUTPUT").is_ok_and(|v| v == "1");
    let mut control =
        ControlLoop::new(controller, plant, session).with_output_reporting(report_output);

    run_until(&mut control, tokio::signal::ctrl_c()).await?;

    // Dropping the session stops the link
    let (controller, _plant, session) = control.into_parts();
    drop(session);

    let settings = settings.with_gains(controller.gains());
    if let Err(e) = store.write(&settings) {
        warn!("Gains not saved to {}: {}", store.path().display(), e);
    }

    Ok(())
}
