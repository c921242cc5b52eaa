//! Closed control loop
//!
//! One `step` per sampling period: measure, compute, drive the process,
//! report to the peer, then apply at most one pending gain update. The owner
//! provides the timing (`period()`) and the transport lifecycle.

use core::time::Duration;

use crate::channel::ParameterChannel;
use crate::config::DEFAULT_LOG_EVERY;
use crate::controller::{Gains, PidController};
use crate::plant::Process;

/// Outcome of one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    pub measurement: f32,
    pub output: f32,
    /// Gains applied at the end of the cycle, if an update was pending
    pub applied: Option<Gains>,
}

pub struct ControlLoop<P: Process, C: ParameterChannel> {
    controller: PidController,
    process: P,
    channel: C,
    /// Send measurement + output reports instead of plain telemetry
    report_output: bool,
    cycles: u32,
    log_every: u32,
}

impl<P: Process, C: ParameterChannel> ControlLoop<P, C> {
    pub fn new(controller: PidController, process: P, channel: C) -> Self {
        Self {
            controller,
            process,
            channel,
            report_output: false,
            cycles: 0,
            log_every: DEFAULT_LOG_EVERY,
        }
    }

    pub fn with_output_reporting(mut self, enabled: bool) -> Self {
        self.report_output = enabled;
        self
    }

    /// Summary log interval [cycles], 0 disables it
    pub fn with_log_every(mut self, cycles: u32) -> Self {
        self.log_every = cycles;
        self
    }

    /// Run one sampling period
    pub fn step(&mut self) -> CycleReport {
        let measurement = self.process.measure();
        let output = self.controller.compute(measurement);
        self.process.apply(output);

        if self.report_output {
            self.channel.send_report(measurement, output);
        } else {
            self.channel.send(measurement);
        }

        // Gains change only here, between two compute calls
        let applied = self.channel.poll_gains();
        if let Some(gains) = applied {
            self.controller.apply_gains(gains);
            info!(
                "Gains applied: Kp={}, Ki={}, Kd={}",
                gains.kp, gains.ki, gains.kd
            );
        }

        self.cycles = self.cycles.wrapping_add(1);
        if self.log_every != 0 && self.cycles % self.log_every == 0 {
            debug!(
                "[PID] cycle={}, measurement={}, output={}, integral={}, saturated={}",
                self.cycles,
                measurement,
                output,
                self.controller.integral(),
                self.controller.is_saturated()
            );
        }

        CycleReport {
            measurement,
            output,
            applied,
        }
    }

    /// Sampling period as a timer duration
    pub fn period(&self) -> Duration {
        Duration::try_from_secs_f32(self.controller.sampling_period()).unwrap_or(Duration::MAX)
    }

    pub fn controller(&self) -> &PidController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PidController {
        &mut self.controller
    }

    pub fn process(&self) -> &P {
        &self.process
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Completed cycles (wraps)
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn into_parts(self) -> (PidController, P, C) {
        (self.controller, self.process, self.channel)
    }
}
