// Simulated process driven by the control loop

use crate::config::plant::{DEFAULT_GAIN, DEFAULT_INITIAL_VALUE, DEFAULT_TIME_CONSTANT_S};

/// Controlled process seen by the loop
pub trait Process {
    /// Sample the process variable
    fn measure(&mut self) -> f32;

    /// Apply the control signal for one sampling period
    fn apply(&mut self, output: f32);
}

/// First-order lag `tau * dy/dt = -y + K * u`
///
/// Discretised with a zero-order hold on the input:
/// `y[k+1] = a * y[k] + K * (1 - a) * u[k]`, `a = exp(-Ts / tau)`.
#[derive(Debug, Clone, Copy)]
pub struct FirstOrderPlant {
    gain: f32,
    /// exp(-Ts / tau), 0 when tau <= 0 (pure static gain)
    decay: f32,
    value: f32,
}

impl FirstOrderPlant {
    /// # Arguments
    /// * `gain` - Static gain K
    /// * `time_constant` - tau [s]
    /// * `sampling_period` - Ts [s]
    /// * `initial` - Initial process value
    pub fn new(gain: f32, time_constant: f32, sampling_period: f32, initial: f32) -> Self {
        let decay = if time_constant > 0.0 {
            libm::expf(-sampling_period / time_constant)
        } else {
            0.0
        };

        Self {
            gain,
            decay,
            value: initial,
        }
    }

    /// Plant with the default gain, time constant and initial value
    pub fn with_defaults(sampling_period: f32) -> Self {
        Self::new(
            DEFAULT_GAIN,
            DEFAULT_TIME_CONSTANT_S,
            sampling_period,
            DEFAULT_INITIAL_VALUE,
        )
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

impl Process for FirstOrderPlant {
    fn measure(&mut self) -> f32 {
        self.value
    }

    fn apply(&mut self, output: f32) {
        self.value = self.decay * self.value + self.gain * (1.0 - self.decay) * output;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Gains, PidConfig, PidController};

    #[test]
    fn test_step_response_settles_at_static_gain() {
        let mut plant = FirstOrderPlant::new(2.0, 1.0, 0.1, 0.0);
        for _ in 0..200 {
            plant.apply(3.0);
        }
        assert!((plant.measure() - 6.0).abs() < 1e-3);
    }

    #[test]
    fn test_one_time_constant() {
        // After t = tau the response reaches 1 - 1/e of the final value
        let mut plant = FirstOrderPlant::new(1.0, 1.0, 0.25, 0.0);
        for _ in 0..4 {
            plant.apply(1.0);
        }
        assert!((plant.value() - 0.632_120_6).abs() < 1e-4);
    }

    #[test]
    fn test_zero_time_constant_is_static_gain() {
        let mut plant = FirstOrderPlant::new(0.5, 0.0, 0.1, 7.0);
        plant.apply(4.0);
        assert_eq!(plant.measure(), 2.0);
    }

    #[test]
    fn test_closed_loop_reaches_setpoint() {
        let ts = 0.5;
        let mut pid =
            PidController::new(PidConfig::new(Gains::new(1.0, 0.1, 0.05), ts, 50.0)).unwrap();
        let mut plant = FirstOrderPlant::with_defaults(ts);

        for _ in 0..400 {
            let m = plant.measure();
            plant.apply(pid.compute(m));
        }
        assert!((plant.value() - 50.0).abs() < 0.05);
    }
}
