// Discrete PID controller with anti-windup and a filtered derivative term

use core::fmt;

use crate::config::DEFAULT_FILTER_CONSTANT;

/// Configuration errors raised while building a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Sampling period is zero, negative or NaN
    NonPositiveSamplingPeriod,

    /// Only one of the two output bounds was supplied
    HalfSpecifiedLimits,

    /// Lower bound above the upper bound, or a bound is NaN
    InvertedLimits,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveSamplingPeriod => {
                write!(f, "sampling period must be strictly positive")
            }
            ConfigError::HalfSpecifiedLimits => {
                write!(f, "output limits need both a minimum and a maximum")
            }
            ConfigError::InvertedLimits => {
                write!(f, "output limit minimum exceeds maximum")
            }
        }
    }
}

impl core::error::Error for ConfigError {}

/// Controller gains as delivered by the parameter channel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Gains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    /// True when all three gains are finite numbers
    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }
}

/// Output limit policy
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputLimits {
    /// Neither the integral nor the output is clamped
    #[default]
    Unbounded,
    /// Integral accumulator and output are both clamped into `[min, max]`
    Bounded { min: f32, max: f32 },
}

impl OutputLimits {
    /// Create a bounded limit pair
    ///
    /// # Returns
    /// * `Err(ConfigError::InvertedLimits)` if `min > max` or either bound is NaN
    pub fn bounded(min: f32, max: f32) -> Result<Self, ConfigError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(ConfigError::InvertedLimits);
        }
        Ok(Self::Bounded { min, max })
    }

    /// Build limits from a pair of optional bounds
    ///
    /// Both absent means unbounded; exactly one present is rejected.
    pub fn from_pair(min: Option<f32>, max: Option<f32>) -> Result<Self, ConfigError> {
        match (min, max) {
            (None, None) => Ok(Self::Unbounded),
            (Some(min), Some(max)) => Self::bounded(min, max),
            _ => Err(ConfigError::HalfSpecifiedLimits),
        }
    }

    /// Bounds as a pair, `None` when unbounded
    pub fn as_pair(&self) -> Option<(f32, f32)> {
        match *self {
            Self::Unbounded => None,
            Self::Bounded { min, max } => Some((min, max)),
        }
    }

    /// Clamp `value` into the limits
    ///
    /// Upper bound first, then lower bound. Never panics, even for inverted
    /// bounds, where the lower bound wins.
    pub fn clamp(&self, value: f32) -> f32 {
        match *self {
            Self::Unbounded => value,
            Self::Bounded { min, max } => {
                let upper = if max < value { max } else { value };
                if min > upper {
                    min
                } else {
                    upper
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Unbounded => Ok(()),
            Self::Bounded { min, max } => Self::bounded(min, max).map(|_| ()),
        }
    }
}

/// Construction parameters for [`PidController`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidConfig {
    pub gains: Gains,
    /// Sampling period `Ts` [s]
    pub sampling_period: f32,
    pub setpoint: f32,
    /// Weight of the raw derivative versus the previous estimate (0.0-1.0)
    pub filter_constant: f32,
    pub output_limits: OutputLimits,
}

impl PidConfig {
    /// Required parameters only; filter constant and limits take their defaults
    pub fn new(gains: Gains, sampling_period: f32, setpoint: f32) -> Self {
        Self {
            gains,
            sampling_period,
            setpoint,
            filter_constant: DEFAULT_FILTER_CONSTANT,
            output_limits: OutputLimits::Unbounded,
        }
    }

    pub fn with_filter_constant(mut self, filter_constant: f32) -> Self {
        self.filter_constant = filter_constant;
        self
    }

    pub fn with_output_limits(mut self, output_limits: OutputLimits) -> Self {
        self.output_limits = output_limits;
        self
    }
}

/// Partial parameter update; `None` fields are left untouched
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParameterUpdate {
    pub kp: Option<f32>,
    pub ki: Option<f32>,
    pub kd: Option<f32>,
    pub setpoint: Option<f32>,
    pub output_limits: Option<OutputLimits>,
}

impl From<Gains> for ParameterUpdate {
    fn from(gains: Gains) -> Self {
        Self {
            kp: Some(gains.kp),
            ki: Some(gains.ki),
            kd: Some(gains.kd),
            ..Self::default()
        }
    }
}

/// Individual contributions of one compute step
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidTerms {
    pub error: f32,
    pub p: f32,
    pub i: f32,
    pub d: f32,
    /// Final (limited) output
    pub output: f32,
}

/// Discrete PID controller
pub struct PidController {
    /// Proportional gain
    kp: f32,
    /// Integral gain
    ki: f32,
    /// Derivative gain
    kd: f32,
    /// Sampling period [s], always > 0
    sampling_period: f32,
    setpoint: f32,
    /// Derivative low-pass weight
    filter_constant: f32,
    output_limits: OutputLimits,
    /// Running sum of error * Ts (clamped when limits are set)
    integral: f32,
    previous_error: f32,
    /// Raw derivative of the previous step (filter history)
    previous_derivative: f32,
    /// Last calculated output
    last_output: f32,
}

impl PidController {
    /// Create a new controller
    ///
    /// # Arguments
    /// * `config` - Gains, sampling period, setpoint, filter constant and limits
    ///
    /// # Returns
    /// * `Err(ConfigError)` if the sampling period is not strictly positive or
    ///   the limits are inverted
    pub fn new(config: PidConfig) -> Result<Self, ConfigError> {
        if !(config.sampling_period > 0.0) {
            error!(
                "Invalid sampling period: {}",
                config.sampling_period
            );
            return Err(ConfigError::NonPositiveSamplingPeriod);
        }
        config.output_limits.validate()?;

        if !(0.0..=1.0).contains(&config.filter_constant) {
            warn!(
                "Filter constant {} outside [0, 1], derivative filtering degraded",
                config.filter_constant
            );
        }

        Ok(Self {
            kp: config.gains.kp,
            ki: config.gains.ki,
            kd: config.gains.kd,
            sampling_period: config.sampling_period,
            setpoint: config.setpoint,
            filter_constant: config.filter_constant,
            output_limits: config.output_limits,
            integral: 0.0,
            previous_error: 0.0,
            previous_derivative: 0.0,
            last_output: 0.0,
        })
    }

    /// Run one sampling period and return the control signal
    pub fn compute(&mut self, measurement: f32) -> f32 {
        self.compute_terms(measurement).output
    }

    /// Run one sampling period and return every term
    ///
    /// # Arguments
    /// * `measurement` - Process variable sampled this period
    pub fn compute_terms(&mut self, measurement: f32) -> PidTerms {
        let ts = self.sampling_period;
        let error = self.setpoint - measurement;

        // Proportional term
        let p = self.kp * error;

        // Integral term, accumulator clamped into the output limits (anti-windup)
        self.integral += error * ts;
        self.integral = self.output_limits.clamp(self.integral);
        let i = self.ki * self.integral;

        // Derivative term through a one-pole low-pass filter
        let raw_derivative = (error - self.previous_error) / ts;
        let filtered_derivative = (1.0 - self.filter_constant) * self.previous_derivative
            + self.filter_constant * raw_derivative;
        let d = self.kd * filtered_derivative;

        let output = self.output_limits.clamp(p + i + d);

        // The raw derivative, not the filtered one, is the filter history
        self.previous_error = error;
        self.previous_derivative = raw_derivative;
        self.last_output = output;

        PidTerms {
            error,
            p,
            i,
            d,
            output,
        }
    }

    /// Apply any subset of parameters
    ///
    /// Accumulators are kept; new limits take effect on the next `compute`.
    pub fn update_parameters(&mut self, update: ParameterUpdate) {
        if let Some(kp) = update.kp {
            self.kp = kp;
        }
        if let Some(ki) = update.ki {
            self.ki = ki;
        }
        if let Some(kd) = update.kd {
            self.kd = kd;
        }
        if let Some(setpoint) = update.setpoint {
            self.setpoint = setpoint;
        }
        if let Some(output_limits) = update.output_limits {
            self.output_limits = output_limits;
        }
    }

    /// Replace all three gains
    pub fn apply_gains(&mut self, gains: Gains) {
        self.update_parameters(gains.into());
    }

    /// Zero the accumulators and the last output
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = 0.0;
        self.previous_derivative = 0.0;
        self.last_output = 0.0;
    }

    pub fn gains(&self) -> Gains {
        Gains::new(self.kp, self.ki, self.kd)
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn sampling_period(&self) -> f32 {
        self.sampling_period
    }

    pub fn filter_constant(&self) -> f32 {
        self.filter_constant
    }

    pub fn output_limits(&self) -> OutputLimits {
        self.output_limits
    }

    /// Current integral accumulator (before multiplication by Ki)
    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn previous_error(&self) -> f32 {
        self.previous_error
    }

    pub fn previous_derivative(&self) -> f32 {
        self.previous_derivative
    }

    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    /// Check if the last output sits on a limit
    pub fn is_saturated(&self) -> bool {
        match self.output_limits {
            OutputLimits::Unbounded => false,
            OutputLimits::Bounded { min, max } => {
                self.last_output <= min || self.last_output >= max
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-9;

    fn reference() -> PidController {
        PidController::new(PidConfig::new(Gains::new(1.0, 0.1, 0.05), 0.5, 50.0)).unwrap()
    }

    #[test]
    fn test_first_step_reference_values() {
        let mut pid = reference();
        let terms = pid.compute_terms(0.0);

        assert!((terms.p - 50.0).abs() <= EPS);
        assert!((terms.i - 2.5).abs() <= EPS);
        assert!((terms.d - 0.5).abs() <= EPS);
        assert!((terms.output - 53.0).abs() <= EPS);
        assert_eq!(pid.previous_error(), 50.0);
        assert_eq!(pid.last_output(), terms.output);
    }

    #[test]
    fn test_raw_derivative_is_filter_history() {
        let mut pid = reference();
        pid.compute(0.0);
        // raw derivative of the first step is (50 - 0) / 0.5
        assert_eq!(pid.previous_derivative(), 100.0);

        // Second step, error 40: raw = (40 - 50) / 0.5 = -20
        // filtered = 0.9 * 100 + 0.1 * -20 = 88
        let terms = pid.compute_terms(10.0);
        assert!((terms.d - 0.05 * 88.0).abs() < 1e-5);
        assert_eq!(pid.previous_derivative(), -20.0);
    }

    #[test]
    fn test_invalid_sampling_period() {
        let gains = Gains::new(1.0, 0.0, 0.0);
        for ts in [0.0, -0.5, f32::NAN] {
            let result = PidController::new(PidConfig::new(gains, ts, 0.0));
            assert_eq!(result.err(), Some(ConfigError::NonPositiveSamplingPeriod));
        }
    }

    #[test]
    fn test_half_specified_limits_rejected() {
        assert_eq!(
            OutputLimits::from_pair(Some(0.0), None),
            Err(ConfigError::HalfSpecifiedLimits)
        );
        assert_eq!(
            OutputLimits::from_pair(None, Some(10.0)),
            Err(ConfigError::HalfSpecifiedLimits)
        );
        assert_eq!(OutputLimits::from_pair(None, None), Ok(OutputLimits::Unbounded));
        assert_eq!(
            OutputLimits::from_pair(Some(-1.0), Some(1.0)),
            Ok(OutputLimits::Bounded { min: -1.0, max: 1.0 })
        );
    }

    #[test]
    fn test_inverted_limits_rejected_at_construction() {
        let config = PidConfig::new(Gains::new(1.0, 0.0, 0.0), 1.0, 0.0)
            .with_output_limits(OutputLimits::Bounded { min: 5.0, max: -5.0 });
        assert_eq!(PidController::new(config).err(), Some(ConfigError::InvertedLimits));
    }

    #[test]
    fn test_inverted_limits_clamp_is_total() {
        let limits = OutputLimits::Bounded { min: 5.0, max: -5.0 };
        assert_eq!(limits.clamp(0.0), 5.0);
        assert_eq!(limits.clamp(100.0), 5.0);
    }

    #[test]
    fn test_output_saturation() {
        let config = PidConfig::new(Gains::new(2.0, 0.5, 0.1), 0.1, 100.0)
            .with_output_limits(OutputLimits::bounded(-10.0, 10.0).unwrap());
        let mut pid = PidController::new(config).unwrap();

        for measurement in [0.0, 250.0, -300.0, 99.0, 1e6, -1e6] {
            let output = pid.compute(measurement);
            assert!((-10.0..=10.0).contains(&output));
            assert!((-10.0..=10.0).contains(&pid.integral()));
        }
        assert!(pid.is_saturated());
    }

    #[test]
    fn test_integral_plateaus_at_limit() {
        let ki = 0.5;
        let config = PidConfig::new(Gains::new(0.0, ki, 0.0), 1.0, 1000.0)
            .with_output_limits(OutputLimits::bounded(0.0, 10.0).unwrap());
        let mut pid = PidController::new(config).unwrap();

        let mut outputs = [0.0f32; 20];
        for output in outputs.iter_mut() {
            *output = pid.compute(0.0);
        }

        // Accumulator is clamped to the output bound, so I = Ki * 10
        assert_eq!(pid.integral(), 10.0);
        assert_eq!(outputs[19], ki * 10.0);
        assert_eq!(outputs[18], outputs[19]);
    }

    #[test]
    fn test_zero_error_steady_state() {
        let mut pid = reference();
        for _ in 0..50 {
            let output = pid.compute(50.0);
            assert_eq!(output, 0.0);
        }
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_determinism() {
        let inputs = [0.0, 12.5, 31.0, 44.2, 49.9, 51.3, 50.2, 49.95];
        let mut first = reference();
        let mut second = reference();

        for &measurement in inputs.iter() {
            let a = first.compute(measurement);
            let b = second.compute(measurement);
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_reset_matches_fresh_controller() {
        let mut used = reference();
        for measurement in [3.0, 17.0, 42.0, 61.0] {
            used.compute(measurement);
        }
        used.reset();
        used.reset();

        assert_eq!(used.integral(), 0.0);
        assert_eq!(used.previous_error(), 0.0);
        assert_eq!(used.previous_derivative(), 0.0);
        assert_eq!(used.last_output(), 0.0);

        let mut fresh = reference();
        assert_eq!(
            used.compute(50.0).to_bits(),
            fresh.compute(50.0).to_bits()
        );
        assert_eq!(used.compute(0.0).to_bits(), fresh.compute(0.0).to_bits());
    }

    #[test]
    fn test_reset_keeps_configuration() {
        let config = PidConfig::new(Gains::new(1.5, 0.2, 0.01), 0.25, 12.0)
            .with_filter_constant(0.3)
            .with_output_limits(OutputLimits::bounded(-4.0, 4.0).unwrap());
        let mut pid = PidController::new(config).unwrap();
        pid.compute(0.0);
        pid.reset();

        assert_eq!(pid.gains(), Gains::new(1.5, 0.2, 0.01));
        assert_eq!(pid.setpoint(), 12.0);
        assert_eq!(pid.sampling_period(), 0.25);
        assert_eq!(pid.filter_constant(), 0.3);
        assert_eq!(pid.output_limits(), OutputLimits::Bounded { min: -4.0, max: 4.0 });
    }

    #[test]
    fn test_parameter_update_isolation() {
        let mut pid = reference();
        pid.compute(0.0);
        let integral = pid.integral();
        let previous_error = pid.previous_error();
        let previous_derivative = pid.previous_derivative();

        pid.update_parameters(ParameterUpdate {
            kp: Some(2.0),
            ..Default::default()
        });

        assert_eq!(pid.gains(), Gains::new(2.0, 0.1, 0.05));
        assert_eq!(pid.setpoint(), 50.0);
        assert_eq!(pid.integral(), integral);
        assert_eq!(pid.previous_error(), previous_error);
        assert_eq!(pid.previous_derivative(), previous_derivative);

        // error 40: P = 2 * 40, I = 0.1 * (25 + 20), raw = -20, filtered = 88
        let terms = pid.compute_terms(10.0);
        assert!((terms.p - 80.0).abs() < 1e-5);
        assert!((terms.i - 4.5).abs() < 1e-5);
        assert!((terms.d - 4.4).abs() < 1e-5);
    }

    #[test]
    fn test_new_limits_apply_on_next_compute() {
        let mut pid = reference();
        pid.compute(0.0);
        assert_eq!(pid.integral(), 25.0);

        pid.update_parameters(ParameterUpdate {
            output_limits: Some(OutputLimits::bounded(-5.0, 5.0).unwrap()),
            ..Default::default()
        });
        // Not re-clamped until the next step
        assert_eq!(pid.integral(), 25.0);
        assert_eq!(pid.last_output(), 53.0);

        let output = pid.compute(0.0);
        assert_eq!(pid.integral(), 5.0);
        assert_eq!(output, 5.0);
    }

    #[test]
    fn test_apply_gains_replaces_all_three() {
        let mut pid = reference();
        pid.apply_gains(Gains::new(0.4, 0.03, 0.002));
        assert_eq!(pid.gains(), Gains::new(0.4, 0.03, 0.002));
        assert_eq!(pid.setpoint(), 50.0);
    }

    #[test]
    fn test_smallest_sampling_period_does_not_fault() {
        let ts = f32::from_bits(1);
        let config = PidConfig::new(Gains::new(1.0, 0.1, 0.05), ts, 50.0)
            .with_output_limits(OutputLimits::bounded(-100.0, 100.0).unwrap());
        let mut pid = PidController::new(config).unwrap();

        let output = pid.compute(0.0);
        assert_eq!(output, 100.0);
        assert!(pid.previous_derivative().is_infinite());

        // Unbounded controller: the derivative saturates to infinity instead of faulting
        let mut unbounded =
            PidController::new(PidConfig::new(Gains::new(1.0, 0.1, 0.05), ts, 50.0)).unwrap();
        assert!(unbounded.compute(0.0).is_infinite());
    }

    #[test]
    fn test_large_sampling_period_keeps_integral_bounded() {
        let config = PidConfig::new(Gains::new(0.0, 1.0, 0.0), 1e30, 50.0)
            .with_output_limits(OutputLimits::bounded(-1000.0, 1000.0).unwrap());
        let mut pid = PidController::new(config).unwrap();

        for _ in 0..10 {
            pid.compute(-50.0);
            assert!(pid.integral().is_finite());
            assert_eq!(pid.integral(), 1000.0);
        }

        let mut unbounded =
            PidController::new(PidConfig::new(Gains::new(0.0, 1.0, 0.0), 1e30, 50.0)).unwrap();
        unbounded.compute(0.0);
        assert!(unbounded.integral().is_finite());
    }

    #[test]
    fn test_out_of_range_filter_constant_accepted() {
        let config =
            PidConfig::new(Gains::new(1.0, 0.0, 1.0), 1.0, 0.0).with_filter_constant(1.5);
        assert!(PidController::new(config).is_ok());
    }
}
