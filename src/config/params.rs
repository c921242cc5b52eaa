//! Controller, process and link parameters

/// Proportional gain (default)
pub const DEFAULT_KP: f32 = 1.0;

/// Integral gain (default)
pub const DEFAULT_KI: f32 = 0.1;

/// Derivative gain (default)
pub const DEFAULT_KD: f32 = 0.05;

/// Sampling period [s] (default)
pub const DEFAULT_SAMPLING_PERIOD_S: f32 = 0.5;

/// Setpoint (default)
pub const DEFAULT_SETPOINT: f32 = 50.0;

/// Derivative low-pass weight, 0.0-1.0 (default)
pub const DEFAULT_FILTER_CONSTANT: f32 = 0.1;

/// Control loop summary log interval [cycles]
pub const DEFAULT_LOG_EVERY: u32 = 10;

/// Simulated first-order process
pub mod plant {
    /// Static gain K (default)
    pub const DEFAULT_GAIN: f32 = 1.0;

    /// Time constant tau [s] (default)
    pub const DEFAULT_TIME_CONSTANT_S: f32 = 2.0;

    /// Initial process value (default)
    pub const DEFAULT_INITIAL_VALUE: f32 = 0.0;
}

/// Parameter link
pub mod link {
    /// UDP bind address of the simulator (default)
    pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9750";

    /// Settings file of the simulator (default)
    pub const DEFAULT_SETTINGS_PATH: &str = "pid-link.settings";
}
