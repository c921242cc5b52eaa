// Wire encoding for the parameter channel

use crate::controller::Gains;

/// Telemetry payload length (one f32) [bytes]
pub const TELEMETRY_LEN: usize = 4;

/// Measurement + output report length (two f32) [bytes]
pub const REPORT_LEN: usize = 8;

/// Gain update payload length (Kp, Ki, Kd as f32) [bytes]
pub const GAINS_LEN: usize = 12;

/// Encode one telemetry value
///
/// # Returns
/// 4-byte little-endian IEEE-754 value
pub fn encode_telemetry(value: f32) -> [u8; TELEMETRY_LEN] {
    value.to_le_bytes()
}

/// Decode one telemetry value
///
/// # Arguments
/// * `data` - Received payload (should be 4 bytes)
///
/// # Returns
/// * `Some(value)` if parsing successful
/// * `None` if data length is incorrect
pub fn decode_telemetry(data: &[u8]) -> Option<f32> {
    if data.len() != TELEMETRY_LEN {
        return None;
    }

    Some(f32::from_le_bytes([data[0], data[1], data[2], data[3]]))
}

/// Encode a measurement together with the control output
///
/// Its length keeps it distinct from plain telemetry, so a peer that only
/// understands 4-byte values can ignore it.
///
/// # Returns
/// 8-byte array: measurement (bytes 0-3), output (bytes 4-7)
pub fn encode_report(measurement: f32, output: f32) -> [u8; REPORT_LEN] {
    let mut data = [0u8; REPORT_LEN];

    data[0..4].copy_from_slice(&measurement.to_le_bytes());
    data[4..8].copy_from_slice(&output.to_le_bytes());

    data
}

/// Decode a measurement + output report
///
/// # Returns
/// * `Some((measurement, output))` if parsing successful
/// * `None` if data length is incorrect
pub fn decode_report(data: &[u8]) -> Option<(f32, f32)> {
    if data.len() != REPORT_LEN {
        return None;
    }

    let measurement = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let output = f32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    Some((measurement, output))
}

/// Encode a gain update
///
/// # Returns
/// 12-byte array: Kp (bytes 0-3), Ki (bytes 4-7), Kd (bytes 8-11)
pub fn encode_gains(gains: Gains) -> [u8; GAINS_LEN] {
    let mut data = [0u8; GAINS_LEN];

    data[0..4].copy_from_slice(&gains.kp.to_le_bytes());
    data[4..8].copy_from_slice(&gains.ki.to_le_bytes());
    data[8..12].copy_from_slice(&gains.kd.to_le_bytes());

    data
}

/// Parse a gain update
///
/// # Arguments
/// * `data` - Received payload (must be exactly 12 bytes)
///
/// # Returns
/// * `Some(Gains)` if parsing successful
/// * `None` if the length is wrong or any gain is NaN or infinite
pub fn parse_gains(data: &[u8]) -> Option<Gains> {
    if data.len() != GAINS_LEN {
        error!("Gains: invalid data length {}", data.len());
        return None;
    }

    let kp = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let ki = f32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    let kd = f32::from_le_bytes([data[8], data[9], data[10], data[11]]);

    let gains = Gains::new(kp, ki, kd);
    if !gains.is_finite() {
        error!("Gains: non-finite value Kp={}, Ki={}, Kd={}", kp, ki, kd);
        return None;
    }

    info!("Gains received: Kp={}, Ki={}, Kd={}", kp, ki, kd);
    Some(gains)
}
