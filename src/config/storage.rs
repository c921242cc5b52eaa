//! Persisted controller settings
//!
//! Fixed little-endian record protected by a magic number, a version and a
//! CRC-32 so that tuned gains survive a restart.

use core::fmt;

use super::params;
use crate::controller::{Gains, OutputLimits, PidConfig};

/// Record magic number ("PID1" in ASCII)
pub const SETTINGS_MAGIC: u32 = 0x3144_4950;

/// Current record version
pub const SETTINGS_VERSION: u16 = 1;

/// Encoded record size [bytes]
pub const SETTINGS_SIZE: usize = 44;

/// CRC-32 polynomial (STM32 CRC unit default)
const CRC32_POLY: u32 = 0x04C1_1DB7;

/// Offset of the checksum, which covers every byte before it
const CRC_OFFSET: usize = SETTINGS_SIZE - 4;

/// Settings storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Backing store could not be read
    ReadFailed,

    /// Backing store could not be written
    WriteFailed,

    /// Record shorter than [`SETTINGS_SIZE`]
    InvalidSize,

    /// Magic number mismatch
    InvalidMagic,

    /// Version mismatch
    VersionMismatch,

    /// CRC verification failed
    CrcMismatch,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            StorageError::ReadFailed => "settings read failed",
            StorageError::WriteFailed => "settings write failed",
            StorageError::InvalidSize => "settings record too short",
            StorageError::InvalidMagic => "settings magic mismatch",
            StorageError::VersionMismatch => "settings version mismatch",
            StorageError::CrcMismatch => "settings CRC mismatch",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for StorageError {}

/// CRC-32 (poly 0x04C11DB7, init 0xFFFFFFFF, no reflection, no final xor)
pub const fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    let mut i = 0;
    while i < data.len() {
        crc ^= (data[i] as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ CRC32_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        i += 1;
    }
    crc
}

/// Persisted controller settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredSettings {
    pub gains: Gains,
    /// Sampling period [s]
    pub sampling_period: f32,
    pub setpoint: f32,
    pub filter_constant: f32,
    pub output_limits: OutputLimits,
}

impl StoredSettings {
    /// Default settings (values from params.rs)
    pub const fn default() -> Self {
        Self {
            gains: Gains::new(params::DEFAULT_KP, params::DEFAULT_KI, params::DEFAULT_KD),
            sampling_period: params::DEFAULT_SAMPLING_PERIOD_S,
            setpoint: params::DEFAULT_SETPOINT,
            filter_constant: params::DEFAULT_FILTER_CONSTANT,
            output_limits: OutputLimits::Unbounded,
        }
    }

    /// Same settings with the gains replaced
    pub fn with_gains(self, gains: Gains) -> Self {
        Self { gains, ..self }
    }

    /// Controller configuration described by these settings
    pub fn to_config(&self) -> PidConfig {
        PidConfig::new(self.gains, self.sampling_period, self.setpoint)
            .with_filter_constant(self.filter_constant)
            .with_output_limits(self.output_limits)
    }

    /// Encode into the on-disk/flash record
    ///
    /// Layout: magic u32 | version u16 | limits flag u8 | reserved u8 |
    /// kp | ki | kd | Ts | setpoint | alpha | min | max (f32 each) | crc32 u32
    pub fn to_bytes(&self) -> [u8; SETTINGS_SIZE] {
        let mut data = [0u8; SETTINGS_SIZE];

        data[0..4].copy_from_slice(&SETTINGS_MAGIC.to_le_bytes());
        data[4..6].copy_from_slice(&SETTINGS_VERSION.to_le_bytes());

        let (has_limits, min, max) = match self.output_limits.as_pair() {
            Some((min, max)) => (1u8, min, max),
            None => (0u8, 0.0, 0.0),
        };
        data[6] = has_limits;

        let fields = [
            self.gains.kp,
            self.gains.ki,
            self.gains.kd,
            self.sampling_period,
            self.setpoint,
            self.filter_constant,
            min,
            max,
        ];
        for (i, value) in fields.iter().enumerate() {
            let offset = 8 + i * 4;
            data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }

        let crc = crc32(&data[..CRC_OFFSET]);
        data[CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());

        data
    }

    /// Decode and verify a record
    ///
    /// # Returns
    /// * `Err(StorageError)` on short data, wrong magic/version or bad CRC
    pub fn from_bytes(data: &[u8]) -> Result<Self, StorageError> {
        if data.len() < SETTINGS_SIZE {
            return Err(StorageError::InvalidSize);
        }

        let magic = read_u32(data, 0);
        if magic != SETTINGS_MAGIC {
            error!("Settings header validation failed: magic=0x{:08X}", magic);
            return Err(StorageError::InvalidMagic);
        }

        let version = u16::from_le_bytes([data[4], data[5]]);
        if version != SETTINGS_VERSION {
            error!("Settings version {} not supported", version);
            return Err(StorageError::VersionMismatch);
        }

        let stored_crc = read_u32(data, CRC_OFFSET);
        let calculated = crc32(&data[..CRC_OFFSET]);
        if stored_crc != calculated {
            error!(
                "CRC verification failed: stored=0x{:08X}, calculated=0x{:08X}",
                stored_crc, calculated
            );
            return Err(StorageError::CrcMismatch);
        }

        let field = |i: usize| f32::from_bits(read_u32(data, 8 + i * 4));
        let output_limits = if data[6] != 0 {
            OutputLimits::Bounded {
                min: field(6),
                max: field(7),
            }
        } else {
            OutputLimits::Unbounded
        };

        Ok(Self {
            gains: Gains::new(field(0), field(1), field(2)),
            sampling_period: field(3),
            setpoint: field(4),
            filter_constant: field(5),
            output_limits,
        })
    }
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self::default()
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Backing store for the settings record (flash page, file, ...)
pub trait SettingsStore {
    /// Read and verify the stored record
    fn read(&mut self) -> Result<StoredSettings, StorageError>;

    /// Replace the stored record
    fn write(&mut self, settings: &StoredSettings) -> Result<(), StorageError>;
}

/// Read the settings, falling back to defaults when missing or invalid
///
/// Defaults are written back so the next start finds a valid record. A failed
/// write still returns the in-memory defaults.
pub fn load_or_initialize<S: SettingsStore>(store: &mut S) -> StoredSettings {
    match store.read() {
        Ok(settings) => {
            info!("Loaded controller settings");
            settings
        }
        Err(e) => {
            warn!("Failed to load settings: {}, initializing with defaults", e);
            let settings = StoredSettings::default();
            if let Err(e) = store.write(&settings) {
                error!("Failed to store default settings: {}, using in-memory defaults", e);
            }
            settings
        }
    }
}
